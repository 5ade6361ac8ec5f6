//! The per-plugin data model.

mod info;
mod meta;

pub use info::{
    ImportInfo, MAXIMUM_FUNCTIONS_PER_PLUGIN, MAXIMUM_HOOKS_PER_PLUGIN, MAXIMUM_PLUGIN_SECTIONS,
    MAXIMUM_SECTION_NAME_LENGTH, PluginInfo, RELOCATION_LIST_LENGTH, RelocationEntry,
    RelocationKind, SectionInfo,
};
pub use meta::{MAXIMUM_DESCRIPTION_LENGTH, MAXIMUM_META_FIELD_LENGTH, MetaInformation};

use crate::memory::PluginData;
use bitflags::bitflags;

/// Identifies the trampoline slots owned by one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrampolineId(u32);

impl TrampolineId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for TrampolineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    /// Lifecycle steps a plugin has completed.
    ///
    /// A plugin with metadata but without [`PluginState::INFO_LOADED`] is inert.
    pub struct PluginState: u8 {
        const METADATA_LOADED = 1;
        const INFO_LOADED = 1 << 1;
        const RELOCATED = 1 << 2;
        const BSS_CLEARED = 1 << 3;
        const PATCHED = 1 << 4;
    }
}

/// One entry of the [`Registry`](crate::Registry).
#[derive(Debug)]
pub struct PluginContainer {
    meta: MetaInformation,
    info: Option<PluginInfo>,
    data: PluginData,
    trampoline_id: Option<TrampolineId>,
    priority: i32,
    state: PluginState,
}

impl PluginContainer {
    pub(crate) fn new(meta: MetaInformation, data: PluginData) -> Self {
        Self {
            meta,
            info: None,
            data,
            trampoline_id: None,
            priority: 0,
            state: PluginState::METADATA_LOADED,
        }
    }

    #[inline]
    pub fn meta(&self) -> &MetaInformation {
        &self.meta
    }

    /// The linking information, absent for inert plugins.
    #[inline]
    pub fn info(&self) -> Option<&PluginInfo> {
        self.info.as_ref()
    }

    #[inline]
    pub fn info_mut(&mut self) -> Option<&mut PluginInfo> {
        self.info.as_mut()
    }

    #[inline]
    pub fn data(&self) -> &PluginData {
        &self.data
    }

    /// Trampoline id handed to the info factory, also set for inert plugins.
    #[inline]
    pub fn trampoline_id(&self) -> Option<TrampolineId> {
        self.trampoline_id
    }

    /// Stored but not used for ordering; every phase runs in registry order.
    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    #[inline]
    pub fn state(&self) -> PluginState {
        self.state
    }

    #[inline]
    pub fn is_inert(&self) -> bool {
        self.info.is_none()
    }

    pub(crate) fn assign_trampoline_id(&mut self, id: TrampolineId) {
        self.trampoline_id = Some(id);
    }

    pub(crate) fn set_info(&mut self, info: PluginInfo) {
        self.info = Some(info);
        self.state.insert(PluginState::INFO_LOADED);
    }

    pub(crate) fn mark(&mut self, state: PluginState) {
        self.state.insert(state);
    }

    pub(crate) fn parts_mut(&mut self) -> (&MetaInformation, Option<&mut PluginInfo>, &mut PluginData) {
        (&self.meta, self.info.as_mut(), &mut self.data)
    }
}
