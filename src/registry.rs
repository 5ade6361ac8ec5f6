//! The shared state of every loaded plugin.

use crate::{
    Result,
    bounded::BoundedVec,
    plugin::{PluginContainer, TrampolineId},
};
use alloc::{boxed::Box, string::String, vec::Vec};
use core::mem::size_of;

/// Maximum number of plugins loaded at the same time.
pub const MAXIMUM_PLUGINS: usize = 32;
/// Number of slots in the shared trampoline pool.
pub const TRAMPOLINE_LIST_LENGTH: usize = 500;
/// Maximum number of distinct modules plugins may import from.
pub const IMPORT_LIST_LENGTH: usize = 50;
/// Number of instruction words in one trampoline.
pub const TRAMPOLINE_WORDS: usize = 4;

/// Whether a trampoline slot is owned by a plugin.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrampolineStatus {
    #[default]
    Free = 0,
    Used = 1,
}

/// A small code stub used when a relocation target is out of direct reach.
///
/// The layout matches what the relocation primitive writes: owner id, the
/// instruction words, then the status.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrampolineSlot {
    id: u32,
    code: [u32; TRAMPOLINE_WORDS],
    status: TrampolineStatus,
}

impl TrampolineSlot {
    /// Owner id, only meaningful while the slot is [`TrampolineStatus::Used`].
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn status(&self) -> TrampolineStatus {
        self.status
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.status == TrampolineStatus::Free
    }

    /// Whether the slot is in use by the plugin with trampoline id `id`.
    #[inline]
    pub fn is_owned_by(&self, id: TrampolineId) -> bool {
        self.status == TrampolineStatus::Used && self.id == id.get()
    }

    #[inline]
    pub fn code(&self) -> &[u32; TRAMPOLINE_WORDS] {
        &self.code
    }

    #[inline]
    pub fn code_mut(&mut self) -> &mut [u32; TRAMPOLINE_WORDS] {
        &mut self.code
    }

    /// Address of the first instruction word.
    #[inline]
    pub fn code_address(&self) -> usize {
        self.code.as_ptr() as usize
    }

    fn release(&mut self) {
        *self = TrampolineSlot::default();
    }
}

/// The fixed pool of trampoline slots shared by all plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrampolinePool {
    slots: Box<[TrampolineSlot]>,
}

impl TrampolinePool {
    /// A pool of [`TRAMPOLINE_LIST_LENGTH`] free slots.
    pub fn new() -> Self {
        Self::with_len(TRAMPOLINE_LIST_LENGTH)
    }

    /// A pool of `len` free slots.
    pub fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize(len, TrampolineSlot::default());
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Start address of the pool, for cache maintenance.
    #[inline]
    pub fn address(&self) -> usize {
        self.slots.as_ptr() as usize
    }

    /// Size of the pool in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.slots.len() * size_of::<TrampolineSlot>()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, TrampolineSlot> {
        self.slots.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TrampolineSlot> {
        self.slots.get(index)
    }

    /// Takes the first free slot for the plugin `owner`.
    pub fn claim(&mut self, owner: TrampolineId) -> Option<&mut TrampolineSlot> {
        let slot = self.slots.iter_mut().find(|slot| slot.is_free())?;
        slot.id = owner.get();
        slot.status = TrampolineStatus::Used;
        Some(slot)
    }

    /// Slot owned by `owner` that already holds `code`, so an identical stub
    /// can be shared.
    pub fn find_owned(
        &mut self,
        owner: TrampolineId,
        code: &[u32; TRAMPOLINE_WORDS],
    ) -> Option<&mut TrampolineSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.is_owned_by(owner) && slot.code == *code)
    }

    /// Number of slots currently owned by `owner`.
    pub fn owned_by(&self, owner: TrampolineId) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.is_owned_by(owner))
            .count()
    }

    /// Frees every slot owned by `owner`, returning how many were released.
    pub fn release_owned_by(&mut self, owner: TrampolineId) -> usize {
        let mut released = 0;
        for slot in self.slots.iter_mut().filter(|slot| slot.is_owned_by(owner)) {
            slot.release();
            released += 1;
        }
        released
    }

    /// Marks every slot free.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(TrampolineSlot::release);
    }
}

impl Default for TrampolinePool {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of the host modules plugins import from.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    names: BoundedVec<String, IMPORT_LIST_LENGTH>,
}

impl ModuleTable {
    /// Records `name`, returning `true` if it was not known yet.
    pub fn record(&mut self, name: &str) -> Result<bool> {
        if self.contains(name) {
            return Ok(false);
        }
        self.names.try_push(String::from(name))?;
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn clear(&mut self) {
        self.names.clear();
    }
}

/// Every loaded plugin, the trampoline pool and the linking bookkeeping.
///
/// There is one registry per host process. It is owned by the caller and
/// passed into every operation; the backend never looks it up on its own.
/// The position of a plugin in [`Registry::plugins`] is its identity and the
/// order every phase walks the plugins in.
#[derive(Debug)]
pub struct Registry {
    plugins: BoundedVec<PluginContainer, MAXIMUM_PLUGINS>,
    trampolines: TrampolinePool,
    modules: ModuleTable,
}

impl Registry {
    /// An empty registry with a full-sized trampoline pool.
    pub fn new() -> Self {
        Self::with_trampolines(TrampolinePool::new())
    }

    /// An empty registry using `trampolines` as its pool.
    pub fn with_trampolines(trampolines: TrampolinePool) -> Self {
        Self {
            plugins: BoundedVec::new(),
            trampolines,
            modules: ModuleTable::default(),
        }
    }

    /// Returns the registry to its initial state in one step.
    ///
    /// Plugins are dropped without any cleanup; use
    /// [`unload`](crate::lifecycle::unload) to release their memory first.
    pub fn reset(&mut self) {
        self.plugins.clear();
        self.trampolines.reset();
        self.modules.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.plugins.is_full()
    }

    #[inline]
    pub fn plugins(&self) -> &[PluginContainer] {
        self.plugins.as_slice()
    }

    #[inline]
    pub fn plugins_mut(&mut self) -> &mut [PluginContainer] {
        self.plugins.as_mut_slice()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&PluginContainer> {
        self.plugins.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut PluginContainer> {
        self.plugins.get_mut(index)
    }

    /// Looks a plugin up by its metadata name.
    pub fn find(&self, name: &str) -> Option<(usize, &PluginContainer)> {
        self.plugins
            .iter()
            .enumerate()
            .find(|(_, plugin)| plugin.meta().name() == name)
    }

    #[inline]
    pub fn trampolines(&self) -> &TrampolinePool {
        &self.trampolines
    }

    #[inline]
    pub fn trampolines_mut(&mut self) -> &mut TrampolinePool {
        &mut self.trampolines
    }

    #[inline]
    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    /// Appends a plugin, returning its slot index.
    pub fn insert(&mut self, plugin: PluginContainer) -> Result<usize> {
        self.plugins.try_push(plugin)?;
        Ok(self.plugins.len() - 1)
    }

    /// The first trampoline id not used by any loaded plugin.
    pub fn next_trampoline_id(&self) -> TrampolineId {
        self.plugins
            .iter()
            .filter_map(PluginContainer::trampoline_id)
            .map(|id| id.get() + 1)
            .max()
            .map_or(TrampolineId::new(0), TrampolineId::new)
    }

    pub(crate) fn split_mut(&mut self) -> (&mut [PluginContainer], &mut TrampolinePool) {
        (self.plugins.as_mut_slice(), &mut self.trampolines)
    }

    pub(crate) fn modules_mut(&mut self) -> &mut ModuleTable {
        &mut self.modules
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
