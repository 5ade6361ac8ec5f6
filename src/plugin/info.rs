use super::{TrampolineId, meta::bounded};
use crate::{
    Result,
    bounded::BoundedVec,
    hooks::{HookEntry, HookStage},
    memory::{Data, MemoryRegion, Section, Text},
    patch::FunctionPatch,
};
use alloc::string::String;

/// Maximum relocation entries per plugin.
pub const RELOCATION_LIST_LENGTH: usize = 500;
/// Maximum section descriptors per plugin.
pub const MAXIMUM_PLUGIN_SECTIONS: usize = 10;
/// Longest section name, in bytes.
pub const MAXIMUM_SECTION_NAME_LENGTH: usize = 19;
/// Maximum hooks per plugin.
pub const MAXIMUM_HOOKS_PER_PLUGIN: usize = 25;
/// Maximum function patches per plugin.
pub const MAXIMUM_FUNCTIONS_PER_PLUGIN: usize = 100;

/// Architecture specific relocation type, interpreted by the relocation primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelocationKind(u8);

impl RelocationKind {
    #[inline]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> u8 {
        self.0
    }
}

/// The host module a relocation imports from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    module: String,
    is_data: bool,
}

impl ImportInfo {
    pub fn new(module: &str, is_data: bool) -> Self {
        Self {
            module: String::from(module),
            is_data,
        }
    }

    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Whether the import is a data export rather than a function.
    #[inline]
    pub fn is_data(&self) -> bool {
        self.is_data
    }
}

/// One location in a plugin image that must receive a resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationEntry {
    name: String,
    kind: RelocationKind,
    offset: u32,
    addend: i32,
    destination: usize,
    import: ImportInfo,
}

impl RelocationEntry {
    pub fn new(
        name: &str,
        kind: RelocationKind,
        offset: u32,
        addend: i32,
        destination: usize,
        import: ImportInfo,
    ) -> Self {
        Self {
            name: String::from(name),
            kind,
            offset,
            addend,
            destination,
            import,
        }
    }

    /// Symbol name as imported.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> RelocationKind {
        self.kind
    }

    /// Byte offset of the patched location from [`RelocationEntry::destination`].
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn addend(&self) -> i32 {
        self.addend
    }

    /// Base address of the section holding the patched location.
    #[inline]
    pub fn destination(&self) -> usize {
        self.destination
    }

    #[inline]
    pub fn import(&self) -> &ImportInfo {
        &self.import
    }
}

/// A named section of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    name: String,
    region: MemoryRegion<Section>,
}

impl SectionInfo {
    pub fn new(name: &str, region: MemoryRegion<Section>) -> Self {
        Self {
            name: bounded(name, MAXIMUM_SECTION_NAME_LENGTH),
            region,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn region(&self) -> MemoryRegion<Section> {
        self.region
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.region.base()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.region.len()
    }
}

/// Everything needed to link, initialise and hook a loaded plugin.
///
/// Produced by [`PluginFactory::load_plugin_info`](crate::host::PluginFactory::load_plugin_info)
/// after it has allocated and filled the plugin's text and data memory.
#[derive(Debug)]
pub struct PluginInfo {
    relocations: BoundedVec<RelocationEntry, RELOCATION_LIST_LENGTH>,
    sections: BoundedVec<SectionInfo, MAXIMUM_PLUGIN_SECTIONS>,
    functions: BoundedVec<FunctionPatch, MAXIMUM_FUNCTIONS_PER_PLUGIN>,
    hooks: BoundedVec<HookEntry, MAXIMUM_HOOKS_PER_PLUGIN>,
    trampoline_id: TrampolineId,
    text: Option<MemoryRegion<Text>>,
    data: Option<MemoryRegion<Data>>,
}

impl PluginInfo {
    pub fn new(trampoline_id: TrampolineId) -> Self {
        Self {
            relocations: BoundedVec::new(),
            sections: BoundedVec::new(),
            functions: BoundedVec::new(),
            hooks: BoundedVec::new(),
            trampoline_id,
            text: None,
            data: None,
        }
    }

    /// Records the executable memory allocated for the plugin.
    pub fn with_text(mut self, text: MemoryRegion<Text>) -> Self {
        self.text = Some(text);
        self
    }

    /// Records the data memory allocated for the plugin.
    pub fn with_data(mut self, data: MemoryRegion<Data>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn add_relocation(&mut self, entry: RelocationEntry) -> Result<()> {
        self.relocations.try_push(entry)
    }

    pub fn add_section(&mut self, section: SectionInfo) -> Result<()> {
        self.sections.try_push(section)
    }

    pub fn add_function(&mut self, patch: FunctionPatch) -> Result<()> {
        self.functions.try_push(patch)
    }

    pub fn add_hook(&mut self, hook: HookEntry) -> Result<()> {
        self.hooks.try_push(hook)
    }

    #[inline]
    pub fn relocations(&self) -> &[RelocationEntry] {
        self.relocations.as_slice()
    }

    #[inline]
    pub fn sections(&self) -> &[SectionInfo] {
        self.sections.as_slice()
    }

    /// Looks a section up by name, e.g. `.bss`.
    pub fn section(&self, name: &str) -> Option<&SectionInfo> {
        self.sections.iter().find(|section| section.name() == name)
    }

    #[inline]
    pub fn functions(&self) -> &[FunctionPatch] {
        self.functions.as_slice()
    }

    #[inline]
    pub fn functions_mut(&mut self) -> &mut [FunctionPatch] {
        self.functions.as_mut_slice()
    }

    #[inline]
    pub fn hooks(&self) -> &[HookEntry] {
        self.hooks.as_slice()
    }

    /// Whether any hook is declared for `stage`.
    pub fn has_hook(&self, stage: HookStage) -> bool {
        self.hooks.iter().any(|hook| hook.stage() == stage)
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut [HookEntry] {
        self.hooks.as_mut_slice()
    }

    #[inline]
    pub fn trampoline_id(&self) -> TrampolineId {
        self.trampoline_id
    }

    #[inline]
    pub fn text(&self) -> Option<MemoryRegion<Text>> {
        self.text
    }

    #[inline]
    pub fn data(&self) -> Option<MemoryRegion<Data>> {
        self.data
    }

    pub(crate) fn take_memory(&mut self) -> (Option<MemoryRegion<Text>>, Option<MemoryRegion<Data>>) {
        (self.text.take(), self.data.take())
    }
}
