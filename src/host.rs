//! Services the backend consumes from the host and the plugin factories.
//!
//! Parsing plugin binaries, resolving exports, patching machine code, freeing
//! memory and cache maintenance all belong to the environment the backend runs
//! in. They are described here as traits so the backend stays independent of
//! any particular loader, allocator or CPU.

use crate::{
    Result,
    memory::{HeapHandle, Image, MemoryRegion, PluginData, RegionKind},
    patch::FunctionPatch,
    plugin::{MetaInformation, PluginInfo, RelocationEntry, RelocationKind, TrampolineId},
    registry::TrampolinePool,
};
use alloc::boxed::Box;

/// Opaque handle of a module resident in the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(usize);

impl ModuleHandle {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> usize {
        self.0
    }
}

/// Reported by the host's dynamic loader when its module set changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleEvent {
    Loaded(ModuleHandle),
    Unloaded(ModuleHandle),
}

/// Callback registered with the host's dynamic loader.
///
/// The host may invoke it at any later point, from any thread.
pub type LoadNotification = Box<dyn FnMut(ModuleEvent) + Send + 'static>;

/// The host's module and export lookup service.
pub trait ModuleResolver {
    /// Acquires a handle to the resident module `name`.
    fn acquire(&mut self, name: &str) -> Option<ModuleHandle>;

    /// Finds an export of `module`. `is_data` selects the data export table
    /// instead of the function table.
    fn find_export(&mut self, module: ModuleHandle, is_data: bool, name: &str) -> Option<usize>;

    /// Registers `callback` to be told about modules loaded later on.
    fn add_load_notification(&mut self, callback: LoadNotification) -> Result<()>;
}

/// Which relocation list an entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationCategory {
    /// Fixups internal to the plugin image.
    Default,
    /// References to host module exports.
    Import,
}

/// Everything the relocation primitive needs to patch one location.
#[derive(Debug, Clone, Copy)]
pub struct RelocationRequest<'a> {
    entry: &'a RelocationEntry,
    symbol_address: usize,
}

impl<'a> RelocationRequest<'a> {
    pub(crate) fn new(entry: &'a RelocationEntry, symbol_address: usize) -> Self {
        Self {
            entry,
            symbol_address,
        }
    }

    #[inline]
    pub fn symbol(&self) -> &'a str {
        self.entry.name()
    }

    #[inline]
    pub fn kind(&self) -> RelocationKind {
        self.entry.kind()
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.entry.offset()
    }

    #[inline]
    pub fn addend(&self) -> i32 {
        self.entry.addend()
    }

    #[inline]
    pub fn destination(&self) -> usize {
        self.entry.destination()
    }

    /// Address of the patched location.
    #[inline]
    pub fn target(&self) -> usize {
        self.entry.destination() + self.entry.offset() as usize
    }

    /// Resolved address of the symbol.
    #[inline]
    pub fn symbol_address(&self) -> usize {
        self.symbol_address
    }
}

/// Writes one relocation into plugin memory.
pub trait RelocationApplier {
    /// Applies `request`. When the symbol is out of direct reach the
    /// implementation claims a slot from `trampolines` stamped with `owner`,
    /// so the slot can later be released together with the plugin.
    fn apply(
        &mut self,
        request: &RelocationRequest<'_>,
        trampolines: &mut TrampolinePool,
        category: RelocationCategory,
        owner: TrampolineId,
    ) -> Result<()>;
}

/// Installs and removes function redirections.
pub trait FunctionPatcher {
    /// Installs every descriptor not installed yet. Targets living in modules
    /// that are not resident are skipped and picked up on a later call.
    fn install(&mut self, patches: &mut [FunctionPatch]);

    /// Restores the original code of every installed descriptor.
    fn restore(&mut self, patches: &mut [FunctionPatch]);
}

/// The host heaps plugin memory is returned to.
pub trait HeapAllocator {
    /// Frees a buffer taken from the bulk MEM2 region.
    fn free_mem2(&mut self, region: MemoryRegion<Image>);

    /// Frees a block back to the expanding heap `heap`.
    fn free_to_exp_heap<K: RegionKind>(&mut self, heap: HeapHandle, region: MemoryRegion<K>);
}

/// Cache maintenance after writing code.
pub trait CacheControl {
    fn flush_data(&mut self, address: usize, len: usize);
    fn invalidate_instruction(&mut self, address: usize, len: usize);
}

/// The full set of host services.
pub trait Host: ModuleResolver + RelocationApplier + FunctionPatcher + HeapAllocator + CacheControl {}

impl<T> Host for T where
    T: ModuleResolver + RelocationApplier + FunctionPatcher + HeapAllocator + CacheControl
{
}

/// Turns plugin binaries into metadata and linking information.
pub trait PluginFactory {
    /// Reads the metadata of a binary.
    fn load_meta_information(&mut self, data: &PluginData) -> Result<MetaInformation>;

    /// Allocates memory for the plugin from `heap`, copies its sections and
    /// collects relocations, sections, hooks and patches. Internal fixups may
    /// already claim trampoline slots for `trampoline_id`.
    fn load_plugin_info(
        &mut self,
        data: &PluginData,
        heap: HeapHandle,
        trampolines: &mut TrampolinePool,
        trampoline_id: TrampolineId,
    ) -> Result<PluginInfo>;
}
