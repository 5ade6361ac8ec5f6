//! Restoring patches and releasing everything plugins own.

use crate::{
    Error,
    host::{FunctionPatcher, HeapAllocator},
    memory::{HeapHandle, MemoryType},
    patch::FunctionPatch,
    registry::Registry,
    release_error,
};
use alloc::{format, vec::Vec};

/// Restores function patches.
///
/// Plugins are restored from the last loaded to the first, since a later plugin
/// may have chained onto a function an earlier one already redirected. Unless
/// `plugin_only` is set, the `framework` patches are restored afterwards.
pub fn restore_patches<P>(
    patcher: &mut P,
    registry: &mut Registry,
    framework: &mut [FunctionPatch],
    plugin_only: bool,
) where
    P: FunctionPatcher + ?Sized,
{
    for plugin in registry.plugins_mut().iter_mut().rev() {
        if let Some(info) = plugin.info_mut() {
            patcher.restore(info.functions_mut());
        }
    }
    if !plugin_only {
        patcher.restore(framework);
    }
}

/// What [`unload`] did.
#[derive(Debug, Default)]
pub struct UnloadReport {
    /// Number of plugins that were in the registry.
    pub plugins: usize,
    /// Trampoline slots released.
    pub released_trampolines: usize,
    /// Non-fatal errors met along the way.
    pub errors: Vec<Error>,
}

impl UnloadReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Unloads every plugin and empties the registry.
///
/// Plugin patches are restored first; framework patches stay in place. Then,
/// per plugin in registry order, the binary buffer is freed through the
/// allocator its [`MemoryType`] names (only when `free_plugin_data` is set),
/// text and data memory go back to `heap` and the plugin's trampoline slots
/// are released. An unknown memory type is reported and the rest of the
/// cleanup still happens. Finally the registry is reset in one step.
///
/// Unloading an empty registry does nothing.
pub fn unload<H>(
    host: &mut H,
    registry: &mut Registry,
    heap: HeapHandle,
    free_plugin_data: bool,
) -> UnloadReport
where
    H: FunctionPatcher + HeapAllocator + ?Sized,
{
    let mut report = UnloadReport {
        plugins: registry.len(),
        ..UnloadReport::default()
    };
    if registry.is_empty() {
        return report;
    }

    restore_patches(host, registry, &mut [], true);

    let (plugins, trampolines) = registry.split_mut();
    for plugin in plugins.iter_mut() {
        let owner = plugin.trampoline_id();
        let (meta, info, data) = plugin.parts_mut();
        if free_plugin_data {
            let memory_type = data.memory_type();
            let data_heap = data.heap();
            match data.take_buffer() {
                Some(buffer) => match memory_type {
                    MemoryType::Mem2 => {
                        #[cfg(feature = "log")]
                        log::debug!("free 0x{:08x}", buffer.base());
                        host.free_mem2(buffer);
                    }
                    MemoryType::ExpHeap => {
                        #[cfg(feature = "log")]
                        log::debug!(
                            "free 0x{:08x} on exp heap 0x{:08x}",
                            buffer.base(),
                            data_heap.raw()
                        );
                        host.free_to_exp_heap(data_heap, buffer);
                    }
                    MemoryType::Unknown(tag) => {
                        let err = release_error(format!(
                            "plugin [{}]: no deallocator for memory type {tag}",
                            meta.name()
                        ));
                        #[cfg(feature = "log")]
                        log::error!("failed to free memory from plugin: {}", err);
                        report.errors.push(err);
                    }
                },
                None => {
                    #[cfg(feature = "log")]
                    log::warn!(
                        "plugin [{}] has no copy of its binary in memory, can't free it",
                        meta.name()
                    );
                }
            }
        }

        if let Some(info) = info {
            let (text, data) = info.take_memory();
            if let Some(text) = text {
                host.free_to_exp_heap(heap, text);
                #[cfg(feature = "log")]
                log::debug!("freed text 0x{:08x}", text.base());
            }
            if let Some(data) = data {
                host.free_to_exp_heap(heap, data);
                #[cfg(feature = "log")]
                log::debug!("freed data 0x{:08x}", data.base());
            }
        }

        // Inert plugins may still own slots claimed before their info load failed.
        if let Some(owner) = owner {
            report.released_trampolines += trampolines.release_owned_by(owner);
        }
    }

    registry.reset();
    report
}
