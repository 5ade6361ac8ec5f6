use super::{HookStage, call_hook, call_hook_for};
use crate::{
    Result,
    config::CodeRegion,
    host::{CacheControl, FunctionPatcher, LoadNotification, ModuleEvent, ModuleResolver},
    patch::FunctionPatch,
    plugin::PluginState,
    registry::Registry,
    sync::{Arc, AtomicUsize, Ordering},
};
use alloc::boxed::Box;

/// Module-load events waiting to trigger a re-patch.
///
/// The notification handed to the host only counts events with a release
/// store. [`process_module_loads`] takes the count with an acquire swap, so
/// everything the host did before notifying is visible to the re-patch. The
/// registry itself is never touched from the notification.
#[derive(Debug, Clone)]
pub struct ModuleLoadQueue {
    pending: Arc<AtomicUsize>,
}

impl ModuleLoadQueue {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A callback for the host's dynamic loader feeding this queue.
    pub fn notifier(&self) -> LoadNotification {
        let pending = self.pending.clone();
        Box::new(move |event: ModuleEvent| {
            if let ModuleEvent::Loaded(_) = event {
                pending.fetch_add(1, Ordering::Release);
            }
        })
    }

    /// Number of module loads not processed yet.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn take(&self) -> usize {
        self.pending.swap(0, Ordering::AcqRel)
    }
}

impl Default for ModuleLoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the framework patches, then every plugin's own patches, and runs
/// the hooks around them.
///
/// 1. install `framework` patches;
/// 2. flush and invalidate `patch_region` so the new code is fetched;
/// 3. broadcast [`HookStage::InitWutDevoptab`];
/// 4. for each plugin in registry order: [`HookStage::ApplicationStart`],
///    install its patches, [`HookStage::FunctionsPatched`];
/// 5. register `queue` with the host's dynamic loader, so modules loaded later
///    lead to a re-patch through [`process_module_loads`].
///
/// The returned error only concerns step 5; the patches are in place either way.
pub fn install_patches_and_run_hooks<H>(
    host: &mut H,
    registry: &mut Registry,
    framework: &mut [FunctionPatch],
    patch_region: CodeRegion,
    queue: &ModuleLoadQueue,
) -> Result<()>
where
    H: FunctionPatcher + CacheControl + ModuleResolver + ?Sized,
{
    #[cfg(feature = "log")]
    log::debug!("patching functions");
    host.install(framework);

    host.flush_data(patch_region.address, patch_region.len);
    host.invalidate_instruction(patch_region.address, patch_region.len);

    call_hook(registry, HookStage::InitWutDevoptab);
    for index in 0..registry.len() {
        call_hook_for(registry, index, HookStage::ApplicationStart);
        let Some(plugin) = registry.get_mut(index) else {
            continue;
        };
        let Some(info) = plugin.info_mut() else {
            continue;
        };
        host.install(info.functions_mut());
        plugin.mark(PluginState::PATCHED);
        call_hook_for(registry, index, HookStage::FunctionsPatched);
    }

    host.add_load_notification(queue.notifier())
        .inspect_err(|_err| {
            #[cfg(feature = "log")]
            log::error!("failed to register module load notification: {}", _err);
        })
}

/// Re-installs the patches of every plugin if the host loaded modules since
/// the last call.
///
/// The host calls this at a point that never overlaps loading or unloading.
/// Returns whether a re-patch ran.
pub fn process_module_loads<P>(
    patcher: &mut P,
    registry: &mut Registry,
    queue: &ModuleLoadQueue,
) -> bool
where
    P: FunctionPatcher + ?Sized,
{
    let loaded = queue.take();
    if loaded == 0 {
        return false;
    }
    #[cfg(feature = "log")]
    log::debug!("{} module(s) loaded, re-patching plugins", loaded);
    for plugin in registry.plugins_mut() {
        if let Some(info) = plugin.info_mut() {
            patcher.install(info.functions_mut());
        }
    }
    true
}
