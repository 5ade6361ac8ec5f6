use super::{HookContext, HookStage};
use crate::{plugin::PluginContainer, registry::Registry};

/// Stages broadcast by [`call_init_hooks`], in order.
pub const INIT_SEQUENCE: [HookStage; 7] = [
    HookStage::InitVidMem,
    HookStage::InitKernel,
    HookStage::InitOverlay,
    HookStage::InitPlugin,
    HookStage::InitWutMalloc,
    HookStage::InitWutNewlib,
    HookStage::InitWutStdcpp,
];

/// Stages broadcast by [`call_deinit_hooks`], in order. The runtime stages
/// are torn down in the reverse of their init order.
pub const DEINIT_SEQUENCE: [HookStage; 7] = [
    HookStage::ReleaseForeground,
    HookStage::ApplicationEnds,
    HookStage::DeinitPlugin,
    HookStage::FiniWutDevoptab,
    HookStage::FiniWutStdcpp,
    HookStage::FiniWutNewlib,
    HookStage::FiniWutMalloc,
];

/// Runs the handlers `plugin` declares for `stage`, returning how many ran.
fn invoke(index: usize, plugin: &mut PluginContainer, stage: HookStage) -> usize {
    let (meta, info, _) = plugin.parts_mut();
    let Some(info) = info else {
        return 0;
    };
    let ctx = HookContext::new(index, meta, info.trampoline_id());
    let mut called = 0;
    for hook in info.hooks_mut().iter_mut().filter(|hook| hook.stage() == stage) {
        hook.invoke(&ctx);
        called += 1;
    }
    called
}

/// Broadcasts `stage` to every plugin, in registry order.
///
/// Inert plugins are skipped. Returns the number of handlers invoked.
pub fn call_hook(registry: &mut Registry, stage: HookStage) -> usize {
    #[cfg(feature = "log")]
    log::trace!("calling hook [{}]", stage);
    registry
        .plugins_mut()
        .iter_mut()
        .enumerate()
        .map(|(index, plugin)| invoke(index, plugin, stage))
        .sum()
}

/// Invokes `stage` for the plugin in slot `index` only.
pub fn call_hook_for(registry: &mut Registry, index: usize, stage: HookStage) -> usize {
    match registry.get_mut(index) {
        Some(plugin) => invoke(index, plugin, stage),
        None => 0,
    }
}

/// Broadcasts the initialisation stages.
pub fn call_init_hooks(registry: &mut Registry) {
    for stage in INIT_SEQUENCE {
        call_hook(registry, stage);
    }
    #[cfg(feature = "log")]
    log::debug!("done calling init hooks");
}

/// Broadcasts the teardown stages.
pub fn call_deinit_hooks(registry: &mut Registry) {
    for stage in DEINIT_SEQUENCE {
        call_hook(registry, stage);
    }
    #[cfg(feature = "log")]
    log::debug!("done calling deinit hooks");
}
