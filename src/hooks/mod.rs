//! Lifecycle hooks offered by plugins and the order they run in.
//!
//! A plugin declares handlers for any subset of [`HookStage`]. The backend
//! invokes them either as a broadcast (every plugin, registry order) or for a
//! single plugin, see [`call_hook`] and [`call_hook_for`].

mod dispatch;
mod patching;

pub use dispatch::{
    DEINIT_SEQUENCE, INIT_SEQUENCE, call_deinit_hooks, call_hook, call_hook_for, call_init_hooks,
};
pub use patching::{ModuleLoadQueue, install_patches_and_run_hooks, process_module_loads};

use crate::plugin::{MetaInformation, TrampolineId};
use alloc::boxed::Box;
use core::fmt::Debug;

/// A point in the plugin lifecycle at which plugin code may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    InitOverlay,
    InitKernel,
    InitVidMem,
    InitWutMalloc,
    FiniWutMalloc,
    InitWutNewlib,
    FiniWutNewlib,
    InitWutStdcpp,
    FiniWutStdcpp,
    InitWutDevoptab,
    FiniWutDevoptab,
    InitPlugin,
    DeinitPlugin,
    ApplicationStart,
    FunctionsPatched,
    ReleaseForeground,
    AcquiredForeground,
    ApplicationRequestsExit,
    ApplicationEnds,
}

impl HookStage {
    /// Every stage, in declaration order.
    pub const ALL: [HookStage; 19] = [
        HookStage::InitOverlay,
        HookStage::InitKernel,
        HookStage::InitVidMem,
        HookStage::InitWutMalloc,
        HookStage::FiniWutMalloc,
        HookStage::InitWutNewlib,
        HookStage::FiniWutNewlib,
        HookStage::InitWutStdcpp,
        HookStage::FiniWutStdcpp,
        HookStage::InitWutDevoptab,
        HookStage::FiniWutDevoptab,
        HookStage::InitPlugin,
        HookStage::DeinitPlugin,
        HookStage::ApplicationStart,
        HookStage::FunctionsPatched,
        HookStage::ReleaseForeground,
        HookStage::AcquiredForeground,
        HookStage::ApplicationRequestsExit,
        HookStage::ApplicationEnds,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            HookStage::InitOverlay => "INIT_OVERLAY",
            HookStage::InitKernel => "INIT_KERNEL",
            HookStage::InitVidMem => "INIT_VID_MEM",
            HookStage::InitWutMalloc => "INIT_WUT_MALLOC",
            HookStage::FiniWutMalloc => "FINI_WUT_MALLOC",
            HookStage::InitWutNewlib => "INIT_WUT_NEWLIB",
            HookStage::FiniWutNewlib => "FINI_WUT_NEWLIB",
            HookStage::InitWutStdcpp => "INIT_WUT_STDCPP",
            HookStage::FiniWutStdcpp => "FINI_WUT_STDCPP",
            HookStage::InitWutDevoptab => "INIT_WUT_DEVOPTAB",
            HookStage::FiniWutDevoptab => "FINI_WUT_DEVOPTAB",
            HookStage::InitPlugin => "INIT_PLUGIN",
            HookStage::DeinitPlugin => "DEINIT_PLUGIN",
            HookStage::ApplicationStart => "APPLICATION_START",
            HookStage::FunctionsPatched => "FUNCTIONS_PATCHED",
            HookStage::ReleaseForeground => "RELEASE_FOREGROUND",
            HookStage::AcquiredForeground => "ACQUIRED_FOREGROUND",
            HookStage::ApplicationRequestsExit => "APPLICATION_REQUESTS_EXIT",
            HookStage::ApplicationEnds => "APPLICATION_ENDS",
        }
    }
}

impl core::fmt::Display for HookStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a handler learns about the plugin it runs for.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    index: usize,
    meta: &'a MetaInformation,
    trampoline_id: TrampolineId,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(index: usize, meta: &'a MetaInformation, trampoline_id: TrampolineId) -> Self {
        Self {
            index,
            meta,
            trampoline_id,
        }
    }

    /// Slot of the plugin in the registry.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn meta(&self) -> &'a MetaInformation {
        self.meta
    }

    #[inline]
    pub fn trampoline_id(&self) -> TrampolineId {
        self.trampoline_id
    }
}

/// Plugin code run at a hook stage.
///
/// # Examples
/// ```rust
/// use plugin_backend::hooks::{HookContext, HookHandler, HookStage};
///
/// let mut started = 0;
/// let mut handler = |stage: HookStage, _ctx: &HookContext<'_>| {
///     if stage == HookStage::ApplicationStart {
///         started += 1;
///     }
/// };
/// # let _ = &mut handler as &mut dyn HookHandler;
/// ```
pub trait HookHandler {
    fn invoke(&mut self, stage: HookStage, ctx: &HookContext<'_>);
}

impl<F> HookHandler for F
where
    F: FnMut(HookStage, &HookContext<'_>),
{
    fn invoke(&mut self, stage: HookStage, ctx: &HookContext<'_>) {
        self(stage, ctx)
    }
}

/// A hook declared by a plugin: the stage and the code to run.
pub struct HookEntry {
    stage: HookStage,
    handler: Box<dyn HookHandler>,
}

impl HookEntry {
    pub fn new(stage: HookStage, handler: impl HookHandler + 'static) -> Self {
        Self {
            stage,
            handler: Box::new(handler),
        }
    }

    /// A hook pointing at a native entry point inside the plugin image.
    pub fn native(stage: HookStage, entry: extern "C" fn()) -> Self {
        Self::new(stage, move |_: HookStage, _: &HookContext<'_>| entry())
    }

    #[inline]
    pub fn stage(&self) -> HookStage {
        self.stage
    }

    pub(crate) fn invoke(&mut self, ctx: &HookContext<'_>) {
        self.handler.invoke(self.stage, ctx);
    }
}

impl Debug for HookEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookEntry")
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}
