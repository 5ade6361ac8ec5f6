use crate::{
    Result,
    config::BackendConfig,
    hooks::{self, HookStage, ModuleLoadQueue},
    host::{Host, PluginFactory},
    lifecycle::{self, UnloadReport},
    loader,
    memory::{HeapHandle, PluginData},
    patch::FunctionPatch,
    registry::Registry,
    relocation, section,
};
use alloc::vec::Vec;

/// Drives plugins through their whole lifecycle on top of a [`Host`].
///
/// The backend owns the host services, its configuration and the framework's
/// own function patches. The [`Registry`] is always passed in by the caller.
///
/// # Examples
/// ```rust,ignore
/// let mut backend = Backend::new(host).with_framework_patches(framework_patches);
/// let mut registry = Registry::new();
///
/// backend.load_and_start(&mut registry, &mut factory, binaries, heap)?;
/// // ... application runs, the host loads more modules ...
/// backend.process_module_loads(&mut registry);
/// // ... application exits ...
/// backend.call_deinit_hooks(&mut registry);
/// backend.unload(&mut registry, heap, true);
/// ```
pub struct Backend<H> {
    host: H,
    config: BackendConfig,
    framework_patches: Vec<FunctionPatch>,
    module_loads: ModuleLoadQueue,
}

impl<H: Host> Backend<H> {
    /// A backend with the default configuration and no framework patches.
    pub fn new(host: H) -> Self {
        Self::with_config(host, BackendConfig::default())
    }

    pub fn with_config(host: H, config: BackendConfig) -> Self {
        Self {
            host,
            config,
            framework_patches: Vec::new(),
            module_loads: ModuleLoadQueue::new(),
        }
    }

    /// The backend's own patches, installed before any plugin patch and only
    /// restored by a full teardown.
    pub fn with_framework_patches(mut self, patches: Vec<FunctionPatch>) -> Self {
        self.framework_patches = patches;
        self
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[inline]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[inline]
    pub fn framework_patches(&self) -> &[FunctionPatch] {
        &self.framework_patches
    }

    #[inline]
    pub fn module_loads(&self) -> &ModuleLoadQueue {
        &self.module_loads
    }

    /// See [`loader::load`].
    pub fn load<F>(
        &mut self,
        registry: &mut Registry,
        factory: &mut F,
        binaries: impl IntoIterator<Item = PluginData>,
        heap: HeapHandle,
    ) -> usize
    where
        F: PluginFactory + ?Sized,
    {
        loader::load(registry, factory, binaries, heap)
    }

    /// See [`relocation::relocate_all`].
    pub fn relocate(&mut self, registry: &mut Registry) {
        relocation::relocate_all(&mut self.host, self.config.redirects(), registry);
    }

    /// See [`section::zero_uninitialized_data`].
    pub fn zero_uninitialized_data(&mut self, registry: &mut Registry) {
        section::zero_uninitialized_data(registry);
    }

    pub fn call_hook(&mut self, registry: &mut Registry, stage: HookStage) -> usize {
        hooks::call_hook(registry, stage)
    }

    pub fn call_init_hooks(&mut self, registry: &mut Registry) {
        hooks::call_init_hooks(registry);
    }

    /// See [`hooks::install_patches_and_run_hooks`].
    pub fn install_patches(&mut self, registry: &mut Registry) -> Result<()> {
        hooks::install_patches_and_run_hooks(
            &mut self.host,
            registry,
            &mut self.framework_patches,
            self.config.patch_region(),
            &self.module_loads,
        )
    }

    /// See [`hooks::process_module_loads`].
    pub fn process_module_loads(&mut self, registry: &mut Registry) -> bool {
        hooks::process_module_loads(&mut self.host, registry, &self.module_loads)
    }

    pub fn call_deinit_hooks(&mut self, registry: &mut Registry) {
        hooks::call_deinit_hooks(registry);
    }

    /// See [`lifecycle::restore_patches`].
    pub fn restore_patches(&mut self, registry: &mut Registry, plugin_only: bool) {
        lifecycle::restore_patches(
            &mut self.host,
            registry,
            &mut self.framework_patches,
            plugin_only,
        );
    }

    /// See [`lifecycle::unload`].
    pub fn unload(
        &mut self,
        registry: &mut Registry,
        heap: HeapHandle,
        free_plugin_data: bool,
    ) -> UnloadReport {
        lifecycle::unload(&mut self.host, registry, heap, free_plugin_data)
    }

    /// Loads `binaries` and runs every phase up to active patches:
    /// relocation, BSS clearing, init hooks and patch installation.
    pub fn load_and_start<F>(
        &mut self,
        registry: &mut Registry,
        factory: &mut F,
        binaries: impl IntoIterator<Item = PluginData>,
        heap: HeapHandle,
    ) -> Result<usize>
    where
        F: PluginFactory + ?Sized,
    {
        let loaded = self.load(registry, factory, binaries, heap);
        self.relocate(registry);
        self.zero_uninitialized_data(registry);
        self.call_init_hooks(registry);
        self.install_patches(registry)?;
        Ok(loaded)
    }
}
