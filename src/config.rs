//! Runtime configuration of the backend.

use alloc::{borrow::Cow, vec, vec::Vec};

/// Module providing the private mapped-memory allocator.
pub const MAPPED_MEMORY_MODULE: &str = "homebrew_memorymapping";
/// Start of the code region patches are written into.
pub const PATCH_REGION_ADDRESS: usize = 0x0080_0000;
/// Length of the code region patches are written into.
pub const PATCH_REGION_LEN: usize = 0x0080_0000;

/// An import that is resolved to a differently named export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRedirect {
    symbol: Cow<'static, str>,
    export: Cow<'static, str>,
}

impl SymbolRedirect {
    pub fn new(symbol: impl Into<Cow<'static, str>>, export: impl Into<Cow<'static, str>>) -> Self {
        Self {
            symbol: symbol.into(),
            export: export.into(),
        }
    }

    /// The imported name that is redirected.
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The export it is resolved to instead.
    #[inline]
    pub fn export(&self) -> &str {
        &self.export
    }
}

/// Imports that are always resolved against one fixed module, whatever
/// module the plugin declares them from.
///
/// The default sends the default-heap allocator calls of every plugin to the
/// mapped-memory allocator, keeping plugin heap traffic out of the host's
/// shared default heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorRedirects {
    module: Cow<'static, str>,
    redirects: Vec<SymbolRedirect>,
}

impl AllocatorRedirects {
    /// No redirection at all.
    pub fn none() -> Self {
        Self {
            module: Cow::Borrowed(MAPPED_MEMORY_MODULE),
            redirects: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<Cow<'static, str>>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_redirect(mut self, redirect: SymbolRedirect) -> Self {
        self.redirects.push(redirect);
        self
    }

    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[inline]
    pub fn redirects(&self) -> &[SymbolRedirect] {
        &self.redirects
    }

    /// The export `symbol` is redirected to, if any.
    pub fn lookup(&self, symbol: &str) -> Option<&str> {
        self.redirects
            .iter()
            .find(|redirect| redirect.symbol() == symbol)
            .map(SymbolRedirect::export)
    }
}

impl Default for AllocatorRedirects {
    fn default() -> Self {
        Self {
            module: Cow::Borrowed(MAPPED_MEMORY_MODULE),
            redirects: vec![
                SymbolRedirect::new("MEMAllocFromDefaultHeap", "MEMAllocFromMappedMemory"),
                SymbolRedirect::new("MEMAllocFromDefaultHeapEx", "MEMAllocFromMappedMemoryEx"),
                SymbolRedirect::new("MEMFreeToDefaultHeap", "MEMFreeToMappedMemory"),
            ],
        }
    }
}

/// A range of executable memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRegion {
    pub address: usize,
    pub len: usize,
}

impl CodeRegion {
    pub const fn new(address: usize, len: usize) -> Self {
        Self { address, len }
    }
}

impl Default for CodeRegion {
    fn default() -> Self {
        Self::new(PATCH_REGION_ADDRESS, PATCH_REGION_LEN)
    }
}

/// Configuration of a [`Backend`](crate::Backend).
///
/// # Examples
/// ```rust
/// use plugin_backend::config::{AllocatorRedirects, BackendConfig, CodeRegion, SymbolRedirect};
///
/// let config = BackendConfig::default()
///     .with_patch_region(CodeRegion::new(0x0100_0000, 0x1000))
///     .with_redirects(
///         AllocatorRedirects::none()
///             .with_module("custom_allocator")
///             .with_redirect(SymbolRedirect::new("malloc", "custom_malloc")),
///     );
/// assert_eq!(config.redirects().lookup("malloc"), Some("custom_malloc"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    redirects: AllocatorRedirects,
    patch_region: CodeRegion,
}

impl BackendConfig {
    pub fn with_redirects(mut self, redirects: AllocatorRedirects) -> Self {
        self.redirects = redirects;
        self
    }

    /// Region flushed after the framework patches are installed.
    pub fn with_patch_region(mut self, region: CodeRegion) -> Self {
        self.patch_region = region;
        self
    }

    #[inline]
    pub fn redirects(&self) -> &AllocatorRedirects {
        &self.redirects
    }

    #[inline]
    pub fn patch_region(&self) -> CodeRegion {
        self.patch_region
    }
}
