//! Function patch descriptors.

use alloc::string::String;

/// Whether a descriptor's redirection is currently installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchState {
    #[default]
    Unpatched,
    /// Installed; `original` is what the patcher needs to undo it.
    Patched { original: usize },
}

/// Redirects one host function to plugin code.
///
/// The descriptor names the target and the replacement. The patcher records
/// whatever it needs for restoration in [`FunctionPatch::state`], so the same
/// descriptor can be installed again after a new module shows up and restored
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPatch {
    library: String,
    function: String,
    replacement: usize,
    call_original: usize,
    state: PatchState,
}

impl FunctionPatch {
    /// Redirects `function` in `library` to `replacement`. The address of the
    /// untouched function is written to `call_original` on install, so the
    /// replacement can chain to it.
    pub fn new(library: &str, function: &str, replacement: usize, call_original: usize) -> Self {
        Self {
            library: String::from(library),
            function: String::from(function),
            replacement,
            call_original,
            state: PatchState::Unpatched,
        }
    }

    #[inline]
    pub fn library(&self) -> &str {
        &self.library
    }

    #[inline]
    pub fn function(&self) -> &str {
        &self.function
    }

    #[inline]
    pub fn replacement(&self) -> usize {
        self.replacement
    }

    #[inline]
    pub fn call_original(&self) -> usize {
        self.call_original
    }

    #[inline]
    pub fn state(&self) -> PatchState {
        self.state
    }

    #[inline]
    pub fn is_patched(&self) -> bool {
        matches!(self.state, PatchState::Patched { .. })
    }

    /// Records a successful install.
    pub fn mark_patched(&mut self, original: usize) {
        self.state = PatchState::Patched { original };
    }

    /// Clears the install record, returning what has to be written back.
    pub fn take_original(&mut self) -> Option<usize> {
        match core::mem::take(&mut self.state) {
            PatchState::Patched { original } => Some(original),
            PatchState::Unpatched => None,
        }
    }
}
