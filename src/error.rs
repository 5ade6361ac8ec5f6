use alloc::borrow::Cow;
use core::fmt::{Debug, Display};

/// Error types used throughout the `plugin_backend` library.
///
/// None of these are fatal to the host: the load, patch and unload sequences
/// log them and carry on with the remaining plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The metadata of a plugin binary could not be parsed.
    ///
    /// The plugin is excluded from the registry entirely.
    ParseMetadata {
        /// A descriptive message about the parse failure.
        msg: Cow<'static, str>,
    },

    /// The plugin information (relocations, sections, hooks, patches) could
    /// not be built.
    ///
    /// The plugin stays in the registry as an inert shell.
    LoadInfo {
        /// A descriptive message about the load failure.
        msg: Cow<'static, str>,
    },

    /// An imported symbol could not be resolved against the host modules.
    ///
    /// Relocation of the owning plugin stops at the failing entry.
    SymbolResolution {
        /// A descriptive message naming the symbol and its module.
        msg: Cow<'static, str>,
    },

    /// The relocation primitive refused to apply an entry.
    RelocationApply {
        /// A descriptive message about the relocation error.
        msg: Cow<'static, str>,
    },

    /// Plugin memory could not be returned to its allocator.
    MemoryRelease {
        /// A descriptive message about the release failure.
        msg: Cow<'static, str>,
    },

    /// A bounded container was full.
    CapacityExceeded {
        /// A descriptive message naming the container.
        msg: Cow<'static, str>,
    },

    /// An error reported by a host or factory implementation.
    Custom {
        /// A descriptive message about the custom error.
        msg: Cow<'static, str>,
    },
}

impl Error {
    /// Returns the message carried by the error.
    pub fn msg(&self) -> &str {
        match self {
            Error::ParseMetadata { msg }
            | Error::LoadInfo { msg }
            | Error::SymbolResolution { msg }
            | Error::RelocationApply { msg }
            | Error::MemoryRelease { msg }
            | Error::CapacityExceeded { msg }
            | Error::Custom { msg } => msg,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::ParseMetadata { msg } => write!(f, "Metadata parsing error: {msg}"),
            Error::LoadInfo { msg } => write!(f, "Plugin information error: {msg}"),
            Error::SymbolResolution { msg } => write!(f, "Symbol resolution error: {msg}"),
            Error::RelocationApply { msg } => write!(f, "Relocation error: {msg}"),
            Error::MemoryRelease { msg } => write!(f, "Memory release error: {msg}"),
            Error::CapacityExceeded { msg } => write!(f, "Capacity exceeded: {msg}"),
            Error::Custom { msg } => write!(f, "Custom error: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

#[cold]
#[inline(never)]
pub fn parse_metadata_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseMetadata { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub fn load_info_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::LoadInfo { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn symbol_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::SymbolResolution { msg: msg.into() }
}

/// Creates a relocation error with the specified message.
///
/// Relocation primitives return this when an entry cannot be written, for
/// example because the trampoline pool is exhausted.
#[cold]
#[inline(never)]
pub fn relocate_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::RelocationApply { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn release_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::MemoryRelease { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn capacity_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::CapacityExceeded { msg: msg.into() }
}

/// Creates a custom error with the specified message.
#[cold]
#[inline(never)]
pub fn custom_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Custom { msg: msg.into() }
}
