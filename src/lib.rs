//! # plugin_backend
//! Loads independently built plugins into a running host process that has no
//! dynamic linker of its own.
//! ## Usage
//! The backend takes plugin binaries through a [`host::PluginFactory`], links
//! their imports against the modules already resident in the host, clears
//! their uninitialised data, runs their lifecycle hooks and installs the
//! function patches they declare. Teardown restores the patches and hands all
//! plugin memory back to the allocator it came from.
//!
//! Everything environment specific (export lookup, patching machine code,
//! allocators, cache maintenance) is provided by the caller through the traits
//! in [`host`]. All state lives in a [`Registry`] that the caller owns and
//! passes into every operation.
//! ## Example
//! ```rust,ignore
//! use plugin_backend::{Backend, Registry};
//!
//! let mut registry = Registry::new();
//! let mut backend = Backend::new(host);
//! backend.load_and_start(&mut registry, &mut factory, binaries, heap)?;
//! ```
#![no_std]
extern crate alloc;

mod backend;
pub mod bounded;
pub mod config;
mod error;
pub mod hooks;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod memory;
pub mod patch;
pub mod plugin;
pub mod registry;
pub mod relocation;
pub mod section;
mod sync;

pub(crate) use error::*;

pub use backend::Backend;
pub use error::{Error, custom_error, load_info_error, parse_metadata_error, relocate_error};
pub use plugin::{PluginContainer, PluginState, TrampolineId};
pub use registry::Registry;

/// A type alias for `Result`s returned by `plugin_backend` functions.
pub type Result<T> = core::result::Result<T, Error>;
