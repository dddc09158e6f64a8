//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific paths live here rather than being
//! scattered through the cache, installer and dispatcher.

pub mod paths;

pub use paths::{resolve_python, source_roots, venv_python};
