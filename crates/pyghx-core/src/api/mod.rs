//! API implementation submodules.
//!
//! Each submodule contains `impl Pyghx` blocks. The struct definition lives in
//! `lib.rs`.

mod builder;
mod run;

pub use builder::PyghxBuilder;
pub use run::ResolvedPackage;
