//! Foundation types shared by every glint crate.
//!
//! ## Modules
//!
//! - [`arena`]: the page-based [`PoolAllocator`] that owns a compilation's tree
//! - [`diagnostics`]: the append-only [`Diagnostics`] sink
//! - [`error`]: [`CompileError`], [`ArenaError`] and [`AstInvariantError`]
//! - [`name_hash`]: deterministic [`NameHash`] identities for symbols
//! - [`options`]: versions, extensions, option flags and limits
//! - [`span`]: source locations

pub mod arena;
pub mod diagnostics;
pub mod error;
pub mod name_hash;
pub mod options;
pub mod span;

pub use arena::{PoolAllocator, PoolVec};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ArenaError, AstInvariantError, CompileError};
pub use name_hash::NameHash;
pub use options::{
    CompileOptions, Extensions, Resources, ShaderFeatures, ShaderStage, ShaderVersion,
};
pub use span::Span;
