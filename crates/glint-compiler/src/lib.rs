//! Glint Compiler
//!
//! The semantic rewrite and validation stages that run over a parsed
//! translation unit, and the pipeline that sequences them.
//!
//! ## Architecture
//!
//! - **Validation**: array sizes, the call graph (recursion, call depth,
//!   `main`), pixel local storage and framebuffer fetch rules. These only
//!   report diagnostics.
//! - **Rewriting**: declaration separation, default returns and the
//!   option-gated rewrites. These edit the tree in place.
//!
//! The first stage that reports an error stops the pipeline.
//!
//! ## Modules
//!
//! - [`passes`]: the individual passes, usable on their own
//! - [`pipeline`]: [`Pipeline`] and the fixed [`Stage`] order
//! - [`session`]: [`CompileSession`], the per-compilation state
//!
//! ## Example
//!
//! ```
//! use glint_ast::{Function, NodeBuilder, SymbolKind, Type};
//! use glint_compiler::{CompileSession, Pipeline, PipelineStatus};
//! use glint_core::{PoolAllocator, ShaderFeatures, ShaderStage, ShaderVersion};
//!
//! let pool = PoolAllocator::default();
//! let build = NodeBuilder::new(&pool);
//! let f = Function::new_in(&pool, "f", Type::float(), &[], SymbolKind::UserDefined);
//! let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
//! let unit = build.translation_unit(&[build.function(f, &[]), build.function(main, &[])]);
//!
//! let features = ShaderFeatures::new(ShaderVersion::Es300, ShaderStage::Fragment);
//! let mut session = CompileSession::new(&pool, features);
//! let symbols = session.symbol_table();
//! let output = Pipeline::new(&mut session, &symbols).run(unit);
//!
//! assert_eq!(output.status, PipelineStatus::Completed);
//! // `f` now ends in `return 0.0;`
//! assert_eq!(unit.find_function("f").unwrap().body_block().unwrap().statements.len(), 1);
//! ```

pub mod passes;
pub mod pipeline;
pub mod session;

pub use passes::ValidationOutcome;
pub use pipeline::{Pipeline, PipelineOutput, PipelineStatus, Stage, ValidationReport};
pub use session::CompileSession;
