//! glint: a shading-language AST transformation core.
//!
//! This crate re-exports the workspace crates under one roof:
//!
//! - [`core`]: the [`PoolAllocator`](core::PoolAllocator), diagnostics, errors
//!   and configuration
//! - [`ast`]: nodes, types, symbols, [`NodeBuilder`](ast::NodeBuilder) and the
//!   traversal framework
//! - [`registry`]: the symbol table and call graph
//! - [`compiler`]: the passes and the [`Pipeline`](compiler::Pipeline)
//!
//! The [`prelude`] covers what a front end needs to build a tree and run the
//! pipeline over it.

pub use glint_ast as ast;
pub use glint_compiler as compiler;
pub use glint_core as core;
pub use glint_registry as registry;

pub mod prelude {
    pub use glint_ast::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
    pub use glint_ast::{
        BasicType, BinaryOp, Function, NodeBuilder, NodeRef, Qualifier, SymbolKind,
        TranslationUnit, Type, Variable, dump_tree,
    };
    pub use glint_compiler::{
        CompileSession, Pipeline, PipelineOutput, PipelineStatus, Stage, ValidationOutcome,
    };
    pub use glint_core::{
        CompileError, CompileOptions, Diagnostics, Extensions, PoolAllocator, Resources,
        ShaderFeatures, ShaderStage, ShaderVersion, Span,
    };
    pub use glint_registry::{CallGraph, CallGraphResult, SymbolTable};
}
