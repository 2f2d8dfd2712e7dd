//! Error types for the glint compiler core.
//!
//! Two channels exist and they never mix:
//!
//! ```text
//! CompileError       - problems in the user's shader, reported as diagnostics
//! ArenaError         - allocation failures from the pool allocator
//! AstInvariantError  - a malformed tree; internal, the pipeline panics on it
//! ```
//!
//! `CompileError` values are not returned through `Result` by the passes.
//! They are pushed into [`Diagnostics`](crate::Diagnostics) with
//! [`Diagnostics::report`](crate::Diagnostics::report), and the pipeline
//! decides whether to abort after the stage that produced them.

use thiserror::Error;

use crate::Span;
use crate::diagnostics::Severity;

// ============================================================================
// Arena Errors
// ============================================================================

/// Errors returned by [`PoolAllocator`](crate::PoolAllocator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The system allocator refused a page, or the request overflowed.
    #[error("out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The pool is locked and refuses new allocations.
    #[error("allocation from a locked pool")]
    Locked,

    /// Size and alignment do not form a valid layout.
    #[error("invalid allocation layout (size {size}, align {align})")]
    InvalidLayout { size: usize, align: usize },
}

// ============================================================================
// Compile Errors
// ============================================================================

/// Errors in the user's shader detected by analysis and validation passes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A function (transitively) calls itself.
    #[error("at {span}: recursive function call in the following call chain: {}", chain.join(" -> "))]
    Recursion {
        /// Plain function names, first and last entries are the same function.
        chain: Vec<String>,
        span: Span,
    },

    /// The longest call chain starting at a function exceeds the configured limit.
    #[error("at {span}: function call stack too deep (depth {depth} in '{function}', maximum {limit})")]
    CallStackTooDeep {
        function: String,
        depth: u32,
        limit: u32,
        span: Span,
    },

    /// The shader never defines `main`.
    #[error("missing main()")]
    MissingMain,

    /// A framebuffer-fetch variable was used without the `noncoherent` qualifier
    /// while the non-coherent extension is enabled.
    #[error(
        "at {span}: '{name}' must be declared with the 'noncoherent' qualifier when \
         GL_EXT_shader_framebuffer_fetch_non_coherent is used"
    )]
    MissingNoncoherentQualifier { name: String, span: Span },

    /// `discard` in a shader that declares pixel local storage.
    #[error("at {span}: illegal discard when pixel local storage is declared")]
    IllegalDiscardWithPixelLocalStorage { span: Span },

    /// `return` from `main` in a shader that declares pixel local storage.
    #[error("at {span}: illegal return from main when pixel local storage is declared")]
    IllegalReturnWithPixelLocalStorage { span: Span },

    /// An array variable is larger than the implementation supports.
    #[error("at {span}: size of array '{name}' ({bytes} bytes) exceeds the limit of {limit} bytes")]
    ArraySizeTooLarge {
        name: String,
        bytes: u64,
        limit: u64,
        span: Span,
    },

    /// A symbol was declared twice in the same scope.
    #[error("at {span}: redefinition of '{name}'")]
    Redefinition { name: String, span: Span },
}

impl CompileError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompileError::Recursion { span, .. } => *span,
            CompileError::CallStackTooDeep { span, .. } => *span,
            CompileError::MissingMain => Span::synthetic(),
            CompileError::MissingNoncoherentQualifier { span, .. } => *span,
            CompileError::IllegalDiscardWithPixelLocalStorage { span } => *span,
            CompileError::IllegalReturnWithPixelLocalStorage { span } => *span,
            CompileError::ArraySizeTooLarge { span, .. } => *span,
            CompileError::Redefinition { span, .. } => *span,
        }
    }

    /// Severity these errors are reported with. All of them are fatal.
    pub fn severity(&self) -> Severity {
        Severity::Error
    }

    /// The message without the location prefix.
    pub fn message(&self) -> String {
        let full = self.to_string();
        let prefix = format!("at {}: ", self.span());
        match full.strip_prefix(&prefix) {
            Some(rest) => rest.to_string(),
            None => full,
        }
    }
}

// ============================================================================
// Internal Errors
// ============================================================================

/// A structural problem in the tree, found by AST validation.
///
/// These are bugs in a pass rather than in the user's shader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstInvariantError {
    /// The same node is reachable through two different parents.
    #[error("at {span}: node reachable from more than one parent")]
    SharedNode { span: Span },

    /// An expression sits directly in a statement list where it cannot appear.
    #[error("at {span}: {found} cannot appear in a statement list")]
    NotAStatement { found: &'static str, span: Span },

    /// A declaration holds something other than a symbol or an initialization.
    #[error("at {span}: malformed declarator ({found})")]
    MalformedDeclarator { found: &'static str, span: Span },

    /// A declaration still holds several declarators after separation.
    #[error("at {span}: declaration with {count} declarators after separation")]
    UnseparatedDeclaration { count: usize, span: Span },

    /// A function definition without a prototype or body in the expected slot.
    #[error("at {span}: malformed function definition")]
    MalformedFunction { span: Span },
}

impl AstInvariantError {
    pub fn span(&self) -> Span {
        match self {
            AstInvariantError::SharedNode { span } => *span,
            AstInvariantError::NotAStatement { span, .. } => *span,
            AstInvariantError::MalformedDeclarator { span, .. } => *span,
            AstInvariantError::UnseparatedDeclaration { span, .. } => *span,
            AstInvariantError::MalformedFunction { span } => *span,
        }
    }
}
