//! Tree passes run by the pipeline.
//!
//! Rewrites:
//!
//! - [`separate_declarations`]: one declarator per declaration
//! - [`add_default_return_statements`]: trailing `return <zero>;` in non-void
//!   functions
//! - [`rewrite_texel_fetch_offset`]: `texelFetchOffset` → `texelFetch`
//! - [`unfold_short_circuit_to_if`]: `||`, `&&` and `?:` with side effects
//!   become explicit branches
//! - [`scalarize_constructor_args`]: flatten matrix arguments of vector
//!   constructors and vector arguments of matrix constructors
//!
//! Read-only checks:
//!
//! - [`validate_array_sizes`], [`validate_pixel_local_storage`],
//!   [`validate_framebuffer_fetch`]: user errors, reported as diagnostics
//! - [`check_main_defined`]
//! - [`validate_ast`]: structural invariants of the tree itself

use glint_ast::traverse::TraverseCx;
use glint_ast::{BinaryOp, NodeKind, NodeRef, Variable};

mod default_return;
mod scalarize_constructor;
mod separate_declarations;
mod texel_fetch_offset;
mod unfold_short_circuit;
mod validate_array_size;
mod validate_ast;
mod validate_framebuffer_fetch;
mod validate_main;
mod validate_pixel_local_storage;

pub use default_return::add_default_return_statements;
pub use scalarize_constructor::scalarize_constructor_args;
pub use separate_declarations::separate_declarations;
pub use texel_fetch_offset::rewrite_texel_fetch_offset;
pub use unfold_short_circuit::unfold_short_circuit_to_if;
pub use validate_array_size::{std140_size, validate_array_sizes};
pub use validate_ast::validate_ast;
pub use validate_framebuffer_fetch::validate_framebuffer_fetch;
pub use validate_main::check_main_defined;
pub use validate_pixel_local_storage::validate_pixel_local_storage;

/// Whether statements can be inserted before the statement holding the
/// current node: some block encloses it and no loop header lies in between.
pub(crate) fn can_insert_before_statement(cx: &TraverseCx<'_, '_>) -> bool {
    let path = cx.path();
    let Some(block_index) = path
        .iter()
        .rposition(|node| matches!(node.kind, NodeKind::Block(_)))
    else {
        return false;
    };
    !path[block_index + 1..]
        .iter()
        .any(|node| matches!(node.kind, NodeKind::Loop(_)))
}

/// The symbol a declarator declares: the declarator itself, or the left side
/// of its initialization.
pub(crate) fn declared_symbol<'a>(
    declarator: NodeRef<'a>,
) -> Option<(NodeRef<'a>, &'a Variable<'a>)> {
    let symbol = match declarator.as_binary() {
        Some(binary) if binary.op == BinaryOp::Initialize => binary.left.get(),
        Some(_) => return None,
        None => declarator,
    };
    let variable = symbol.as_symbol()?.variable;
    Some((symbol, variable))
}

/// Result of a read-only validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationOutcome {
    /// The shader does not use the feature the pass checks.
    #[default]
    FeatureUnused,
    Valid,
    Invalid,
}

impl ValidationOutcome {
    pub fn is_invalid(self) -> bool {
        self == ValidationOutcome::Invalid
    }

    /// Outcome for a pass that saw the feature `used` and found `errors`
    /// problems.
    pub(crate) fn from_counts(used: bool, errors: usize) -> Self {
        match (used, errors) {
            (_, 1..) => ValidationOutcome::Invalid,
            (true, 0) => ValidationOutcome::Valid,
            (false, 0) => ValidationOutcome::FeatureUnused,
        }
    }
}
