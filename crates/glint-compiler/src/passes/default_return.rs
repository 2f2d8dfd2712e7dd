//! Append `return <zero>;` to non-void functions that do not end in a return.
//!
//! Backends that require every control path of a non-void function to return
//! a value accept the result without flow analysis. Running the pass twice
//! changes nothing the second time.

use glint_ast::{BranchOp, NodeBuilder, NodeKind, NodeRef, TranslationUnit};
use glint_core::PoolAllocator;

fn ends_in_return(statements: &[NodeRef<'_>]) -> bool {
    statements
        .last()
        .and_then(|last| last.as_branch())
        .is_some_and(|branch| branch.op == BranchOp::Return)
}

/// Returns the number of functions that received a return statement.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn add_default_return_statements<'a>(
    pool: &'a PoolAllocator,
    unit: TranslationUnit<'a>,
) -> usize {
    let mut added = 0;
    for item in unit.items() {
        let NodeKind::FunctionDefinition(definition) = &item.kind else {
            continue;
        };
        let return_type = definition.function.return_type;
        if return_type.is_void() {
            continue;
        }
        let Some(body) = definition.body_block() else {
            continue;
        };
        if ends_in_return(body.statements.get()) {
            continue;
        }

        let build = NodeBuilder::new(pool).at(item.span);
        let ret = build.ret(Some(build.zero(return_type.as_temporary())));
        body.statements.push(pool, ret);
        tracing::trace!(function = definition.function.name, "added default return");
        added += 1;
    }
    added
}
