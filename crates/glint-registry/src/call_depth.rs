//! Static call depth limit.

use glint_core::{CompileError, Diagnostics};

use crate::call_graph::CallGraph;

/// Depth of the deepest call chain starting at each record, by index.
///
/// A function that calls nothing has depth 1. Callees always precede their
/// callers, so one forward pass is enough.
pub fn call_depths(graph: &CallGraph<'_>) -> Vec<u32> {
    let mut depths: Vec<u32> = Vec::with_capacity(graph.len());
    for record in graph.records() {
        let deepest = record
            .callees
            .iter()
            .map(|&callee| depths[callee])
            .max()
            .unwrap_or(0);
        depths.push(deepest + 1);
    }
    depths
}

/// Report the first function whose call depth exceeds `limit`.
///
/// Returns `true` if every function is within the limit.
pub fn check_call_depth(graph: &CallGraph<'_>, limit: u32, diagnostics: &mut Diagnostics) -> bool {
    let depths = call_depths(graph);
    let Some((record, &depth)) = graph
        .records()
        .iter()
        .zip(&depths)
        .find(|&(_, &depth)| depth > limit)
    else {
        return true;
    };

    diagnostics.report(CompileError::CallStackTooDeep {
        function: record.plain_name.to_string(),
        depth,
        limit,
        span: record.span(),
    });
    false
}
