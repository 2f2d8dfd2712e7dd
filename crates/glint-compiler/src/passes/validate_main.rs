use glint_core::{CompileError, Diagnostics};
use glint_registry::CallGraph;

/// Mangled name of the parameterless entry point.
const MAIN: &str = "main(";

/// Report [`CompileError::MissingMain`] unless the call graph holds a
/// definition of `main()`.
pub fn check_main_defined(graph: &CallGraph<'_>, diagnostics: &mut Diagnostics) -> bool {
    let defined = graph
        .name_to_index(MAIN)
        .and_then(|index| graph.record(index))
        .is_some_and(|record| record.is_defined());
    if !defined {
        diagnostics.report(CompileError::MissingMain);
    }
    defined
}
