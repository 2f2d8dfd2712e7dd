//! Symbol records and whole-program call analysis.
//!
//! - [`SymbolTable`]: scoped user symbols plus the built-ins the passes need
//! - [`CallGraph`]: callee-first ordering of every function, with recursion
//!   detection
//! - [`check_call_depth`]: static limit on nested calls

pub mod call_depth;
pub mod call_graph;
pub mod symbol_table;

pub use call_depth::{call_depths, check_call_depth};
pub use call_graph::{CallGraph, CallGraphRecord, CallGraphResult};
pub use symbol_table::{LAST_FRAG_DATA, SymbolTable};
