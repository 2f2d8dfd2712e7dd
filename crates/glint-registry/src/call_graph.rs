//! Call graph analysis: which function calls which, in topological order.
//!
//! Building the graph takes two steps:
//!
//! 1. One traversal collects every prototype and definition and adds a
//!    caller → callee edge for each call to a user-defined function. Built-in
//!    calls are ignored.
//! 2. An iterative depth-first search, started from each function in
//!    declaration order, numbers every function after all of its callees.
//!    Meeting a function that is still on the search stack is recursion.
//!
//! The result is a list of [`CallGraphRecord`]s where a record's position is
//! its index and `index(callee) < index(caller)` holds for every edge, so
//! bottom-up analyses can walk the records front to back.

use glint_ast::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
use glint_ast::{
    AggregateNode, Function, FunctionDefinitionNode, NodeRef, PrototypeNode, Temporaries,
};
use glint_core::{CompileError, Diagnostics, PoolAllocator, Span};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

/// Outcome of [`CallGraph::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallGraphResult {
    Success,
    RecursionDetected,
}

/// One function in the graph.
#[derive(Debug, Clone)]
pub struct CallGraphRecord<'a> {
    /// Mangled name.
    pub name: &'a str,
    pub plain_name: &'a str,
    /// The definition node, absent for a prototype that is never defined.
    pub node: Option<NodeRef<'a>>,
    /// Indices of the functions this one calls, ascending.
    pub callees: Vec<usize>,
    pub index: usize,
}

impl<'a> CallGraphRecord<'a> {
    pub fn definition(&self) -> Option<&'a FunctionDefinitionNode<'a>> {
        self.node.and_then(|node| node.as_function_definition())
    }

    pub fn is_defined(&self) -> bool {
        self.node.is_some()
    }

    /// Location of the definition, or a synthetic span for a bare prototype.
    pub fn span(&self) -> Span {
        self.node.map(|node| node.span).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct CallGraph<'a> {
    records: Vec<CallGraphRecord<'a>>,
    name_to_index: FxHashMap<&'a str, usize>,
}

impl<'a> CallGraph<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for the tree under `root`, replacing any previous
    /// contents.
    ///
    /// On recursion an error naming the call chain is reported, the graph is
    /// left empty and [`CallGraphResult::RecursionDetected`] is returned.
    pub fn init(
        &mut self,
        pool: &'a PoolAllocator,
        root: NodeRef<'a>,
        diagnostics: &mut Diagnostics,
    ) -> CallGraphResult {
        self.clear();

        let mut collector = Collector::default();
        let mut temporaries = Temporaries::new();
        let mut cx = TraverseCx::new(pool, &mut temporaries, diagnostics);
        traverse(&mut collector, &mut cx, root);
        drop(cx);

        let graph = collector.graph;
        let callees = sorted_callees(&graph);
        let order = match assign_indices(&graph, &callees) {
            Ok(order) => order,
            Err(chain) => {
                let first = &graph[chain[0]];
                let error = CompileError::Recursion {
                    chain: chain.iter().map(|&i| graph[i].function.name.to_string()).collect(),
                    span: first.node.map(|node| node.span).unwrap_or_default(),
                };
                tracing::debug!(%error, "call graph rejected");
                diagnostics.report(error);
                return CallGraphResult::RecursionDetected;
            }
        };

        let mut records: Vec<Option<CallGraphRecord<'a>>> = vec![None; graph.node_count()];
        for node in graph.node_indices() {
            let info = &graph[node];
            let index = order[node.index()];
            let mut record_callees: Vec<usize> = callees[node.index()]
                .iter()
                .map(|callee| order[callee.index()])
                .collect();
            record_callees.sort_unstable();
            records[index] = Some(CallGraphRecord {
                name: info.function.mangled_name,
                plain_name: info.function.name,
                node: info.node,
                callees: record_callees,
                index,
            });
        }
        self.records = records.into_iter().flatten().collect();
        self.name_to_index = self
            .records
            .iter()
            .map(|record| (record.name, record.index))
            .collect();

        tracing::debug!(functions = self.records.len(), "call graph built");
        CallGraphResult::Success
    }

    /// Index of the function with the given mangled name.
    pub fn name_to_index(&self, mangled_name: &str) -> Option<usize> {
        self.name_to_index.get(mangled_name).copied()
    }

    pub fn record(&self, index: usize) -> Option<&CallGraphRecord<'a>> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[CallGraphRecord<'a>] {
        &self.records
    }

    /// Record of the function with the given plain name, if it is unique.
    pub fn find_by_plain_name(&self, name: &str) -> Option<&CallGraphRecord<'a>> {
        let mut matches = self.records.iter().filter(|record| record.plain_name == name);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.name_to_index.clear();
    }
}

// ============================================================================
// Collection
// ============================================================================

#[derive(Debug)]
struct FunctionInfo<'a> {
    function: &'a Function<'a>,
    node: Option<NodeRef<'a>>,
}

#[derive(Default)]
struct Collector<'a> {
    graph: DiGraph<FunctionInfo<'a>, ()>,
    by_name: FxHashMap<&'a str, NodeIndex>,
}

impl<'a> Collector<'a> {
    fn ensure(&mut self, function: &'a Function<'a>) -> NodeIndex {
        if let Some(&index) = self.by_name.get(function.mangled_name) {
            return index;
        }
        let index = self.graph.add_node(FunctionInfo {
            function,
            node: None,
        });
        self.by_name.insert(function.mangled_name, index);
        index
    }
}

impl<'a> Visitor<'a> for Collector<'a> {
    fn visit_function_prototype(
        &mut self,
        _node: NodeRef<'a>,
        prototype: &'a PrototypeNode<'a>,
        _cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.ensure(prototype.function);
        Action::Descend
    }

    fn visit_function_definition(
        &mut self,
        _visit: Visit,
        node: NodeRef<'a>,
        definition: &'a FunctionDefinitionNode<'a>,
        _cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let index = self.ensure(definition.function);
        self.graph[index].node = Some(node);
        Action::Descend
    }

    fn visit_aggregate(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        aggregate: &'a AggregateNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        if let Some(callee) = aggregate.function()
            && !callee.is_builtin()
            && let Some(caller) = cx.current_function()
        {
            let caller = self.ensure(caller);
            let callee = self.ensure(callee);
            self.graph.update_edge(caller, callee, ());
        }
        Action::Descend
    }
}

// ============================================================================
// Ordering
// ============================================================================

fn sorted_callees(graph: &DiGraph<FunctionInfo<'_>, ()>) -> Vec<Vec<NodeIndex>> {
    graph
        .node_indices()
        .map(|node| {
            let mut callees: Vec<NodeIndex> = graph.neighbors(node).collect();
            callees.sort_unstable();
            callees.dedup();
            callees
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Number every function after its callees. On a cycle, returns the chain
/// from the first function of the cycle back to itself.
fn assign_indices(
    graph: &DiGraph<FunctionInfo<'_>, ()>,
    callees: &[Vec<NodeIndex>],
) -> Result<Vec<usize>, Vec<NodeIndex>> {
    let mut marks = vec![Mark::Unvisited; graph.node_count()];
    let mut order = vec![0; graph.node_count()];
    let mut next = 0;

    for start in graph.node_indices() {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }
        marks[start.index()] = Mark::InProgress;
        let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];

        while let Some((node, position)) = stack.last_mut() {
            let node = *node;
            let Some(&callee) = callees[node.index()].get(*position) else {
                marks[node.index()] = Mark::Done;
                order[node.index()] = next;
                next += 1;
                stack.pop();
                continue;
            };
            *position += 1;

            match marks[callee.index()] {
                Mark::Unvisited => {
                    marks[callee.index()] = Mark::InProgress;
                    stack.push((callee, 0));
                }
                Mark::InProgress => {
                    let from = stack
                        .iter()
                        .position(|&(on_stack, _)| on_stack == callee)
                        .unwrap_or(0);
                    let mut chain: Vec<NodeIndex> =
                        stack[from..].iter().map(|&(on_stack, _)| on_stack).collect();
                    chain.push(callee);
                    return Err(chain);
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
