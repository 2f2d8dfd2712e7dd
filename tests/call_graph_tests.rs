//! Integration tests for call graph construction and the analyses built on it.

use glint::ast::{Function, NodeBuilder, NodeRef, SymbolKind, Type};
use glint::core::{Diagnostics, PoolAllocator};
use glint::registry::{CallGraph, CallGraphResult, call_depths, check_call_depth};

fn function<'a>(pool: &'a PoolAllocator, name: &str) -> &'a Function<'a> {
    Function::new_in(pool, name, Type::void(), &[], SymbolKind::UserDefined)
}

fn calls<'a>(build: NodeBuilder<'a>, callees: &[&'a Function<'a>]) -> Vec<NodeRef<'a>> {
    callees.iter().map(|callee| build.call(callee, &[])).collect()
}

fn init<'a>(
    pool: &'a PoolAllocator,
    root: NodeRef<'a>,
) -> (CallGraph<'a>, CallGraphResult, Diagnostics) {
    let mut graph = CallGraph::new();
    let mut diagnostics = Diagnostics::new();
    let result = graph.init(pool, root, &mut diagnostics);
    (graph, result, diagnostics)
}

#[test]
fn test_chain_is_numbered_callees_first() {
    let pool = PoolAllocator::default();
    let build = NodeBuilder::new(&pool);
    let (a, b, c) = (function(&pool, "A"), function(&pool, "B"), function(&pool, "C"));
    let unit = build.translation_unit(&[
        build.function(a, &calls(build, &[b])),
        build.function(b, &calls(build, &[c])),
        build.function(c, &[]),
    ]);

    let (graph, result, diagnostics) = init(&pool, unit.root());
    assert_eq!(result, CallGraphResult::Success);
    assert!(diagnostics.is_empty());
    assert_eq!(graph.name_to_index("C("), Some(0));
    assert_eq!(graph.name_to_index("B("), Some(1));
    assert_eq!(graph.name_to_index("A("), Some(2));
    assert_eq!(call_depths(&graph), [1, 2, 3]);
}

#[test]
fn test_every_edge_points_to_a_lower_index() {
    let pool = PoolAllocator::default();
    let build = NodeBuilder::new(&pool);
    let names = ["main", "shade", "light", "fresnel", "fog", "noise"];
    let functions: Vec<_> = names.iter().map(|name| function(&pool, name)).collect();
    let [main, shade, light, fresnel, fog, noise] = functions[..] else {
        unreachable!()
    };
    let unit = build.translation_unit(&[
        build.prototype(noise),
        build.function(fog, &calls(build, &[noise])),
        build.function(fresnel, &[]),
        build.function(light, &calls(build, &[fresnel, noise])),
        build.function(shade, &calls(build, &[light, fresnel, fog])),
        build.function(main, &calls(build, &[shade, fog])),
    ]);

    let (graph, result, _) = init(&pool, unit.root());
    assert_eq!(result, CallGraphResult::Success);
    assert_eq!(graph.len(), names.len());
    for record in graph.records() {
        assert!(record.callees.windows(2).all(|pair| pair[0] < pair[1]));
        for &callee in &record.callees {
            assert!(callee < record.index, "{} calls a later function", record.plain_name);
        }
    }
    assert!(!graph.find_by_plain_name("noise").unwrap().is_defined());
    assert_eq!(graph.find_by_plain_name("main").unwrap().index, names.len() - 1);
}

#[test]
fn test_mutual_recursion_is_rejected() {
    let pool = PoolAllocator::default();
    let build = NodeBuilder::new(&pool);
    let (a, b) = (function(&pool, "A"), function(&pool, "B"));
    let unit = build.translation_unit(&[
        build.prototype(b),
        build.function(a, &calls(build, &[b])),
        build.function(b, &calls(build, &[a])),
    ]);

    let (graph, result, diagnostics) = init(&pool, unit.root());
    assert_eq!(result, CallGraphResult::RecursionDetected);
    assert!(graph.is_empty());
    assert_eq!(graph.name_to_index("A("), None);
    assert_eq!(diagnostics.error_count(), 1);
    let message = &diagnostics.errors().next().unwrap().message;
    assert!(message.starts_with("recursive function call"), "{message}");
    assert!(message.contains("A") && message.contains("B"), "{message}");
}

#[test]
fn test_builtin_calls_are_not_edges() {
    let pool = PoolAllocator::default();
    let build = NodeBuilder::new(&pool);
    let builtin = Function::new_in(&pool, "max", Type::float(), &[], SymbolKind::BuiltIn);
    let main = function(&pool, "main");
    let unit = build.translation_unit(&[build.function(main, &calls(build, &[builtin]))]);

    let (graph, result, _) = init(&pool, unit.root());
    assert_eq!(result, CallGraphResult::Success);
    assert_eq!(graph.len(), 1);
    assert!(graph.record(0).unwrap().callees.is_empty());
}

#[test]
fn test_reinit_replaces_previous_graph() {
    let pool = PoolAllocator::default();
    let build = NodeBuilder::new(&pool);
    let (main, helper) = (function(&pool, "main"), function(&pool, "helper"));
    let first = build.translation_unit(&[
        build.function(helper, &[]),
        build.function(main, &calls(build, &[helper])),
    ]);
    let second = build.translation_unit(&[build.function(main, &[])]);

    let mut graph = CallGraph::new();
    let mut diagnostics = Diagnostics::new();
    graph.init(&pool, first.root(), &mut diagnostics);
    assert_eq!(graph.len(), 2);
    graph.init(&pool, second.root(), &mut diagnostics);
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.name_to_index("helper("), None);
}

#[test]
fn test_call_depth_limit_names_deepest_function() {
    let pool = PoolAllocator::default();
    let build = NodeBuilder::new(&pool);
    let (outer, middle, inner) = (
        function(&pool, "outer"),
        function(&pool, "middle"),
        function(&pool, "inner"),
    );
    let unit = build.translation_unit(&[
        build.function(inner, &[]),
        build.function(middle, &calls(build, &[inner])),
        build.function(outer, &calls(build, &[middle])),
    ]);

    let (graph, _, _) = init(&pool, unit.root());
    let mut diagnostics = Diagnostics::new();
    assert!(check_call_depth(&graph, 3, &mut diagnostics));
    assert!(!check_call_depth(&graph, 2, &mut diagnostics));
    assert!(diagnostics.errors().next().unwrap().message.contains("'outer'"));
}
