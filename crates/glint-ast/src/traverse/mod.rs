//! Depth-first traversal with pre-, in- and post-order hooks.
//!
//! A pass implements [`Visitor`] and overrides the hooks for the node kinds
//! it cares about. Every hook returns an [`Action`]:
//!
//! * [`Action::Descend`] continues normally.
//! * [`Action::Skip`] in a pre-visit leaves the children and the post-visit
//!   out; in an in-visit it stops visiting the remaining children.
//! * [`Action::Replace`] puts a new node into the slot being walked. Nothing
//!   else is touched during the walk.
//!
//! Edits anywhere else are queued on the [`TraverseCx`] and applied after the
//! walk with [`TraverseCx::commit`].
//!
//! # Example
//!
//! ```
//! use glint_ast::traverse::{traverse, Action, TraverseCx, Visitor};
//! use glint_ast::{NodeBuilder, NodeRef, SymbolNode, Temporaries, Type, Variable, SymbolKind};
//! use glint_core::{Diagnostics, PoolAllocator};
//!
//! struct SymbolCounter(usize);
//!
//! impl<'a> Visitor<'a> for SymbolCounter {
//!     fn visit_symbol(
//!         &mut self,
//!         _node: NodeRef<'a>,
//!         _symbol: &'a SymbolNode<'a>,
//!         _cx: &mut TraverseCx<'_, 'a>,
//!     ) -> Action<'a> {
//!         self.0 += 1;
//!         Action::Descend
//!     }
//! }
//!
//! let pool = PoolAllocator::default();
//! let build = NodeBuilder::new(&pool);
//! let x = Variable::new_in(&pool, "x", Type::int(), SymbolKind::UserDefined);
//! let tree = build.block(&[build.assign(build.symbol(x), build.symbol(x))]);
//!
//! let mut temporaries = Temporaries::new();
//! let mut diagnostics = Diagnostics::new();
//! let mut cx = TraverseCx::new(&pool, &mut temporaries, &mut diagnostics);
//! let mut counter = SymbolCounter(0);
//! traverse(&mut counter, &mut cx, tree);
//! assert_eq!(counter.0, 2);
//! ```

mod context;
mod fixed_point;

pub use context::TraverseCx;
pub use fixed_point::{MAX_FIXED_POINT_ITERATIONS, SingleSiteRewrite, run_to_fixed_point};

use bitflags::bitflags;
use glint_core::PoolAllocator;

use crate::node::*;

/// Which of the three visits a hook call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visit {
    Pre,
    In,
    Post,
}

bitflags! {
    /// The visits a visitor wants to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisitOrder: u8 {
        const PRE = 1 << 0;
        const IN = 1 << 1;
        const POST = 1 << 2;
    }
}

impl Default for VisitOrder {
    fn default() -> Self {
        VisitOrder::PRE
    }
}

/// What the walker does after a hook returns.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    Descend,
    Skip,
    Replace {
        node: NodeRef<'a>,
        /// Walk the replacement's children (pre-visit only).
        visit_children: bool,
    },
}

impl<'a> Action<'a> {
    /// Replace without visiting the replacement.
    pub fn replace(node: NodeRef<'a>) -> Self {
        Action::Replace {
            node,
            visit_children: false,
        }
    }
}

/// Per-kind traversal hooks. Every hook defaults to [`Action::Descend`].
///
/// Leaves (symbols, constants, prototypes) get exactly one call regardless of
/// [`visit_order`](Visitor::visit_order).
#[allow(unused_variables)]
pub trait Visitor<'a> {
    fn visit_order(&self) -> VisitOrder {
        VisitOrder::PRE
    }

    fn visit_symbol(
        &mut self,
        node: NodeRef<'a>,
        symbol: &'a SymbolNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_constant(
        &mut self,
        node: NodeRef<'a>,
        constant: &'a ConstantNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_function_prototype(
        &mut self,
        node: NodeRef<'a>,
        prototype: &'a PrototypeNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_unary(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        unary: &'a UnaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_binary(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        binary: &'a BinaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_aggregate(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        aggregate: &'a AggregateNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_ternary(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        ternary: &'a TernaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_if_else(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        if_else: &'a IfElseNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_loop(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        loop_node: &'a LoopNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_branch(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        branch: &'a BranchNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_declaration(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        declaration: &'a DeclarationNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_block(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        block: &'a BlockNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }

    fn visit_function_definition(
        &mut self,
        visit: Visit,
        node: NodeRef<'a>,
        definition: &'a FunctionDefinitionNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        Action::Descend
    }
}

/// Walk the tree under `root`.
///
/// # Panics
///
/// Panics when a hook asks to replace `root` itself, or when an in-visit hook
/// returns [`Action::Replace`].
pub fn traverse<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    cx: &mut TraverseCx<'_, 'a>,
    root: NodeRef<'a>,
) {
    let order = visitor.visit_order();
    cx.path.clear();
    cx.current_function = None;
    walk(visitor, order, cx, root, Slot::Root);
    cx.current = None;
}

// ============================================================================
// Walker
// ============================================================================

/// The place the node being walked was read from.
#[derive(Clone, Copy)]
enum Slot<'a> {
    Root,
    Link(&'a Link<'a>),
    Optional(&'a OptLink<'a>),
    Item(&'a Sequence<'a>, usize),
}

impl<'a> Slot<'a> {
    fn set(self, pool: &'a PoolAllocator, original: NodeRef<'a>, node: NodeRef<'a>) {
        match self {
            Slot::Root => panic!(
                "cannot replace the traversal root ({} at {})",
                original.kind_name(),
                original.span
            ),
            Slot::Link(link) => link.set(node),
            Slot::Optional(link) => link.set(Some(node)),
            Slot::Item(sequence, index) => sequence.replace_at(pool, index, node),
        }
    }
}

enum Child<'a> {
    Link(&'a Link<'a>),
    Optional(&'a OptLink<'a>),
    Items(&'a Sequence<'a>),
}

/// Child slots in visiting order.
fn child_slots<'a>(node: NodeRef<'a>) -> [Option<Child<'a>>; 4] {
    match &node.kind {
        NodeKind::Symbol(_) | NodeKind::Constant(_) | NodeKind::FunctionPrototype(_) => {
            [None, None, None, None]
        }
        NodeKind::Unary(unary) => [Some(Child::Link(&unary.operand)), None, None, None],
        NodeKind::Binary(binary) => [
            Some(Child::Link(&binary.left)),
            Some(Child::Link(&binary.right)),
            None,
            None,
        ],
        NodeKind::Aggregate(aggregate) => [Some(Child::Items(&aggregate.args)), None, None, None],
        NodeKind::Ternary(ternary) => [
            Some(Child::Link(&ternary.condition)),
            Some(Child::Link(&ternary.true_expr)),
            Some(Child::Link(&ternary.false_expr)),
            None,
        ],
        NodeKind::IfElse(if_else) => [
            Some(Child::Link(&if_else.condition)),
            Some(Child::Link(&if_else.then_block)),
            Some(Child::Optional(&if_else.else_block)),
            None,
        ],
        NodeKind::Loop(node) => [
            Some(Child::Optional(&node.init)),
            Some(Child::Optional(&node.condition)),
            Some(Child::Optional(&node.expression)),
            Some(Child::Link(&node.body)),
        ],
        NodeKind::Branch(branch) => [Some(Child::Optional(&branch.value)), None, None, None],
        NodeKind::Declaration(declaration) => {
            [Some(Child::Items(&declaration.declarators)), None, None, None]
        }
        NodeKind::Block(block) => [Some(Child::Items(&block.statements)), None, None, None],
        NodeKind::FunctionDefinition(definition) => [
            Some(Child::Link(&definition.prototype)),
            Some(Child::Link(&definition.body)),
            None,
            None,
        ],
    }
}

fn dispatch<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    visit: Visit,
    node: NodeRef<'a>,
    cx: &mut TraverseCx<'_, 'a>,
) -> Action<'a> {
    cx.current = Some(node);
    match &node.kind {
        NodeKind::Symbol(symbol) => visitor.visit_symbol(node, symbol, cx),
        NodeKind::Constant(constant) => visitor.visit_constant(node, constant, cx),
        NodeKind::FunctionPrototype(prototype) => {
            visitor.visit_function_prototype(node, prototype, cx)
        }
        NodeKind::Unary(unary) => visitor.visit_unary(visit, node, unary, cx),
        NodeKind::Binary(binary) => visitor.visit_binary(visit, node, binary, cx),
        NodeKind::Aggregate(aggregate) => visitor.visit_aggregate(visit, node, aggregate, cx),
        NodeKind::Ternary(ternary) => visitor.visit_ternary(visit, node, ternary, cx),
        NodeKind::IfElse(if_else) => visitor.visit_if_else(visit, node, if_else, cx),
        NodeKind::Loop(loop_node) => visitor.visit_loop(visit, node, loop_node, cx),
        NodeKind::Branch(branch) => visitor.visit_branch(visit, node, branch, cx),
        NodeKind::Declaration(declaration) => {
            visitor.visit_declaration(visit, node, declaration, cx)
        }
        NodeKind::Block(block) => visitor.visit_block(visit, node, block, cx),
        NodeKind::FunctionDefinition(definition) => {
            visitor.visit_function_definition(visit, node, definition, cx)
        }
    }
}

fn walk<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    order: VisitOrder,
    cx: &mut TraverseCx<'_, 'a>,
    node: NodeRef<'a>,
    slot: Slot<'a>,
) {
    if node.is_leaf() {
        if let Action::Replace { node: replacement, .. } = dispatch(visitor, Visit::Pre, node, cx) {
            slot.set(cx.pool(), node, replacement);
            cx.immediate_replacements += 1;
        }
        return;
    }

    let enclosing_function = cx.current_function;
    if let NodeKind::FunctionDefinition(definition) = &node.kind {
        cx.current_function = Some(definition.function);
    }

    let mut node = node;
    if order.contains(VisitOrder::PRE) {
        match dispatch(visitor, Visit::Pre, node, cx) {
            Action::Descend => {}
            Action::Skip => {
                cx.current_function = enclosing_function;
                return;
            }
            Action::Replace {
                node: replacement,
                visit_children,
            } => {
                slot.set(cx.pool(), node, replacement);
                cx.immediate_replacements += 1;
                if !visit_children || replacement.is_leaf() {
                    cx.current_function = enclosing_function;
                    return;
                }
                node = replacement;
            }
        }
    }

    cx.path.push(node);
    cx.max_depth = cx.max_depth.max(cx.path.len());
    walk_children(visitor, order, cx, node);
    cx.path.pop();

    if order.contains(VisitOrder::POST)
        && let Action::Replace {
            node: replacement, ..
        } = dispatch(visitor, Visit::Post, node, cx)
    {
        slot.set(cx.pool(), node, replacement);
        cx.immediate_replacements += 1;
    }
    cx.current_function = enclosing_function;
}

fn walk_children<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    order: VisitOrder,
    cx: &mut TraverseCx<'_, 'a>,
    node: NodeRef<'a>,
) {
    let mut visited = 0;
    for child in child_slots(node).into_iter().flatten() {
        match child {
            Child::Link(link) => {
                if !before_child(visitor, order, cx, node, &mut visited) {
                    return;
                }
                walk(visitor, order, cx, link.get(), Slot::Link(link));
            }
            Child::Optional(link) => {
                let Some(child) = link.get() else {
                    continue;
                };
                if !before_child(visitor, order, cx, node, &mut visited) {
                    return;
                }
                walk(visitor, order, cx, child, Slot::Optional(link));
            }
            Child::Items(sequence) => {
                let mut index = 0;
                while index < sequence.len() {
                    if !before_child(visitor, order, cx, node, &mut visited) {
                        return;
                    }
                    walk(visitor, order, cx, sequence.get()[index], Slot::Item(sequence, index));
                    index += 1;
                }
            }
        }
    }
}

/// Run the in-visit that precedes every child but the first. Returns `false`
/// when the remaining children are to be skipped.
fn before_child<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    order: VisitOrder,
    cx: &mut TraverseCx<'_, 'a>,
    node: NodeRef<'a>,
    visited: &mut usize,
) -> bool {
    *visited += 1;
    if *visited == 1 || !order.contains(VisitOrder::IN) {
        return true;
    }

    cx.path.pop();
    let action = dispatch(visitor, Visit::In, node, cx);
    cx.path.push(node);
    match action {
        Action::Descend => true,
        Action::Skip => false,
        Action::Replace { .. } => panic!(
            "in-visit of {} at {} cannot replace the node",
            node.kind_name(),
            node.span
        ),
    }
}

#[cfg(test)]
mod tests {
    use glint_core::{Diagnostics, Span};

    use super::*;
    use crate::builder::NodeBuilder;
    use crate::ops::BinaryOp;
    use crate::symbol::{Function, SymbolKind, Variable};
    use crate::temporaries::Temporaries;
    use crate::types::Type;

    /// Records `<visit> <kind>` for every hook call.
    #[derive(Default)]
    struct Recorder {
        order: VisitOrder,
        events: Vec<String>,
        skip_blocks: bool,
    }

    impl Recorder {
        fn with_order(order: VisitOrder) -> Self {
            Self {
                order,
                ..Self::default()
            }
        }

        fn record(&mut self, visit: Visit, node: NodeRef<'_>) {
            let visit = match visit {
                Visit::Pre => "pre",
                Visit::In => "in",
                Visit::Post => "post",
            };
            self.events.push(format!("{visit} {}", node.kind_name()));
        }
    }

    impl<'a> Visitor<'a> for Recorder {
        fn visit_order(&self) -> VisitOrder {
            self.order
        }

        fn visit_symbol(
            &mut self,
            node: NodeRef<'a>,
            _symbol: &'a SymbolNode<'a>,
            _cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.record(Visit::Pre, node);
            Action::Descend
        }

        fn visit_constant(
            &mut self,
            node: NodeRef<'a>,
            _constant: &'a ConstantNode<'a>,
            _cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.record(Visit::Pre, node);
            Action::Descend
        }

        fn visit_binary(
            &mut self,
            visit: Visit,
            node: NodeRef<'a>,
            _binary: &'a BinaryNode<'a>,
            _cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.record(visit, node);
            Action::Descend
        }

        fn visit_aggregate(
            &mut self,
            visit: Visit,
            node: NodeRef<'a>,
            _aggregate: &'a AggregateNode<'a>,
            _cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.record(visit, node);
            Action::Descend
        }

        fn visit_block(
            &mut self,
            visit: Visit,
            node: NodeRef<'a>,
            _block: &'a BlockNode<'a>,
            _cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.record(visit, node);
            if self.skip_blocks && visit == Visit::Pre {
                Action::Skip
            } else {
                Action::Descend
            }
        }
    }

    struct Fixture<'a> {
        build: NodeBuilder<'a>,
        x: &'a Variable<'a>,
    }

    impl<'a> Fixture<'a> {
        fn new(pool: &'a PoolAllocator) -> Self {
            Self {
                build: NodeBuilder::new(pool),
                x: Variable::new_in(pool, "x", Type::int(), SymbolKind::UserDefined),
            }
        }

        fn sum(&self, value: i32) -> NodeRef<'a> {
            let x = self.build.symbol(self.x);
            self.build.binary(BinaryOp::Add, x, self.build.int(value), Type::int())
        }
    }

    fn run<'a, V: Visitor<'a>>(pool: &'a PoolAllocator, visitor: &mut V, root: NodeRef<'a>) {
        let mut temporaries = Temporaries::new();
        let mut diagnostics = Diagnostics::new();
        let mut cx = TraverseCx::new(pool, &mut temporaries, &mut diagnostics);
        traverse(visitor, &mut cx, root);
    }

    #[test]
    fn pre_in_post_order() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let tree = fx.build.block(&[fx.sum(1)]);

        let mut recorder = Recorder::with_order(VisitOrder::all());
        run(&pool, &mut recorder, tree);
        assert_eq!(
            recorder.events,
            [
                "pre block",
                "pre binary",
                "pre symbol",
                "in binary",
                "pre constant",
                "post binary",
                "post block",
            ]
        );
    }

    #[test]
    fn default_order_is_pre_only() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let tree = fx.build.block(&[fx.sum(1)]);

        let mut recorder = Recorder::default();
        assert_eq!(recorder.order, VisitOrder::PRE);
        run(&pool, &mut recorder, tree);
        assert_eq!(recorder.events, ["pre block", "pre binary", "pre symbol", "pre constant"]);
    }

    #[test]
    fn in_visit_between_each_argument() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let args = [fx.build.int(1), fx.build.int(2), fx.build.int(3)];
        let tree = fx.build.construct(Type::vec(crate::types::BasicType::Int, 3), &args);

        let mut recorder = Recorder::with_order(VisitOrder::IN);
        run(&pool, &mut recorder, tree);
        let ins = recorder.events.iter().filter(|e| *e == "in aggregate").count();
        assert_eq!(ins, 2);
    }

    #[test]
    fn skip_leaves_out_children_and_post() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let tree = fx.build.block(&[fx.sum(1)]);

        let mut recorder = Recorder::with_order(VisitOrder::PRE | VisitOrder::POST);
        recorder.skip_blocks = true;
        run(&pool, &mut recorder, tree);
        assert_eq!(recorder.events, ["pre block"]);
    }

    /// Replaces every constant `0` with `1`.
    struct ZeroToOne;

    impl<'a> Visitor<'a> for ZeroToOne {
        fn visit_constant(
            &mut self,
            _node: NodeRef<'a>,
            constant: &'a ConstantNode<'a>,
            cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            if constant.values.iter().all(|value| value.is_zero()) {
                Action::replace(cx.build().int(1))
            } else {
                Action::Descend
            }
        }
    }

    #[test]
    fn immediate_leaf_replacement() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let sum = fx.sum(0);
        let tree = fx.build.block(&[sum]);

        let mut temporaries = Temporaries::new();
        let mut diagnostics = Diagnostics::new();
        let mut cx = TraverseCx::new(&pool, &mut temporaries, &mut diagnostics);
        traverse(&mut ZeroToOne, &mut cx, tree);

        assert_eq!(cx.immediate_replacements(), 1);
        assert!(!cx.has_pending_edits());
        let right = sum.as_binary().unwrap().right.get();
        assert_eq!(right.as_constant().unwrap().values[0].as_int(), Some(1));
    }

    /// Replaces every binary with a fresh copy and optionally walks it.
    struct CopyBinaries {
        visit_children: bool,
        constants: usize,
    }

    impl<'a> Visitor<'a> for CopyBinaries {
        fn visit_binary(
            &mut self,
            visit: Visit,
            node: NodeRef<'a>,
            _binary: &'a BinaryNode<'a>,
            cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            assert_eq!(visit, Visit::Pre);
            Action::Replace {
                node: cx.build().deep_copy(node),
                visit_children: self.visit_children,
            }
        }

        fn visit_constant(
            &mut self,
            _node: NodeRef<'a>,
            _constant: &'a ConstantNode<'a>,
            _cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.constants += 1;
            Action::Descend
        }
    }

    #[test]
    fn replacement_children_only_when_requested() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);

        for visit_children in [false, true] {
            let sum = fx.sum(2);
            let tree = fx.build.block(&[sum]);
            let mut visitor = CopyBinaries {
                visit_children,
                constants: 0,
            };
            run(&pool, &mut visitor, tree);

            let statement = tree.as_block().unwrap().statements.get()[0];
            assert!(!statement.is(sum));
            assert_eq!(visitor.constants, usize::from(visit_children));
        }
    }

    /// Queues `x + n` → `n` for every binary and checks the path on the way.
    struct QueueRight<'a> {
        root: Option<NodeRef<'a>>,
    }

    impl<'a> Visitor<'a> for QueueRight<'a> {
        fn visit_binary(
            &mut self,
            _visit: Visit,
            node: NodeRef<'a>,
            binary: &'a BinaryNode<'a>,
            cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            assert!(cx.parent().is_some_and(|parent| parent.as_block().is_some()));
            assert!(self.root.is_some_and(|root| cx.path()[0].is(root)));
            assert_eq!(cx.depth(), 1);
            cx.queue_replacement(node, binary.right.get());
            Action::Skip
        }
    }

    #[test]
    fn queued_replacements_apply_on_commit() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let tree = fx.build.block(&[fx.sum(4), fx.sum(5)]);

        let mut temporaries = Temporaries::new();
        let mut diagnostics = Diagnostics::new();
        let mut cx = TraverseCx::new(&pool, &mut temporaries, &mut diagnostics);
        traverse(&mut QueueRight { root: Some(tree) }, &mut cx, tree);

        let statements = tree.as_block().unwrap().statements.get();
        assert!(statements.iter().all(|s| s.as_binary().is_some()));
        assert!(cx.has_pending_edits());

        assert_eq!(cx.commit(), 2);
        assert!(!cx.has_pending_edits());
        let values: Vec<_> = tree
            .as_block()
            .unwrap()
            .statements
            .iter()
            .map(|s| s.as_constant().unwrap().values[0].as_int())
            .collect();
        assert_eq!(values, [Some(4), Some(5)]);
    }

    /// Inserts a temporary declaration before and a discard after the
    /// statement holding each constant.
    struct Surround;

    impl<'a> Visitor<'a> for Surround {
        fn visit_constant(
            &mut self,
            node: NodeRef<'a>,
            _constant: &'a ConstantNode<'a>,
            cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            let copy = cx.build().deep_copy(node);
            let (_, declaration) = cx.declare_temp(copy);
            let discard = cx.build().discard();
            assert!(cx.insert_statements_in_parent_block(&[declaration], &[discard]));
            Action::Descend
        }
    }

    #[test]
    fn insertion_around_enclosing_statement() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let sum = fx.sum(7);
        let tree = fx.build.block(&[sum]);

        let mut temporaries = Temporaries::new();
        let mut diagnostics = Diagnostics::new();
        let mut cx = TraverseCx::new(&pool, &mut temporaries, &mut diagnostics);
        traverse(&mut Surround, &mut cx, tree);
        assert_eq!(cx.commit(), 1);

        let kinds: Vec<_> = tree
            .as_block()
            .unwrap()
            .statements
            .iter()
            .map(|s| s.kind_name())
            .collect();
        assert_eq!(kinds, ["declaration", "binary", "branch"]);
        assert!(tree.as_block().unwrap().statements.get()[1].is(sum));
        assert_eq!(temporaries.count(), 1);
    }

    #[test]
    fn multi_replacement_splices_list() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let (a, b) = (fx.sum(1), fx.sum(2));
        let tree = fx.build.block(&[a, b]);

        let mut temporaries = Temporaries::new();
        let mut diagnostics = Diagnostics::new();
        let mut cx = TraverseCx::new(&pool, &mut temporaries, &mut diagnostics);
        let (c, d) = (fx.sum(3), fx.sum(4));
        cx.queue_multi_replacement(tree, a, &[c, d]);
        cx.queue_multi_replacement(tree, b, &[]);
        assert_eq!(cx.commit(), 2);

        let statements = tree.as_block().unwrap().statements.get();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].is(c));
        assert!(statements[1].is(d));
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn commit_panics_on_missing_target() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let tree = fx.build.block(&[fx.sum(1)]);
        let stranger = fx.sum(2);

        let mut temporaries = Temporaries::new();
        let mut diagnostics = Diagnostics::new();
        let mut cx = TraverseCx::new(&pool, &mut temporaries, &mut diagnostics);
        cx.queue_replacement_with_parent(tree, stranger, fx.build.int(0));
        cx.commit();
    }

    struct FunctionTracker<'a> {
        seen: Vec<Option<&'a str>>,
    }

    impl<'a> Visitor<'a> for FunctionTracker<'a> {
        fn visit_symbol(
            &mut self,
            _node: NodeRef<'a>,
            _symbol: &'a SymbolNode<'a>,
            cx: &mut TraverseCx<'_, 'a>,
        ) -> Action<'a> {
            self.seen.push(cx.current_function().map(|function| function.name));
            Action::Descend
        }
    }

    #[test]
    fn current_function_tracks_definitions() {
        let pool = PoolAllocator::default();
        let fx = Fixture::new(&pool);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let global = fx.build.declare(fx.x, None);
        let definition = fx.build.function(main, &[fx.sum(1)]);
        let unit = fx.build.translation_unit(&[global, definition]);

        let mut tracker = FunctionTracker { seen: Vec::new() };
        run(&pool, &mut tracker, unit.root());
        assert_eq!(tracker.seen, [None, Some("main")]);
    }

    #[test]
    fn synthesized_nodes_take_visited_span() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool).at(Span::new(3, 9, 1));
        let zero = build.int(0);
        let tree = NodeBuilder::new(&pool).block(&[zero]);

        run(&pool, &mut ZeroToOne, tree);
        let replaced = tree.as_block().unwrap().statements.get()[0];
        assert_eq!(replaced.span, Span::new(3, 9, 1));
    }
}
