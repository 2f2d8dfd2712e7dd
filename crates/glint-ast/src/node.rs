//! Tree nodes.
//!
//! Every node lives in the compilation's [`PoolAllocator`] and is referenced
//! as [`NodeRef`]. Child links are [`Cell`]s and child lists are
//! [`Sequence`]s, so an edit can re-point a parent at a replacement through a
//! shared reference. Node identity is address identity ([`Node::is`]).
//!
//! Nodes are never freed individually; replaced nodes simply become
//! unreachable until the pool is popped.

use std::cell::Cell;
use std::fmt;
use std::ptr;

use glint_core::{PoolAllocator, PoolVec, Span};

use crate::constant::ConstantValue;
use crate::ops::{BinaryOp, BranchOp, LoopKind, UnaryOp};
use crate::symbol::{Function, Variable};
use crate::types::Type;

/// Reference to a pool-allocated node.
pub type NodeRef<'a> = &'a Node<'a>;

/// A required child slot.
pub type Link<'a> = Cell<NodeRef<'a>>;

/// An optional child slot.
pub type OptLink<'a> = Cell<Option<NodeRef<'a>>>;

#[derive(Debug)]
pub struct Node<'a> {
    pub span: Span,
    pub kind: NodeKind<'a>,
}

/// The closed set of node kinds.
#[derive(Debug)]
pub enum NodeKind<'a> {
    /// Reference to a variable.
    Symbol(SymbolNode<'a>),
    /// Typed constant, one value per component.
    Constant(ConstantNode<'a>),
    Unary(UnaryNode<'a>),
    Binary(BinaryNode<'a>),
    /// Function call or constructor.
    Aggregate(AggregateNode<'a>),
    /// `c ? a : b`
    Ternary(TernaryNode<'a>),
    /// `if (c) { } else { }`
    IfElse(IfElseNode<'a>),
    Loop(LoopNode<'a>),
    /// `return`, `discard`, `break`, `continue`
    Branch(BranchNode<'a>),
    Declaration(DeclarationNode<'a>),
    Block(BlockNode<'a>),
    FunctionPrototype(PrototypeNode<'a>),
    FunctionDefinition(FunctionDefinitionNode<'a>),
}

#[derive(Debug)]
pub struct SymbolNode<'a> {
    pub variable: &'a Variable<'a>,
}

#[derive(Debug)]
pub struct ConstantNode<'a> {
    pub ty: Type<'a>,
    pub values: &'a [ConstantValue],
}

#[derive(Debug)]
pub struct UnaryNode<'a> {
    pub op: UnaryOp,
    pub operand: Link<'a>,
    pub ty: Type<'a>,
}

#[derive(Debug)]
pub struct BinaryNode<'a> {
    pub op: BinaryOp,
    pub left: Link<'a>,
    pub right: Link<'a>,
    pub ty: Type<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum AggregateOp<'a> {
    Call(&'a Function<'a>),
    /// Constructor of the aggregate's own type.
    Construct,
}

#[derive(Debug)]
pub struct AggregateNode<'a> {
    pub op: AggregateOp<'a>,
    pub args: Sequence<'a>,
    pub ty: Type<'a>,
}

impl<'a> AggregateNode<'a> {
    /// The called function, unless this is a constructor.
    pub fn function(&self) -> Option<&'a Function<'a>> {
        match self.op {
            AggregateOp::Call(function) => Some(function),
            AggregateOp::Construct => None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.op, AggregateOp::Construct)
    }
}

#[derive(Debug)]
pub struct TernaryNode<'a> {
    pub condition: Link<'a>,
    pub true_expr: Link<'a>,
    pub false_expr: Link<'a>,
    pub ty: Type<'a>,
}

#[derive(Debug)]
pub struct IfElseNode<'a> {
    pub condition: Link<'a>,
    pub then_block: Link<'a>,
    pub else_block: OptLink<'a>,
}

#[derive(Debug)]
pub struct LoopNode<'a> {
    pub kind: LoopKind,
    pub init: OptLink<'a>,
    pub condition: OptLink<'a>,
    pub expression: OptLink<'a>,
    pub body: Link<'a>,
}

#[derive(Debug)]
pub struct BranchNode<'a> {
    pub op: BranchOp,
    pub value: OptLink<'a>,
}

/// One or more declarators: symbols or `Initialize` binaries.
#[derive(Debug)]
pub struct DeclarationNode<'a> {
    pub declarators: Sequence<'a>,
}

#[derive(Debug)]
pub struct BlockNode<'a> {
    pub statements: Sequence<'a>,
}

#[derive(Debug)]
pub struct PrototypeNode<'a> {
    pub function: &'a Function<'a>,
}

#[derive(Debug)]
pub struct FunctionDefinitionNode<'a> {
    pub function: &'a Function<'a>,
    /// Always a [`NodeKind::FunctionPrototype`].
    pub prototype: Link<'a>,
    /// Always a [`NodeKind::Block`].
    pub body: Link<'a>,
}

impl<'a> FunctionDefinitionNode<'a> {
    pub fn body_block(&self) -> Option<&'a BlockNode<'a>> {
        self.body.get().as_block()
    }
}

// ============================================================================
// Sequence
// ============================================================================

/// An ordered child list (statements, declarators, arguments).
///
/// The list itself is an immutable pool slice; edits build a new slice and
/// swap it in.
pub struct Sequence<'a> {
    items: Cell<&'a [NodeRef<'a>]>,
}

impl<'a> Sequence<'a> {
    pub fn new(items: &'a [NodeRef<'a>]) -> Self {
        Self {
            items: Cell::new(items),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    #[inline]
    pub fn get(&self) -> &'a [NodeRef<'a>] {
        self.items.get()
    }

    #[inline]
    pub fn set(&self, items: &'a [NodeRef<'a>]) {
        self.items.set(items);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.get().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.get().iter().copied()
    }

    pub fn last(&self) -> Option<NodeRef<'a>> {
        self.get().last().copied()
    }

    /// Index of `node` by identity.
    pub fn position(&self, node: &Node<'a>) -> Option<usize> {
        self.get().iter().position(|item| ptr::eq(*item, node))
    }

    pub fn replace_at(&self, pool: &'a PoolAllocator, index: usize, node: NodeRef<'a>) {
        let items = self.get();
        let rebuilt = pool.alloc_slice_fill_iter(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| if i == index { node } else { *item }),
        );
        self.set(rebuilt);
    }

    /// Replace `original` with zero or more nodes. Returns `false` when
    /// `original` is not in the list.
    pub fn replace_with_many(
        &self,
        pool: &'a PoolAllocator,
        original: &Node<'a>,
        replacements: &[NodeRef<'a>],
    ) -> bool {
        let Some(index) = self.position(original) else {
            return false;
        };
        let items = self.get();
        let mut rebuilt = PoolVec::with_capacity_in(items.len() - 1 + replacements.len(), pool);
        rebuilt.extend_from_slice(&items[..index]);
        rebuilt.extend_from_slice(replacements);
        rebuilt.extend_from_slice(&items[index + 1..]);
        self.set(rebuilt.into_slice());
        true
    }

    /// Insert `before` and `after` around `anchor`. Returns `false` when
    /// `anchor` is not in the list.
    pub fn insert_around(
        &self,
        pool: &'a PoolAllocator,
        anchor: &Node<'a>,
        before: &[NodeRef<'a>],
        after: &[NodeRef<'a>],
    ) -> bool {
        let Some(index) = self.position(anchor) else {
            return false;
        };
        let items = self.get();
        let mut rebuilt = PoolVec::with_capacity_in(items.len() + before.len() + after.len(), pool);
        rebuilt.extend_from_slice(&items[..index]);
        rebuilt.extend_from_slice(before);
        rebuilt.push(items[index]);
        rebuilt.extend_from_slice(after);
        rebuilt.extend_from_slice(&items[index + 1..]);
        self.set(rebuilt.into_slice());
        true
    }

    pub fn push(&self, pool: &'a PoolAllocator, node: NodeRef<'a>) {
        let items = self.get();
        let mut rebuilt = PoolVec::with_capacity_in(items.len() + 1, pool);
        rebuilt.extend_from_slice(items);
        rebuilt.push(node);
        self.set(rebuilt.into_slice());
    }
}

impl fmt::Debug for Sequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.get()).finish()
    }
}

// ============================================================================
// Node queries
// ============================================================================

fn swap_link<'a>(link: &Link<'a>, original: &Node<'a>, replacement: NodeRef<'a>) -> bool {
    if ptr::eq(link.get(), original) {
        link.set(replacement);
        true
    } else {
        false
    }
}

fn swap_opt_link<'a>(link: &OptLink<'a>, original: &Node<'a>, replacement: NodeRef<'a>) -> bool {
    match link.get() {
        Some(child) if ptr::eq(child, original) => {
            link.set(Some(replacement));
            true
        }
        _ => false,
    }
}

fn swap_in_sequence<'a>(
    pool: &'a PoolAllocator,
    sequence: &Sequence<'a>,
    original: &Node<'a>,
    replacement: NodeRef<'a>,
) -> bool {
    match sequence.position(original) {
        Some(index) => {
            sequence.replace_at(pool, index, replacement);
            true
        }
        None => false,
    }
}

impl<'a> Node<'a> {
    /// Identity comparison.
    #[inline]
    pub fn is(&self, other: &Node<'a>) -> bool {
        ptr::eq(self, other)
    }

    /// The type of an expression node.
    pub fn ty(&self) -> Option<Type<'a>> {
        match &self.kind {
            NodeKind::Symbol(symbol) => Some(symbol.variable.ty),
            NodeKind::Constant(constant) => Some(constant.ty),
            NodeKind::Unary(unary) => Some(unary.ty),
            NodeKind::Binary(binary) => Some(binary.ty),
            NodeKind::Aggregate(aggregate) => Some(aggregate.ty),
            NodeKind::Ternary(ternary) => Some(ternary.ty),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Symbol(_) => "symbol",
            NodeKind::Constant(_) => "constant",
            NodeKind::Unary(_) => "unary",
            NodeKind::Binary(_) => "binary",
            NodeKind::Aggregate(_) => "aggregate",
            NodeKind::Ternary(_) => "ternary",
            NodeKind::IfElse(_) => "if-else",
            NodeKind::Loop(_) => "loop",
            NodeKind::Branch(_) => "branch",
            NodeKind::Declaration(_) => "declaration",
            NodeKind::Block(_) => "block",
            NodeKind::FunctionPrototype(_) => "function prototype",
            NodeKind::FunctionDefinition(_) => "function definition",
        }
    }

    /// Nodes without child slots.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Symbol(_) | NodeKind::Constant(_) | NodeKind::FunctionPrototype(_)
        )
    }

    pub fn is_expression(&self) -> bool {
        self.ty().is_some()
    }

    pub fn as_symbol(&self) -> Option<&SymbolNode<'a>> {
        match &self.kind {
            NodeKind::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantNode<'a>> {
        match &self.kind {
            NodeKind::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryNode<'a>> {
        match &self.kind {
            NodeKind::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregateNode<'a>> {
        match &self.kind {
            NodeKind::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BranchNode<'a>> {
        match &self.kind {
            NodeKind::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    pub fn as_declaration(&self) -> Option<&DeclarationNode<'a>> {
        match &self.kind {
            NodeKind::Declaration(declaration) => Some(declaration),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockNode<'a>> {
        match &self.kind {
            NodeKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_if_else(&self) -> Option<&IfElseNode<'a>> {
        match &self.kind {
            NodeKind::IfElse(if_else) => Some(if_else),
            _ => None,
        }
    }

    pub fn as_function_definition(&self) -> Option<&FunctionDefinitionNode<'a>> {
        match &self.kind {
            NodeKind::FunctionDefinition(definition) => Some(definition),
            _ => None,
        }
    }

    /// Whether evaluating the node can write memory or call user code.
    ///
    /// Calls to user-defined functions always count; built-in calls and
    /// constructors only through their arguments. Statements count as having
    /// side effects.
    pub fn has_side_effects(&self) -> bool {
        match &self.kind {
            NodeKind::Symbol(_) | NodeKind::Constant(_) => false,
            NodeKind::Unary(unary) => {
                unary.op.writes_operand() || unary.operand.get().has_side_effects()
            }
            NodeKind::Binary(binary) => {
                binary.op.is_assignment()
                    || binary.left.get().has_side_effects()
                    || binary.right.get().has_side_effects()
            }
            NodeKind::Aggregate(aggregate) => {
                let user_call = aggregate
                    .function()
                    .is_some_and(|function| !function.is_builtin());
                user_call || aggregate.args.iter().any(|arg| arg.has_side_effects())
            }
            NodeKind::Ternary(ternary) => {
                ternary.condition.get().has_side_effects()
                    || ternary.true_expr.get().has_side_effects()
                    || ternary.false_expr.get().has_side_effects()
            }
            _ => true,
        }
    }

    /// Direct children in traversal order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match &self.kind {
            NodeKind::Symbol(_) | NodeKind::Constant(_) | NodeKind::FunctionPrototype(_) => {
                Vec::new()
            }
            NodeKind::Unary(unary) => vec![unary.operand.get()],
            NodeKind::Binary(binary) => vec![binary.left.get(), binary.right.get()],
            NodeKind::Aggregate(aggregate) => aggregate.args.get().to_vec(),
            NodeKind::Ternary(ternary) => vec![
                ternary.condition.get(),
                ternary.true_expr.get(),
                ternary.false_expr.get(),
            ],
            NodeKind::IfElse(if_else) => {
                let mut children = vec![if_else.condition.get(), if_else.then_block.get()];
                children.extend(if_else.else_block.get());
                children
            }
            NodeKind::Loop(node) => {
                let mut children = Vec::with_capacity(4);
                children.extend(node.init.get());
                children.extend(node.condition.get());
                children.extend(node.expression.get());
                children.push(node.body.get());
                children
            }
            NodeKind::Branch(branch) => branch.value.get().into_iter().collect(),
            NodeKind::Declaration(declaration) => declaration.declarators.get().to_vec(),
            NodeKind::Block(block) => block.statements.get().to_vec(),
            NodeKind::FunctionDefinition(definition) => {
                vec![definition.prototype.get(), definition.body.get()]
            }
        }
    }

    /// Re-point the slot holding `original` at `replacement`.
    ///
    /// Returns `false` when `original` is not a direct child.
    pub fn replace_child(
        &self,
        pool: &'a PoolAllocator,
        original: &Node<'a>,
        replacement: NodeRef<'a>,
    ) -> bool {
        match &self.kind {
            NodeKind::Symbol(_) | NodeKind::Constant(_) | NodeKind::FunctionPrototype(_) => false,
            NodeKind::Unary(unary) => swap_link(&unary.operand, original, replacement),
            NodeKind::Binary(binary) => {
                swap_link(&binary.left, original, replacement)
                    || swap_link(&binary.right, original, replacement)
            }
            NodeKind::Aggregate(aggregate) => {
                swap_in_sequence(pool, &aggregate.args, original, replacement)
            }
            NodeKind::Ternary(ternary) => {
                swap_link(&ternary.condition, original, replacement)
                    || swap_link(&ternary.true_expr, original, replacement)
                    || swap_link(&ternary.false_expr, original, replacement)
            }
            NodeKind::IfElse(if_else) => {
                swap_link(&if_else.condition, original, replacement)
                    || swap_link(&if_else.then_block, original, replacement)
                    || swap_opt_link(&if_else.else_block, original, replacement)
            }
            NodeKind::Loop(node) => {
                swap_opt_link(&node.init, original, replacement)
                    || swap_opt_link(&node.condition, original, replacement)
                    || swap_opt_link(&node.expression, original, replacement)
                    || swap_link(&node.body, original, replacement)
            }
            NodeKind::Branch(branch) => swap_opt_link(&branch.value, original, replacement),
            NodeKind::Declaration(declaration) => {
                swap_in_sequence(pool, &declaration.declarators, original, replacement)
            }
            NodeKind::Block(block) => {
                swap_in_sequence(pool, &block.statements, original, replacement)
            }
            NodeKind::FunctionDefinition(definition) => {
                swap_link(&definition.prototype, original, replacement)
                    || swap_link(&definition.body, original, replacement)
            }
        }
    }

    /// The child list that statement-level edits target.
    pub fn statement_list(&self) -> Option<&Sequence<'a>> {
        self.as_block().map(|block| &block.statements)
    }
}

// ============================================================================
// TranslationUnit
// ============================================================================

/// The root of a shader: a block of global declarations and functions.
#[derive(Debug, Clone, Copy)]
pub struct TranslationUnit<'a> {
    root: NodeRef<'a>,
}

impl<'a> TranslationUnit<'a> {
    /// Wrap a root block.
    ///
    /// # Panics
    ///
    /// Panics if `root` is not a block.
    pub fn new(root: NodeRef<'a>) -> Self {
        assert!(
            root.as_block().is_some(),
            "translation unit root must be a block, found {}",
            root.kind_name()
        );
        Self { root }
    }

    #[inline]
    pub fn root(&self) -> NodeRef<'a> {
        self.root
    }

    /// Top-level declarations and functions.
    pub fn items(&self) -> &'a [NodeRef<'a>] {
        match &self.root.kind {
            NodeKind::Block(block) => block.statements.get(),
            _ => &[],
        }
    }

    /// Function definitions in source order.
    pub fn function_definitions(
        &self,
    ) -> impl Iterator<Item = &'a FunctionDefinitionNode<'a>> + 'a {
        self.items()
            .iter()
            .copied()
            .filter_map(|item| item.as_function_definition())
    }

    /// The definition of the function with the given plain name.
    pub fn find_function(&self, name: &str) -> Option<&'a FunctionDefinitionNode<'a>> {
        self.function_definitions()
            .find(|definition| definition.function.name == name)
    }
}
