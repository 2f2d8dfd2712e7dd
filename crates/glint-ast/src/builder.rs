//! Node construction helpers.
//!
//! [`NodeBuilder`] is the only way nodes get created: by the parser for the
//! initial tree and by passes for synthesized code. It is a `Copy` handle on
//! the pool plus the span new nodes are stamped with.

use std::cell::Cell;

use glint_core::{PoolAllocator, Span};

use crate::constant::ConstantValue;
use crate::node::*;
use crate::ops::{BinaryOp, BranchOp, LoopKind, UnaryOp};
use crate::symbol::{Function, Variable};
use crate::types::{BasicType, Qualifier, Type};

#[derive(Debug, Clone, Copy)]
pub struct NodeBuilder<'a> {
    pool: &'a PoolAllocator,
    span: Span,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(pool: &'a PoolAllocator) -> Self {
        Self {
            pool,
            span: Span::synthetic(),
        }
    }

    /// A builder whose nodes carry `span`.
    pub fn at(self, span: Span) -> Self {
        Self { span, ..self }
    }

    #[inline]
    pub fn pool(&self) -> &'a PoolAllocator {
        self.pool
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn node(&self, kind: NodeKind<'a>) -> NodeRef<'a> {
        self.pool.alloc(Node {
            span: self.span,
            kind,
        })
    }

    fn sequence(&self, items: &[NodeRef<'a>]) -> Sequence<'a> {
        Sequence::new(self.pool.alloc_slice_copy(items))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn symbol(&self, variable: &'a Variable<'a>) -> NodeRef<'a> {
        self.node(NodeKind::Symbol(SymbolNode { variable }))
    }

    pub fn constant(&self, ty: Type<'a>, values: &[ConstantValue]) -> NodeRef<'a> {
        let values = self.pool.alloc_slice_copy(values);
        self.node(NodeKind::Constant(ConstantNode {
            ty: ty.with_qualifier(Qualifier::Const),
            values,
        }))
    }

    pub fn float(&self, value: f32) -> NodeRef<'a> {
        self.constant(Type::float(), &[ConstantValue::float(value)])
    }

    pub fn int(&self, value: i32) -> NodeRef<'a> {
        self.constant(Type::int(), &[ConstantValue::Int(value)])
    }

    pub fn uint(&self, value: u32) -> NodeRef<'a> {
        self.constant(Type::uint(), &[ConstantValue::UInt(value)])
    }

    pub fn bool(&self, value: bool) -> NodeRef<'a> {
        self.constant(Type::bool(), &[ConstantValue::Bool(value)])
    }

    pub fn unary(&self, op: UnaryOp, operand: NodeRef<'a>, ty: Type<'a>) -> NodeRef<'a> {
        self.node(NodeKind::Unary(UnaryNode {
            op,
            operand: Cell::new(operand),
            ty,
        }))
    }

    /// `!operand`
    pub fn not(&self, operand: NodeRef<'a>) -> NodeRef<'a> {
        self.unary(UnaryOp::LogicalNot, operand, Type::bool())
    }

    pub fn binary(
        &self,
        op: BinaryOp,
        left: NodeRef<'a>,
        right: NodeRef<'a>,
        ty: Type<'a>,
    ) -> NodeRef<'a> {
        self.node(NodeKind::Binary(BinaryNode {
            op,
            left: Cell::new(left),
            right: Cell::new(right),
            ty,
        }))
    }

    /// `left = right`, typed as `left`.
    pub fn assign(&self, left: NodeRef<'a>, right: NodeRef<'a>) -> NodeRef<'a> {
        let ty = left.ty().unwrap_or_else(Type::void).as_temporary();
        self.binary(BinaryOp::Assign, left, right, ty)
    }

    /// `base[index]` with a constant index.
    ///
    /// Vectors yield a scalar, matrices a column, arrays an element.
    pub fn index(&self, base: NodeRef<'a>, index: i32) -> NodeRef<'a> {
        let base_ty = base.ty().unwrap_or_else(Type::void);
        let ty = if base_ty.is_array() {
            base_ty.element_type()
        } else if base_ty.is_matrix() {
            base_ty.column_type()
        } else {
            base_ty.scalar_type()
        };
        let index = self.int(index);
        self.binary(BinaryOp::IndexDirect, base, index, ty.as_temporary())
    }

    pub fn call(&self, function: &'a Function<'a>, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Aggregate(AggregateNode {
            op: AggregateOp::Call(function),
            args: self.sequence(args),
            ty: function.return_type.as_temporary(),
        }))
    }

    pub fn construct(&self, ty: Type<'a>, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Aggregate(AggregateNode {
            op: AggregateOp::Construct,
            args: self.sequence(args),
            ty: ty.as_temporary(),
        }))
    }

    pub fn ternary(
        &self,
        condition: NodeRef<'a>,
        true_expr: NodeRef<'a>,
        false_expr: NodeRef<'a>,
    ) -> NodeRef<'a> {
        let ty = true_expr.ty().unwrap_or_else(Type::void).as_temporary();
        self.node(NodeKind::Ternary(TernaryNode {
            condition: Cell::new(condition),
            true_expr: Cell::new(true_expr),
            false_expr: Cell::new(false_expr),
            ty,
        }))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn block(&self, statements: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Block(BlockNode {
            statements: self.sequence(statements),
        }))
    }

    /// `if (condition) { then } else { otherwise }`. The branches are wrapped
    /// in blocks.
    pub fn if_else(
        &self,
        condition: NodeRef<'a>,
        then: &[NodeRef<'a>],
        otherwise: Option<&[NodeRef<'a>]>,
    ) -> NodeRef<'a> {
        let then_block = self.block(then);
        let else_block = otherwise.map(|statements| self.block(statements));
        self.node(NodeKind::IfElse(IfElseNode {
            condition: Cell::new(condition),
            then_block: Cell::new(then_block),
            else_block: Cell::new(else_block),
        }))
    }

    pub fn loop_statement(
        &self,
        kind: LoopKind,
        init: Option<NodeRef<'a>>,
        condition: Option<NodeRef<'a>>,
        expression: Option<NodeRef<'a>>,
        body: &[NodeRef<'a>],
    ) -> NodeRef<'a> {
        let body = self.block(body);
        self.node(NodeKind::Loop(LoopNode {
            kind,
            init: Cell::new(init),
            condition: Cell::new(condition),
            expression: Cell::new(expression),
            body: Cell::new(body),
        }))
    }

    pub fn branch(&self, op: BranchOp, value: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Branch(BranchNode {
            op,
            value: Cell::new(value),
        }))
    }

    pub fn ret(&self, value: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.branch(BranchOp::Return, value)
    }

    pub fn discard(&self) -> NodeRef<'a> {
        self.branch(BranchOp::Discard, None)
    }

    pub fn declaration(&self, declarators: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Declaration(DeclarationNode {
            declarators: self.sequence(declarators),
        }))
    }

    /// The declarator for `variable`, with `= init` when given.
    pub fn declarator(&self, variable: &'a Variable<'a>, init: Option<NodeRef<'a>>) -> NodeRef<'a> {
        let symbol = self.symbol(variable);
        match init {
            Some(init) => {
                self.binary(BinaryOp::Initialize, symbol, init, variable.ty.as_temporary())
            }
            None => symbol,
        }
    }

    /// `T variable = init;` as a single-declarator declaration.
    pub fn declare(&self, variable: &'a Variable<'a>, init: Option<NodeRef<'a>>) -> NodeRef<'a> {
        let declarator = self.declarator(variable, init);
        self.declaration(&[declarator])
    }

    pub fn prototype(&self, function: &'a Function<'a>) -> NodeRef<'a> {
        self.node(NodeKind::FunctionPrototype(PrototypeNode { function }))
    }

    pub fn function(&self, function: &'a Function<'a>, body: &[NodeRef<'a>]) -> NodeRef<'a> {
        let prototype = self.prototype(function);
        let body = self.block(body);
        self.node(NodeKind::FunctionDefinition(FunctionDefinitionNode {
            function,
            prototype: Cell::new(prototype),
            body: Cell::new(body),
        }))
    }

    /// A translation unit over the given top-level items.
    pub fn translation_unit(&self, items: &[NodeRef<'a>]) -> TranslationUnit<'a> {
        TranslationUnit::new(self.block(items))
    }

    // ========================================================================
    // Derived nodes
    // ========================================================================

    /// The zero value of `ty`.
    ///
    /// Scalars become a constant; vectors and matrices a constructor with one
    /// zero per component; arrays a constructor with one zero element per
    /// entry; structures a constructor with one zero per field.
    pub fn zero(&self, ty: Type<'a>) -> NodeRef<'a> {
        if ty.is_array() {
            let element = ty.element_type();
            let count = ty.outermost_array_size().unwrap_or(0);
            let args: Vec<_> = (0..count).map(|_| self.zero(element)).collect();
            return self.construct(ty, &args);
        }

        if let (BasicType::Struct, Some(structure)) = (ty.basic, ty.structure) {
            let args: Vec<_> = structure
                .fields
                .iter()
                .map(|field| self.zero(field.ty))
                .collect();
            return self.construct(ty, &args);
        }

        let scalar = ty.scalar_type();
        let zero = ConstantValue::zero(ty.basic);
        if ty.is_vector() || ty.is_matrix() {
            let args: Vec<_> = (0..ty.component_count())
                .map(|_| self.constant(scalar, &[zero]))
                .collect();
            return self.construct(ty, &args);
        }

        self.constant(scalar, &[zero])
    }

    /// Recursively copy a subtree. Symbols, functions and constant values are
    /// shared; every node is new and keeps its original span.
    pub fn deep_copy(&self, node: NodeRef<'a>) -> NodeRef<'a> {
        let builder = self.at(node.span);
        let copy = |child: NodeRef<'a>| self.deep_copy(child);
        let copy_opt = |child: Option<NodeRef<'a>>| child.map(|child| self.deep_copy(child));
        let copy_all = |items: &Sequence<'a>| {
            let copies: Vec<_> = items.iter().map(|item| self.deep_copy(item)).collect();
            self.sequence(&copies)
        };

        let kind = match &node.kind {
            NodeKind::Symbol(symbol) => NodeKind::Symbol(SymbolNode {
                variable: symbol.variable,
            }),
            NodeKind::Constant(constant) => NodeKind::Constant(ConstantNode {
                ty: constant.ty,
                values: constant.values,
            }),
            NodeKind::Unary(unary) => NodeKind::Unary(UnaryNode {
                op: unary.op,
                operand: Cell::new(copy(unary.operand.get())),
                ty: unary.ty,
            }),
            NodeKind::Binary(binary) => NodeKind::Binary(BinaryNode {
                op: binary.op,
                left: Cell::new(copy(binary.left.get())),
                right: Cell::new(copy(binary.right.get())),
                ty: binary.ty,
            }),
            NodeKind::Aggregate(aggregate) => NodeKind::Aggregate(AggregateNode {
                op: aggregate.op,
                args: copy_all(&aggregate.args),
                ty: aggregate.ty,
            }),
            NodeKind::Ternary(ternary) => NodeKind::Ternary(TernaryNode {
                condition: Cell::new(copy(ternary.condition.get())),
                true_expr: Cell::new(copy(ternary.true_expr.get())),
                false_expr: Cell::new(copy(ternary.false_expr.get())),
                ty: ternary.ty,
            }),
            NodeKind::IfElse(if_else) => NodeKind::IfElse(IfElseNode {
                condition: Cell::new(copy(if_else.condition.get())),
                then_block: Cell::new(copy(if_else.then_block.get())),
                else_block: Cell::new(copy_opt(if_else.else_block.get())),
            }),
            NodeKind::Loop(node) => NodeKind::Loop(LoopNode {
                kind: node.kind,
                init: Cell::new(copy_opt(node.init.get())),
                condition: Cell::new(copy_opt(node.condition.get())),
                expression: Cell::new(copy_opt(node.expression.get())),
                body: Cell::new(copy(node.body.get())),
            }),
            NodeKind::Branch(branch) => NodeKind::Branch(BranchNode {
                op: branch.op,
                value: Cell::new(copy_opt(branch.value.get())),
            }),
            NodeKind::Declaration(declaration) => NodeKind::Declaration(DeclarationNode {
                declarators: copy_all(&declaration.declarators),
            }),
            NodeKind::Block(block) => NodeKind::Block(BlockNode {
                statements: copy_all(&block.statements),
            }),
            NodeKind::FunctionPrototype(prototype) => NodeKind::FunctionPrototype(PrototypeNode {
                function: prototype.function,
            }),
            NodeKind::FunctionDefinition(definition) => {
                NodeKind::FunctionDefinition(FunctionDefinitionNode {
                    function: definition.function,
                    prototype: Cell::new(copy(definition.prototype.get())),
                    body: Cell::new(copy(definition.body.get())),
                })
            }
        };
        builder.node(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;
    use crate::types::{Field, StructType};

    fn constructor_args<'a>(node: NodeRef<'a>) -> &'a [NodeRef<'a>] {
        node.as_aggregate()
            .filter(|aggregate| aggregate.is_constructor())
            .map(|aggregate| aggregate.args.get())
            .unwrap_or(&[])
    }

    #[test]
    fn zero_scalar_is_constant() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let zero = build.zero(Type::int());
        let constant = zero.as_constant().unwrap();
        assert_eq!(constant.values, &[ConstantValue::Int(0)]);
        assert_eq!(constant.ty.basic, BasicType::Int);
    }

    #[test]
    fn zero_vector_has_one_scalar_per_component() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let zero = build.zero(Type::vec(BasicType::Float, 3));
        assert_eq!(zero.ty(), Some(Type::vec(BasicType::Float, 3)));
        let args = constructor_args(zero);
        assert_eq!(args.len(), 3);
        assert!(args.iter().all(|arg| arg.as_constant().is_some_and(|c| c.values[0].is_zero())));
    }

    #[test]
    fn zero_array_of_three_floats() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let zero = build.zero(Type::float().with_array_sizes(&[3]));
        let args = constructor_args(zero);
        assert_eq!(args.len(), 3);
        for arg in args {
            assert_eq!(arg.as_constant().unwrap().values, &[ConstantValue::float(0.0)]);
        }
    }

    #[test]
    fn zero_struct_recurses_into_fields() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let fields = [
            Field { name: "m", ty: Type::mat(2, 2) },
            Field { name: "flag", ty: Type::bool() },
        ];
        let structure = StructType { name: "S", fields: &fields };
        let zero = build.zero(Type::structure(&structure));

        let args = constructor_args(zero);
        assert_eq!(args.len(), 2);
        assert_eq!(constructor_args(args[0]).len(), 4);
        assert_eq!(args[1].as_constant().unwrap().values, &[ConstantValue::Bool(false)]);
    }

    #[test]
    fn index_result_types() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let m = Variable::new_in(&pool, "m", Type::mat(3, 2), SymbolKind::UserDefined);
        let column = build.index(build.symbol(m), 1);
        assert_eq!(column.ty(), Some(Type::vec(BasicType::Float, 2)));
        let component = build.index(column, 0);
        assert_eq!(component.ty(), Some(Type::float()));
    }

    #[test]
    fn deep_copy_is_structurally_equal_but_distinct() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let x = Variable::new_in(&pool, "x", Type::int(), SymbolKind::UserDefined);
        let sum = build.binary(BinaryOp::Add, build.symbol(x), build.int(1), Type::int());

        let copy = build.deep_copy(sum);
        assert!(!copy.is(sum));
        let (original, copied) = (sum.as_binary().unwrap(), copy.as_binary().unwrap());
        assert!(!copied.left.get().is(original.left.get()));
        assert_eq!(
            copied.left.get().as_symbol().unwrap().variable.id,
            x.id
        );
        assert_eq!(copy.span, sum.span);
    }

    #[test]
    fn builder_stamps_span() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool).at(Span::new(4, 2, 1));
        assert_eq!(build.int(3).span, Span::new(4, 2, 1));
    }
}
