//! Turn conditional evaluation inside expressions into `if` statements.
//!
//! ```text
//! x || y   →   bool t = x; if (!t) { t = y; }   ... t ...
//! x && y   →   bool t = x; if (t) { t = y; }    ... t ...
//! c ? a : b →  T t; if (c) { t = a; } else { t = b; }   ... t ...
//! ```
//!
//! `||` and `&&` are unfolded only when the right operand has side effects;
//! ternaries always are. The new statements go right before the statement
//! holding the expression, so an expression is only unfolded when that
//! statement sits in a block of a function body and no loop header lies in
//! between.

use glint_ast::traverse::{
    Action, SingleSiteRewrite, TraverseCx, Visit, Visitor, run_to_fixed_point,
};
use glint_ast::{BinaryNode, BinaryOp, NodeRef, TernaryNode};

use super::can_insert_before_statement;

#[derive(Default)]
struct UnfoldShortCircuit {
    found: bool,
}

/// Hoisting needs a function-local block; global initializers stay as
/// they are.
fn can_hoist(cx: &TraverseCx<'_, '_>) -> bool {
    cx.current_function().is_some() && can_insert_before_statement(cx)
}

impl<'a> Visitor<'a> for UnfoldShortCircuit {
    fn visit_binary(
        &mut self,
        _visit: Visit,
        node: NodeRef<'a>,
        binary: &'a BinaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        if self.found {
            return Action::Skip;
        }
        if !binary.op.is_short_circuit() {
            return Action::Descend;
        }
        let right = binary.right.get();
        if !right.has_side_effects() || !can_hoist(cx) {
            return Action::Descend;
        }

        let (result, declaration) = cx.declare_temp(binary.left.get());
        let build = cx.build();
        let condition = match binary.op {
            BinaryOp::LogicalOr => build.not(build.symbol(result)),
            _ => build.symbol(result),
        };
        let assign_right = build.assign(build.symbol(result), right);
        let branch = build.if_else(condition, &[assign_right], None);

        tracing::trace!(at = %node.span, op = %binary.op, "unfolding short circuit");
        cx.insert_statements_in_parent_block(&[declaration, branch], &[]);
        cx.queue_replacement(node, build.symbol(result));
        self.found = true;
        Action::Skip
    }

    fn visit_ternary(
        &mut self,
        _visit: Visit,
        node: NodeRef<'a>,
        ternary: &'a TernaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        if self.found {
            return Action::Skip;
        }
        if !can_hoist(cx) {
            return Action::Descend;
        }

        let (result, declaration) = cx.declare_uninitialized_temp(ternary.ty);
        let build = cx.build();
        let assign_true = build.assign(build.symbol(result), ternary.true_expr.get());
        let assign_false = build.assign(build.symbol(result), ternary.false_expr.get());
        let branch = build.if_else(ternary.condition.get(), &[assign_true], Some(&[assign_false]));

        tracing::trace!(at = %node.span, "unfolding ternary");
        cx.insert_statements_in_parent_block(&[declaration, branch], &[]);
        cx.queue_replacement(node, build.symbol(result));
        self.found = true;
        Action::Skip
    }
}

impl SingleSiteRewrite<'_> for UnfoldShortCircuit {
    fn found(&self) -> bool {
        self.found
    }

    fn reset(&mut self) {
        self.found = false;
    }
}

/// Unfold every eligible `||`, `&&` and `?:`. Returns the number of unfolded
/// expressions.
pub fn unfold_short_circuit_to_if<'a>(cx: &mut TraverseCx<'_, 'a>, root: NodeRef<'a>) -> usize {
    run_to_fixed_point(&mut UnfoldShortCircuit::default(), cx, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::Harness;
    use glint_ast::{Function, LoopKind, NodeBuilder, SymbolKind, Type, Variable, dump_tree};
    use glint_core::PoolAllocator;
    use pretty_assertions::assert_eq;

    fn bool_var<'a>(pool: &'a PoolAllocator, name: &str) -> &'a Variable<'a> {
        Variable::new_in(pool, name, Type::bool(), SymbolKind::UserDefined)
    }

    #[test]
    fn unfolds_or_with_side_effects() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let x = bool_var(&pool, "x");
        let r = bool_var(&pool, "r");
        let f = Function::new_in(&pool, "f", Type::bool(), &[], SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let or = build.binary(BinaryOp::LogicalOr, build.symbol(x), build.call(f, &[]), Type::bool());
        let unit = build.translation_unit(&[build.function(main, &[build.declare(r, Some(or))])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(unfold_short_circuit_to_if(&mut cx, unit.root()), 1);

        let expected = "\
Block
  Function main
    Prototype void main()
    Block
      Declaration
        Binary = (bool)
          Symbol '_t0' (bool)
          Symbol 'x' (bool)
      If
        Unary ! (bool)
          Symbol '_t0' (bool)
        Block
          Binary = (bool)
            Symbol '_t0' (bool)
            Call f (bool)
      Declaration
        Binary = (bool)
          Symbol 'r' (bool)
          Symbol '_t0' (bool)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
    }

    #[test]
    fn and_without_side_effects_is_kept() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let x = bool_var(&pool, "x");
        let y = bool_var(&pool, "y");
        let r = bool_var(&pool, "r");
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let and = build.binary(BinaryOp::LogicalAnd, build.symbol(x), build.symbol(y), Type::bool());
        let unit = build.translation_unit(&[build.function(main, &[build.declare(r, Some(and))])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(unfold_short_circuit_to_if(&mut cx, unit.root()), 0);
    }

    #[test]
    fn unfolds_ternary_into_if_else() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let c = bool_var(&pool, "c");
        let v = Variable::new_in(&pool, "v", Type::float(), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let ternary = build.ternary(build.symbol(c), build.float(1.0), build.float(2.0));
        let unit =
            build.translation_unit(&[build.function(main, &[build.assign(build.symbol(v), ternary)])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(unfold_short_circuit_to_if(&mut cx, unit.root()), 1);

        let expected = "\
Block
  Function main
    Prototype void main()
    Block
      Declaration
        Symbol '_t0' (float)
      If
        Symbol 'c' (bool)
        Block
          Binary = (float)
            Symbol '_t0' (float)
            Constant 1.0 (float)
        Block
          Binary = (float)
            Symbol '_t0' (float)
            Constant 2.0 (float)
      Binary = (float)
        Symbol 'v' (float)
        Symbol '_t0' (float)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
    }

    #[test]
    fn nested_ternaries_unfold_outside_in() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let a = bool_var(&pool, "a");
        let b = bool_var(&pool, "b");
        let v = Variable::new_in(&pool, "v", Type::int(), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let inner = build.ternary(build.symbol(b), build.int(1), build.int(2));
        let outer = build.ternary(build.symbol(a), inner, build.int(3));
        let unit =
            build.translation_unit(&[build.function(main, &[build.assign(build.symbol(v), outer)])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(unfold_short_circuit_to_if(&mut cx, unit.root()), 2);
        assert!(!dump_tree(&pool, unit.root()).contains("Ternary"));
    }

    #[test]
    fn loop_conditions_and_globals_are_left_alone() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let c = bool_var(&pool, "c");
        let g = Variable::new_in(&pool, "g", Type::int(), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let f = Function::new_in(&pool, "f", Type::bool(), &[], SymbolKind::UserDefined);

        let global = build.declare(g, Some(build.ternary(build.symbol(c), build.int(1), build.int(0))));
        let condition =
            build.binary(BinaryOp::LogicalAnd, build.symbol(c), build.call(f, &[]), Type::bool());
        let loop_node = build.loop_statement(LoopKind::While, None, Some(condition), None, &[]);
        let unit = build.translation_unit(&[global, build.function(main, &[loop_node])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(unfold_short_circuit_to_if(&mut cx, unit.root()), 0);
        assert_eq!(harness.temporaries.count(), 0);
    }
}
