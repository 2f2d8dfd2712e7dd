//! Flatten mixed vector/matrix constructor arguments into scalars.
//!
//! Some drivers mishandle `vec4(m2)` or `mat2(v2, v2)`. This pass rewrites
//!
//! - a vector constructor with a matrix argument, and
//! - a matrix constructor with a vector argument
//!
//! so that each such argument becomes its individual components, `v[i]` or
//! `m[c][r]` in column-major order. Only as many components as the
//! constructed type still needs are taken. An argument that is not a plain
//! variable is first copied into a temporary declared before the enclosing
//! statement, so it is evaluated once.

use glint_ast::traverse::{
    Action, SingleSiteRewrite, TraverseCx, Visit, Visitor, run_to_fixed_point,
};
use glint_ast::{AggregateNode, NodeBuilder, NodeRef, Type};

use super::can_insert_before_statement;

#[derive(Default)]
struct ScalarizeConstructorArgs {
    found: bool,
}

/// Which argument shapes a constructor of `ty` needs flattened.
fn flatten_rule(ty: Type<'_>, args: &[NodeRef<'_>]) -> Option<Flatten> {
    let rule = if ty.is_vector() {
        Flatten::Matrices
    } else if ty.is_matrix() {
        Flatten::Vectors
    } else {
        return None;
    };
    args.iter()
        .any(|&arg| rule.applies_to(arg))
        .then_some(rule)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flatten {
    Vectors,
    Matrices,
}

impl Flatten {
    fn applies_to(self, arg: NodeRef<'_>) -> bool {
        arg.ty().is_some_and(|ty| match self {
            Flatten::Vectors => ty.is_vector(),
            Flatten::Matrices => ty.is_matrix(),
        })
    }
}

/// Index expressions for the first `take` components of `base`.
fn components<'a>(
    build: NodeBuilder<'a>,
    base: &dyn Fn() -> NodeRef<'a>,
    ty: Type<'a>,
    take: u64,
) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    if ty.is_matrix() {
        'columns: for col in 0..i32::from(ty.cols()) {
            for row in 0..i32::from(ty.rows()) {
                if out.len() as u64 == take {
                    break 'columns;
                }
                out.push(build.index(build.index(base(), col), row));
            }
        }
    } else {
        for i in 0..i32::from(ty.primary_size) {
            if out.len() as u64 == take {
                break;
            }
            out.push(build.index(base(), i));
        }
    }
    out
}

impl<'a> Visitor<'a> for ScalarizeConstructorArgs {
    fn visit_aggregate(
        &mut self,
        _visit: Visit,
        node: NodeRef<'a>,
        aggregate: &'a AggregateNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        if self.found {
            return Action::Skip;
        }
        if !aggregate.is_constructor() {
            return Action::Descend;
        }
        let args = aggregate.args.get();
        let Some(rule) = flatten_rule(aggregate.ty, args) else {
            return Action::Descend;
        };
        let needs_copies = args
            .iter()
            .any(|&arg| rule.applies_to(arg) && arg.as_symbol().is_none());
        if needs_copies && !can_insert_before_statement(cx) {
            return Action::Descend;
        }

        let build = cx.build();
        let mut remaining = aggregate.ty.component_count();
        let mut new_args = Vec::with_capacity(remaining as usize);
        let mut temporaries = Vec::new();

        for &arg in args {
            let ty = arg.ty().unwrap_or_else(Type::void);
            if !rule.applies_to(arg) {
                new_args.push(arg);
                remaining = remaining.saturating_sub(ty.component_count());
                continue;
            }

            let take = remaining.min(ty.component_count());
            remaining -= take;
            let flattened = match arg.as_symbol() {
                Some(symbol) => {
                    let variable = symbol.variable;
                    components(build, &|| build.symbol(variable), ty, take)
                }
                None => {
                    let (variable, declaration) = cx.declare_temp(arg);
                    temporaries.push(declaration);
                    components(build, &|| build.symbol(variable), ty, take)
                }
            };
            new_args.extend(flattened);
        }

        if !temporaries.is_empty() {
            cx.insert_statements_in_parent_block(&temporaries, &[]);
        }

        tracing::trace!(at = %node.span, ty = %aggregate.ty, "scalarizing constructor arguments");
        cx.queue_replacement(node, build.construct(aggregate.ty, &new_args));
        self.found = true;
        Action::Skip
    }
}

impl SingleSiteRewrite<'_> for ScalarizeConstructorArgs {
    fn found(&self) -> bool {
        self.found
    }

    fn reset(&mut self) {
        self.found = false;
    }
}

/// Scalarize every eligible constructor. Returns the number of rewritten
/// constructors.
pub fn scalarize_constructor_args<'a>(cx: &mut TraverseCx<'_, 'a>, root: NodeRef<'a>) -> usize {
    run_to_fixed_point(&mut ScalarizeConstructorArgs::default(), cx, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::Harness;
    use glint_ast::{BasicType, Function, SymbolKind, Variable, dump_tree};
    use glint_core::PoolAllocator;
    use pretty_assertions::assert_eq;

    #[test]
    fn vector_from_matrix_takes_needed_components() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let m = Variable::new_in(&pool, "m", Type::mat(2, 2), SymbolKind::UserDefined);
        let v = Variable::new_in(&pool, "v", Type::vec(BasicType::Float, 3), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let constructor = build.construct(Type::vec(BasicType::Float, 3), &[build.symbol(m)]);
        let unit = build.translation_unit(&[build.function(main, &[build.declare(v, Some(constructor))])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(scalarize_constructor_args(&mut cx, unit.root()), 1);

        let expected = "\
Block
  Function main
    Prototype void main()
    Block
      Declaration
        Binary = (vec3)
          Symbol 'v' (vec3)
          Construct vec3
            Binary [] (float)
              Binary [] (vec2)
                Symbol 'm' (mat2)
                Constant 0 (int)
              Constant 0 (int)
            Binary [] (float)
              Binary [] (vec2)
                Symbol 'm' (mat2)
                Constant 0 (int)
              Constant 1 (int)
            Binary [] (float)
              Binary [] (vec2)
                Symbol 'm' (mat2)
                Constant 1 (int)
              Constant 0 (int)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
        assert_eq!(harness.temporaries.count(), 0);
    }

    #[test]
    fn matrix_from_vectors_copies_expressions_once() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let vec2 = Type::vec(BasicType::Float, 2);
        let a = Variable::new_in(&pool, "a", vec2, SymbolKind::UserDefined);
        let f = Function::new_in(&pool, "f", vec2, &[], SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let constructor = build.construct(Type::mat(2, 2), &[build.symbol(a), build.call(f, &[])]);
        let unit = build.translation_unit(&[build.function(main, &[constructor])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(scalarize_constructor_args(&mut cx, unit.root()), 1);

        let expected = "\
Block
  Function main
    Prototype void main()
    Block
      Declaration
        Binary = (vec2)
          Symbol '_t0' (vec2)
          Call f (vec2)
      Construct mat2
        Binary [] (float)
          Symbol 'a' (vec2)
          Constant 0 (int)
        Binary [] (float)
          Symbol 'a' (vec2)
          Constant 1 (int)
        Binary [] (float)
          Symbol '_t0' (vec2)
          Constant 0 (int)
        Binary [] (float)
          Symbol '_t0' (vec2)
          Constant 1 (int)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
    }

    #[test]
    fn plain_constructors_are_untouched() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let vec2 = Type::vec(BasicType::Float, 2);
        let a = Variable::new_in(&pool, "a", vec2, SymbolKind::UserDefined);
        let m = Variable::new_in(&pool, "m", Type::mat(3, 3), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let body = [
            build.construct(Type::vec(BasicType::Float, 4), &[build.symbol(a), build.symbol(a)]),
            build.construct(Type::mat(2, 2), &[build.symbol(m)]),
            build.construct(Type::mat(2, 2), &[build.float(1.0)]),
        ];
        let unit = build.translation_unit(&[build.function(main, &body)]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(scalarize_constructor_args(&mut cx, unit.root()), 0);
    }

    #[test]
    fn mixed_arguments_keep_their_order() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let m = Variable::new_in(&pool, "m", Type::mat(2, 2), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let constructor =
            build.construct(Type::vec(BasicType::Float, 4), &[build.float(1.0), build.symbol(m)]);
        let unit = build.translation_unit(&[build.function(main, &[constructor])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        scalarize_constructor_args(&mut cx, unit.root());

        let body = unit.find_function("main").unwrap().body_block().unwrap();
        let args: Vec<_> = body.statements.get()[0].as_aggregate().unwrap().args.iter().collect();
        assert_eq!(args.len(), 4);
        assert!(args[0].as_constant().is_some());
        assert!(args[1..].iter().all(|arg| arg.as_binary().is_some()));
    }
}
