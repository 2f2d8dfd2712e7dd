//! Indented text rendering of a tree, for debugging and tests.

use std::fmt::Write;

use glint_core::{Diagnostics, PoolAllocator};

use crate::node::*;
use crate::ops::UnaryOp;
use crate::temporaries::Temporaries;
use crate::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
use crate::types::Type;

/// Writes one line per node, indented two spaces per ancestor.
#[derive(Debug, Default)]
pub struct TreeDumper {
    out: String,
}

impl TreeDumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, depth: usize, args: std::fmt::Arguments<'_>) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        // Writing to a String cannot fail.
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }
}

fn typed(ty: Type<'_>) -> String {
    format!("({ty})")
}

impl<'a> Visitor<'a> for TreeDumper {
    fn visit_symbol(
        &mut self,
        _node: NodeRef<'a>,
        symbol: &'a SymbolNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let variable = symbol.variable;
        self.line(cx.depth(), format_args!("Symbol '{}' {}", variable.name, typed(variable.ty)));
        Action::Descend
    }

    fn visit_constant(
        &mut self,
        _node: NodeRef<'a>,
        constant: &'a ConstantNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let values: Vec<_> = constant.values.iter().map(ToString::to_string).collect();
        self.line(
            cx.depth(),
            format_args!("Constant {} {}", values.join(", "), typed(constant.ty)),
        );
        Action::Descend
    }

    fn visit_function_prototype(
        &mut self,
        _node: NodeRef<'a>,
        prototype: &'a PrototypeNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Prototype {}", prototype.function));
        Action::Descend
    }

    fn visit_unary(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        unary: &'a UnaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let suffix = match unary.op {
            UnaryOp::PostIncrement | UnaryOp::PostDecrement => " (post)",
            _ => "",
        };
        self.line(
            cx.depth(),
            format_args!("Unary {}{suffix} {}", unary.op, typed(unary.ty)),
        );
        Action::Descend
    }

    fn visit_binary(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        binary: &'a BinaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Binary {} {}", binary.op, typed(binary.ty)));
        Action::Descend
    }

    fn visit_aggregate(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        aggregate: &'a AggregateNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        match aggregate.op {
            AggregateOp::Call(function) => self.line(
                cx.depth(),
                format_args!("Call {} {}", function.name, typed(aggregate.ty)),
            ),
            AggregateOp::Construct => {
                self.line(cx.depth(), format_args!("Construct {}", aggregate.ty))
            }
        }
        Action::Descend
    }

    fn visit_ternary(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        ternary: &'a TernaryNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Ternary {}", typed(ternary.ty)));
        Action::Descend
    }

    fn visit_if_else(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        _if_else: &'a IfElseNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("If"));
        Action::Descend
    }

    fn visit_loop(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        loop_node: &'a LoopNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Loop {}", loop_node.kind.as_str()));
        Action::Descend
    }

    fn visit_branch(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        branch: &'a BranchNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Branch {}", branch.op.as_str()));
        Action::Descend
    }

    fn visit_declaration(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        _declaration: &'a DeclarationNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Declaration"));
        Action::Descend
    }

    fn visit_block(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        _block: &'a BlockNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Block"));
        Action::Descend
    }

    fn visit_function_definition(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        definition: &'a FunctionDefinitionNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        self.line(cx.depth(), format_args!("Function {}", definition.function.name));
        Action::Descend
    }
}

/// Render the tree under `root`.
pub fn dump_tree<'a>(pool: &'a PoolAllocator, root: NodeRef<'a>) -> String {
    let mut temporaries = Temporaries::new();
    let mut diagnostics = Diagnostics::new();
    let mut cx = TraverseCx::new(pool, &mut temporaries, &mut diagnostics);
    let mut dumper = TreeDumper::new();
    traverse(&mut dumper, &mut cx, root);
    dumper.finish()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::NodeBuilder;
    use crate::ops::BinaryOp;
    use crate::symbol::{Function, SymbolKind, Variable};
    use crate::types::BasicType;

    #[test]
    fn dumps_function() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let c = Variable::new_in(&pool, "c", Type::bool(), SymbolKind::UserDefined);
        let f = Function::new_in(&pool, "f", Type::int(), &[], SymbolKind::UserDefined);
        let body = [
            build.if_else(build.symbol(c), &[build.ret(Some(build.int(1)))], None),
            build.ret(Some(build.construct(
                Type::vec(BasicType::Int, 2),
                &[build.int(0), build.int(2)],
            ))),
        ];
        let definition = build.function(f, &body);
        let unit = build.translation_unit(&[definition]);

        let expected = "\
Block
  Function f
    Prototype int f()
    Block
      If
        Symbol 'c' (bool)
        Block
          Branch return
            Constant 1 (int)
      Branch return
        Construct ivec2
          Constant 0 (int)
          Constant 2 (int)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
    }

    #[test]
    fn dumps_operators() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let x = Variable::new_in(&pool, "x", Type::float(), SymbolKind::UserDefined);
        let increment = build.unary(UnaryOp::PostIncrement, build.symbol(x), Type::float());
        let sum = build.binary(BinaryOp::Add, increment, build.float(1.5), Type::float());
        let tree = build.block(&[build.declare(x, Some(sum))]);

        let expected = "\
Block
  Declaration
    Binary = (float)
      Symbol 'x' (float)
      Binary + (float)
        Unary ++ (post) (float)
          Symbol 'x' (float)
        Constant 1.5 (float)
";
        assert_eq!(dump_tree(&pool, tree), expected);
    }
}
