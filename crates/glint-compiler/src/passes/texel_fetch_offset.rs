//! `texelFetchOffset(s, P, lod, offset)` → `texelFetch(s, P + offset, lod)`.
//!
//! For 2D array samplers `P` is an `ivec3` and the offset an `ivec2`, so the
//! offset is widened to `ivec3(offset, 0)` first.

use glint_ast::traverse::{
    Action, SingleSiteRewrite, TraverseCx, Visit, Visitor, run_to_fixed_point,
};
use glint_ast::{AggregateNode, BasicType, BinaryOp, NodeRef, Type};
use glint_registry::SymbolTable;

const TEXEL_FETCH: &str = "texelFetch";
const TEXEL_FETCH_OFFSET: &str = "texelFetchOffset";

struct RewriteTexelFetchOffset<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    found: bool,
}

impl<'a> Visitor<'a> for RewriteTexelFetchOffset<'_, 'a> {
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
        let Some(function) = aggregate.function() else {
            return Action::Descend;
        };
        if !function.is_builtin() || function.name != TEXEL_FETCH_OFFSET {
            return Action::Descend;
        }
        let &[sampler, coordinate, lod, offset] = aggregate.args.get() else {
            return Action::Descend;
        };
        let (Some(sampler_ty), Some(coordinate_ty)) = (sampler.ty(), coordinate.ty()) else {
            return Action::Descend;
        };
        let Some(texel_fetch) =
            self.symbols
                .find_builtin(TEXEL_FETCH, &[sampler_ty, coordinate_ty, Type::int()])
        else {
            tracing::warn!(sampler = %sampler_ty, "no texelFetch overload for texelFetchOffset");
            return Action::Descend;
        };

        let build = cx.build();
        let offset = if sampler_ty.basic.is_sampler_2d_array() {
            build.construct(Type::vec(BasicType::Int, 3), &[offset, build.int(0)])
        } else {
            offset
        };
        let coordinate =
            build.binary(BinaryOp::Add, coordinate, offset, coordinate_ty.as_temporary());
        let replacement = build.call(texel_fetch, &[sampler, coordinate, lod]);

        tracing::trace!(at = %node.span, "rewriting texelFetchOffset");
        cx.queue_replacement(node, replacement);
        self.found = true;
        Action::Skip
    }
}

impl<'a> SingleSiteRewrite<'a> for RewriteTexelFetchOffset<'_, 'a> {
    fn found(&self) -> bool {
        self.found
    }

    fn reset(&mut self) {
        self.found = false;
    }
}

/// Rewrite every `texelFetchOffset` call. Returns the number of rewritten
/// calls.
pub fn rewrite_texel_fetch_offset<'a>(
    cx: &mut TraverseCx<'_, 'a>,
    root: NodeRef<'a>,
    symbols: &SymbolTable<'a>,
) -> usize {
    let mut rewrite = RewriteTexelFetchOffset {
        symbols,
        found: false,
    };
    run_to_fixed_point(&mut rewrite, cx, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::Harness;
    use glint_ast::{Function, NodeBuilder, SymbolKind, Variable, dump_tree};
    use glint_core::{PoolAllocator, Resources, ShaderFeatures, ShaderStage, ShaderVersion};
    use pretty_assertions::assert_eq;

    fn symbols(pool: &PoolAllocator) -> SymbolTable<'_> {
        let features = ShaderFeatures::new(ShaderVersion::Es300, ShaderStage::Fragment);
        SymbolTable::new(pool, features, &Resources::default())
    }

    fn offset_call<'a>(
        build: NodeBuilder<'a>,
        symbols: &SymbolTable<'a>,
        sampler: &'a Variable<'a>,
        coordinate: &'a Variable<'a>,
        offset: &'a Variable<'a>,
    ) -> NodeRef<'a> {
        let function = symbols
            .find_builtin(TEXEL_FETCH_OFFSET, &[sampler.ty, coordinate.ty, Type::int(), offset.ty])
            .unwrap();
        build.call(
            function,
            &[build.symbol(sampler), build.symbol(coordinate), build.int(0), build.symbol(offset)],
        )
    }

    #[test]
    fn rewrites_2d_sampler() {
        let pool = PoolAllocator::default();
        let symbols = symbols(&pool);
        let build = NodeBuilder::new(&pool);
        let ivec2 = Type::vec(BasicType::Int, 2);
        let s = Variable::new_in(&pool, "s", Type::scalar(BasicType::Sampler2D), SymbolKind::UserDefined);
        let p = Variable::new_in(&pool, "p", ivec2, SymbolKind::UserDefined);
        let o = Variable::new_in(&pool, "o", ivec2, SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let unit = build.translation_unit(&[build.function(main, &[offset_call(build, &symbols, s, p, o)])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(rewrite_texel_fetch_offset(&mut cx, unit.root(), &symbols), 1);

        let expected = "\
Block
  Function main
    Prototype void main()
    Block
      Call texelFetch (vec4)
        Symbol 's' (sampler2D)
        Binary + (ivec2)
          Symbol 'p' (ivec2)
          Symbol 'o' (ivec2)
        Constant 0 (int)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
    }

    #[test]
    fn widens_offset_for_2d_arrays() {
        let pool = PoolAllocator::default();
        let symbols = symbols(&pool);
        let build = NodeBuilder::new(&pool);
        let s = Variable::new_in(
            &pool,
            "s",
            Type::scalar(BasicType::USampler2DArray),
            SymbolKind::UserDefined,
        );
        let p = Variable::new_in(&pool, "p", Type::vec(BasicType::Int, 3), SymbolKind::UserDefined);
        let o = Variable::new_in(&pool, "o", Type::vec(BasicType::Int, 2), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let call = offset_call(build, &symbols, s, p, o);
        let unit = build.translation_unit(&[build.function(main, &[call])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        rewrite_texel_fetch_offset(&mut cx, unit.root(), &symbols);

        let expected = "\
Block
  Function main
    Prototype void main()
    Block
      Call texelFetch (uvec4)
        Symbol 's' (usampler2DArray)
        Binary + (ivec3)
          Symbol 'p' (ivec3)
          Construct ivec3
            Symbol 'o' (ivec2)
            Constant 0 (int)
        Constant 0 (int)
";
        assert_eq!(dump_tree(&pool, unit.root()), expected);
    }

    #[test]
    fn each_call_takes_one_iteration() {
        let pool = PoolAllocator::default();
        let symbols = symbols(&pool);
        let build = NodeBuilder::new(&pool);
        let ivec2 = Type::vec(BasicType::Int, 2);
        let s = Variable::new_in(&pool, "s", Type::scalar(BasicType::Sampler2D), SymbolKind::UserDefined);
        let p = Variable::new_in(&pool, "p", ivec2, SymbolKind::UserDefined);
        let o = Variable::new_in(&pool, "o", ivec2, SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let body = [
            offset_call(build, &symbols, s, p, o),
            offset_call(build, &symbols, s, p, o),
        ];
        let unit = build.translation_unit(&[build.function(main, &body)]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(rewrite_texel_fetch_offset(&mut cx, unit.root(), &symbols), 2);
        assert!(!dump_tree(&pool, unit.root()).contains("texelFetchOffset"));
    }
}
