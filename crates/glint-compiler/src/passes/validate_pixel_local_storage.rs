//! Control-flow restrictions for shaders that declare pixel local storage.
//!
//! Once a plane is declared, `discard` is illegal anywhere and `return` is
//! illegal inside `main`, since the storage is written back at the end of
//! `main`.

use glint_ast::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
use glint_ast::{BranchNode, BranchOp, NodeRef, Qualifier};
use glint_core::CompileError;

use super::{ValidationOutcome, declared_symbol};

/// Whether a top-level declaration declares a pixel local storage plane.
fn declares_planes(root: NodeRef<'_>) -> bool {
    let Some(block) = root.as_block() else {
        return false;
    };
    block
        .statements
        .iter()
        .filter_map(|statement| statement.as_declaration())
        .flat_map(|declaration| declaration.declarators.iter())
        .filter_map(declared_symbol)
        .any(|(_, variable)| variable.ty.qualifier == Qualifier::PixelLocal)
}

#[derive(Default)]
struct ValidatePixelLocalStorage {
    errors: usize,
}

impl<'a> Visitor<'a> for ValidatePixelLocalStorage {
    fn visit_branch(
        &mut self,
        _visit: Visit,
        node: NodeRef<'a>,
        branch: &'a BranchNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let in_main = cx.current_function().is_some_and(|function| function.is_main());
        let span = node.span;
        let error = match branch.op {
            BranchOp::Discard => CompileError::IllegalDiscardWithPixelLocalStorage { span },
            BranchOp::Return if in_main => {
                CompileError::IllegalReturnWithPixelLocalStorage { span }
            }
            _ => return Action::Descend,
        };
        self.errors += 1;
        cx.diagnostics().report(error);
        Action::Descend
    }
}

/// Reject `discard` and `return` from `main` when pixel local storage
/// planes are declared.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn validate_pixel_local_storage<'a>(
    cx: &mut TraverseCx<'_, 'a>,
    root: NodeRef<'a>,
) -> ValidationOutcome {
    if !declares_planes(root) {
        return ValidationOutcome::FeatureUnused;
    }
    let mut pass = ValidatePixelLocalStorage::default();
    traverse(&mut pass, cx, root);
    ValidationOutcome::from_counts(true, pass.errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::Harness;
    use glint_ast::{BasicType, Function, NodeBuilder, SymbolKind, Type, Variable};
    use glint_core::{PoolAllocator, Span};

    fn plane(pool: &PoolAllocator) -> &Variable<'_> {
        let ty = Type::vec(BasicType::Float, 4).with_qualifier(Qualifier::PixelLocal);
        Variable::new_in(pool, "pls", ty, SymbolKind::UserDefined)
    }

    #[test]
    fn without_planes_the_feature_is_unused() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let unit = build.translation_unit(&[build.function(main, &[build.discard()])]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(
            validate_pixel_local_storage(&mut cx, unit.root()),
            ValidationOutcome::FeatureUnused
        );
        assert!(harness.diagnostics.is_empty());
    }

    #[test]
    fn discard_and_return_from_main_are_rejected() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let c = Variable::new_in(&pool, "c", Type::bool(), SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let body = [
            build.if_else(build.symbol(c), &[build.at(Span::new(4, 5, 7)).discard()], None),
            build.at(Span::new(5, 5, 6)).ret(None),
        ];
        let unit = build.translation_unit(&[
            build.declare(plane(&pool), None),
            build.function(main, &body),
        ]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(
            validate_pixel_local_storage(&mut cx, unit.root()),
            ValidationOutcome::Invalid
        );
        let messages: Vec<_> = harness
            .diagnostics
            .errors()
            .map(|error| (error.span, error.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            [
                (Span::new(4, 5, 7), "illegal discard when pixel local storage is declared"),
                (
                    Span::new(5, 5, 6),
                    "illegal return from main when pixel local storage is declared"
                ),
            ]
        );
    }

    #[test]
    fn return_from_helper_is_allowed() {
        let pool = PoolAllocator::default();
        let build = NodeBuilder::new(&pool);
        let helper = Function::new_in(&pool, "helper", Type::int(), &[], SymbolKind::UserDefined);
        let main = Function::new_in(&pool, "main", Type::void(), &[], SymbolKind::UserDefined);
        let unit = build.translation_unit(&[
            build.declare(plane(&pool), None),
            build.function(helper, &[build.ret(Some(build.int(1)))]),
            build.function(main, &[build.call(helper, &[])]),
        ]);

        let mut harness = Harness::default();
        let mut cx = harness.cx(&pool);
        assert_eq!(
            validate_pixel_local_storage(&mut cx, unit.root()),
            ValidationOutcome::Valid
        );
    }
}
