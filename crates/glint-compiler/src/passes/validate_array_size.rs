//! Reject array variables too large for the implementation.
//!
//! Sizes are measured with std140 rules, which pad every array element to 16
//! bytes. That overestimates tightly packed arrays, so the check is
//! conservative.

use glint_ast::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
use glint_ast::{DeclarationNode, NodeRef, SymbolKind, Type};
use glint_core::{CompileError, Resources};

use super::{ValidationOutcome, declared_symbol};

const VEC4_BYTES: u64 = 16;

fn round_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment).saturating_mul(alignment)
}

fn std140_alignment(ty: Type<'_>) -> u64 {
    if ty.is_array() || ty.is_struct() || ty.is_matrix() {
        VEC4_BYTES
    } else {
        match ty.primary_size {
            1 => 4,
            2 => 8,
            _ => VEC4_BYTES,
        }
    }
}

/// Size in bytes of a value of type `ty` under std140 layout rules.
pub fn std140_size(ty: Type<'_>) -> u64 {
    if let Some(count) = ty.outermost_array_size() {
        let stride = round_up(std140_size(ty.element_type()), VEC4_BYTES);
        return stride.saturating_mul(u64::from(count));
    }
    if let (true, Some(structure)) = (ty.is_struct(), ty.structure) {
        let end = structure.fields.iter().fold(0u64, |offset, field| {
            round_up(offset, std140_alignment(field.ty)).saturating_add(std140_size(field.ty))
        });
        return round_up(end, VEC4_BYTES);
    }
    if ty.is_matrix() {
        return u64::from(ty.cols()) * VEC4_BYTES;
    }
    4 * u64::from(ty.primary_size)
}

struct ValidateArraySizes {
    limit: u64,
    arrays: usize,
    errors: usize,
}

impl<'a> Visitor<'a> for ValidateArraySizes {
    fn visit_declaration(
        &mut self,
        _visit: Visit,
        _node: NodeRef<'a>,
        declaration: &'a DeclarationNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        for declarator in declaration.declarators.iter() {
            let Some((symbol, variable)) = declared_symbol(declarator) else {
                continue;
            };
            if variable.kind == SymbolKind::Internal || !variable.ty.is_array() {
                continue;
            }
            self.arrays += 1;

            let bytes = std140_size(variable.ty);
            if bytes > self.limit {
                self.errors += 1;
                cx.diagnostics().report(CompileError::ArraySizeTooLarge {
                    name: variable.name.to_string(),
                    bytes,
                    limit: self.limit,
                    span: symbol.span,
                });
            }
        }
        Action::Descend
    }
}

/// Check every declared array against `resources.max_array_size_bytes`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn validate_array_sizes<'a>(
    cx: &mut TraverseCx<'_, 'a>,
    root: NodeRef<'a>,
    resources: &Resources,
) -> ValidationOutcome {
    let mut pass = ValidateArraySizes {
        limit: resources.max_array_size_bytes,
        arrays: 0,
        errors: 0,
    };
    traverse(&mut pass, cx, root);
    ValidationOutcome::from_counts(pass.arrays > 0, pass.errors)
}
