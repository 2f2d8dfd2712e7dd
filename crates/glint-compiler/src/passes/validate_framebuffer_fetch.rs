//! `noncoherent` qualifier rules for framebuffer fetch.
//!
//! With the non-coherent framebuffer fetch extension enabled, every `inout`
//! fragment output must be declared `noncoherent`, and `gl_LastFragData` may
//! only be read after a redeclaration that carries the qualifier.

use glint_ast::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
use glint_ast::{BinaryOp, DeclarationNode, NodeRef, Qualifier, SymbolNode, TypeFlags, Variable};
use glint_core::{CompileError, Extensions, ShaderFeatures, Span};

use super::{ValidationOutcome, declared_symbol};

#[derive(Default)]
struct ValidateFramebufferFetch {
    used: bool,
    errors: usize,
    last_frag_data_redeclared: bool,
    reported_last_frag_data_use: bool,
}

impl ValidateFramebufferFetch {
    fn missing_qualifier(
        &mut self,
        variable: &Variable<'_>,
        span: Span,
        cx: &mut TraverseCx<'_, '_>,
    ) {
        self.errors += 1;
        cx.diagnostics().report(CompileError::MissingNoncoherentQualifier {
            name: variable.name.to_string(),
            span,
        });
    }
}

fn is_noncoherent(variable: &Variable<'_>) -> bool {
    variable.ty.flags.contains(TypeFlags::NONCOHERENT)
}

/// Whether the symbol being visited is the one a declarator declares rather
/// than a use.
fn is_declared_symbol<'a>(node: NodeRef<'a>, cx: &TraverseCx<'_, 'a>) -> bool {
    let Some(parent) = cx.parent() else {
        return false;
    };
    match parent.as_binary() {
        Some(binary) => {
            binary.op == BinaryOp::Initialize
                && binary.left.get().is(node)
                && cx
                    .path()
                    .iter()
                    .rev()
                    .nth(1)
                    .is_some_and(|grandparent| grandparent.as_declaration().is_some())
        }
        None => parent.as_declaration().is_some(),
    }
}

impl<'a> Visitor<'a> for ValidateFramebufferFetch {
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
            match variable.ty.qualifier {
                Qualifier::FragmentInOut => {
                    self.used = true;
                    if !is_noncoherent(variable) {
                        self.missing_qualifier(variable, symbol.span, cx);
                    }
                }
                Qualifier::LastFragData => {
                    self.used = true;
                    if is_noncoherent(variable) {
                        self.last_frag_data_redeclared = true;
                    } else {
                        self.missing_qualifier(variable, symbol.span, cx);
                    }
                }
                _ => {}
            }
        }
        Action::Descend
    }

    fn visit_symbol(
        &mut self,
        node: NodeRef<'a>,
        symbol: &'a SymbolNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let variable = symbol.variable;
        if variable.ty.qualifier != Qualifier::LastFragData || is_declared_symbol(node, cx) {
            return Action::Descend;
        }
        self.used = true;
        if !self.last_frag_data_redeclared && !self.reported_last_frag_data_use {
            self.reported_last_frag_data_use = true;
            self.missing_qualifier(variable, node.span, cx);
        }
        Action::Descend
    }
}

/// Check the `noncoherent` rules when the non-coherent framebuffer fetch
/// extension is enabled.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn validate_framebuffer_fetch<'a>(
    cx: &mut TraverseCx<'_, 'a>,
    root: NodeRef<'a>,
    features: &ShaderFeatures,
) -> ValidationOutcome {
    if !features.has_extension(Extensions::FRAMEBUFFER_FETCH_NON_COHERENT) {
        return ValidationOutcome::FeatureUnused;
    }
    let mut pass = ValidateFramebufferFetch::default();
    traverse(&mut pass, cx, root);
    ValidationOutcome::from_counts(pass.used, pass.errors)
}
