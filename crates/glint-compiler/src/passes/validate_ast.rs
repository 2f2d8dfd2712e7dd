//! Structural checks on the tree, run between mutating stages.
//!
//! Failures are bugs in a pass, not in the shader, so they come back as
//! [`AstInvariantError`] instead of diagnostics.

use glint_ast::{BinaryOp, Node, NodeKind, NodeRef};
use glint_core::AstInvariantError;
use rustc_hash::FxHashSet;

struct AstValidator {
    expect_separated: bool,
    seen: FxHashSet<*const ()>,
}

impl AstValidator {
    fn visit(&mut self, node: NodeRef<'_>, is_root: bool) -> Result<(), AstInvariantError> {
        let address = node as *const Node<'_> as *const ();
        if !self.seen.insert(address) {
            return Err(AstInvariantError::SharedNode { span: node.span });
        }

        match &node.kind {
            NodeKind::Block(block) => {
                for statement in block.statements.iter() {
                    self.check_statement(statement, is_root)?;
                    if let NodeKind::Declaration(declaration) = &statement.kind
                        && self.expect_separated
                        && declaration.declarators.len() != 1
                    {
                        return Err(AstInvariantError::UnseparatedDeclaration {
                            count: declaration.declarators.len(),
                            span: statement.span,
                        });
                    }
                }
            }
            NodeKind::Declaration(declaration) => {
                for declarator in declaration.declarators.iter() {
                    check_declarator(declarator)?;
                }
            }
            NodeKind::FunctionDefinition(definition) => {
                let prototype_ok =
                    matches!(definition.prototype.get().kind, NodeKind::FunctionPrototype(_));
                if !prototype_ok || definition.body_block().is_none() {
                    return Err(AstInvariantError::MalformedFunction { span: node.span });
                }
            }
            _ => {}
        }

        for child in node.children() {
            self.visit(child, false)?;
        }
        Ok(())
    }

    fn check_statement(
        &self,
        statement: NodeRef<'_>,
        in_root: bool,
    ) -> Result<(), AstInvariantError> {
        let allowed = match statement.kind {
            NodeKind::Declaration(_) => true,
            NodeKind::FunctionPrototype(_) | NodeKind::FunctionDefinition(_) => in_root,
            _ => !in_root,
        };
        if allowed {
            Ok(())
        } else {
            Err(AstInvariantError::NotAStatement {
                found: statement.kind_name(),
                span: statement.span,
            })
        }
    }
}

fn check_declarator(declarator: NodeRef<'_>) -> Result<(), AstInvariantError> {
    let well_formed = match &declarator.kind {
        NodeKind::Symbol(_) => true,
        NodeKind::Binary(binary) => {
            binary.op == BinaryOp::Initialize && binary.left.get().as_symbol().is_some()
        }
        _ => false,
    };
    if well_formed {
        Ok(())
    } else {
        Err(AstInvariantError::MalformedDeclarator {
            found: declarator.kind_name(),
            span: declarator.span,
        })
    }
}

/// Check that the tree under `root` (a translation unit's root block) is a
/// well-formed tree. With `expect_separated`, every declaration directly in a
/// block must hold exactly one declarator.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn validate_ast(root: NodeRef<'_>, expect_separated: bool) -> Result<(), AstInvariantError> {
    let mut validator = AstValidator {
        expect_separated,
        seen: FxHashSet::default(),
    };
    validator.visit(root, true)
}
