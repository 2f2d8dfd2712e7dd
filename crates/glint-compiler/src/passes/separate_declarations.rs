//! `int a, b = 1;` → `int a; int b = 1;`
//!
//! Only declarations that are statements of a block are split. A declaration
//! in a loop header keeps its declarators together.

use glint_ast::traverse::{Action, TraverseCx, Visit, Visitor, traverse};
use glint_ast::{DeclarationNode, NodeKind, NodeRef};

struct SeparateDeclarations {
    separated: usize,
}

impl<'a> Visitor<'a> for SeparateDeclarations {
    fn visit_declaration(
        &mut self,
        _visit: Visit,
        node: NodeRef<'a>,
        declaration: &'a DeclarationNode<'a>,
        cx: &mut TraverseCx<'_, 'a>,
    ) -> Action<'a> {
        let declarators = declaration.declarators.get();
        if declarators.len() < 2 {
            return Action::Skip;
        }
        let Some(parent) = cx.parent() else {
            return Action::Skip;
        };
        if !matches!(parent.kind, NodeKind::Block(_)) {
            return Action::Skip;
        }

        let build = cx.build();
        let split: Vec<NodeRef<'a>> = declarators
            .iter()
            .map(|&declarator| build.declaration(&[declarator]))
            .collect();
        tracing::trace!(at = %node.span, count = split.len(), "separating declaration");
        cx.queue_multi_replacement(parent, node, &split);
        self.separated += 1;
        Action::Skip
    }
}

/// Split every multi-declarator statement. Returns the number of split
/// declarations.
pub fn separate_declarations<'a>(cx: &mut TraverseCx<'_, 'a>, root: NodeRef<'a>) -> usize {
    let mut pass = SeparateDeclarations { separated: 0 };
    traverse(&mut pass, cx, root);
    cx.commit();
    pass.separated
}
