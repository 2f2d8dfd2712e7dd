//! Per-traversal state handed to every visitor hook.

use glint_core::{Diagnostics, PoolAllocator};

use crate::builder::NodeBuilder;
use crate::node::{NodeKind, NodeRef, Sequence};
use crate::symbol::{Function, Variable};
use crate::temporaries::Temporaries;
use crate::types::Type;

#[derive(Debug)]
struct Replacement<'a> {
    parent: NodeRef<'a>,
    original: NodeRef<'a>,
    replacement: NodeRef<'a>,
}

#[derive(Debug)]
struct MultiReplacement<'a> {
    parent: NodeRef<'a>,
    original: NodeRef<'a>,
    replacements: Vec<NodeRef<'a>>,
}

#[derive(Debug)]
struct Insertion<'a> {
    block: NodeRef<'a>,
    anchor: NodeRef<'a>,
    before: Vec<NodeRef<'a>>,
    after: Vec<NodeRef<'a>>,
}

/// Traversal context: the ancestor path, the edit queues and the
/// compilation-wide services a pass needs (pool, temporaries, diagnostics).
///
/// A context can be reused for several traversals; queued edits survive until
/// [`commit`](Self::commit).
pub struct TraverseCx<'s, 'a> {
    pool: &'a PoolAllocator,
    temporaries: &'s mut Temporaries,
    diagnostics: &'s mut Diagnostics,
    pub(super) path: Vec<NodeRef<'a>>,
    pub(super) current: Option<NodeRef<'a>>,
    pub(super) current_function: Option<&'a Function<'a>>,
    pub(super) max_depth: usize,
    pub(super) immediate_replacements: usize,
    replacements: Vec<Replacement<'a>>,
    multi_replacements: Vec<MultiReplacement<'a>>,
    insertions: Vec<Insertion<'a>>,
}

impl<'s, 'a> TraverseCx<'s, 'a> {
    pub fn new(
        pool: &'a PoolAllocator,
        temporaries: &'s mut Temporaries,
        diagnostics: &'s mut Diagnostics,
    ) -> Self {
        Self {
            pool,
            temporaries,
            diagnostics,
            path: Vec::new(),
            current: None,
            current_function: None,
            max_depth: 0,
            immediate_replacements: 0,
            replacements: Vec::new(),
            multi_replacements: Vec::new(),
            insertions: Vec::new(),
        }
    }

    #[inline]
    pub fn pool(&self) -> &'a PoolAllocator {
        self.pool
    }

    /// A builder stamped with the location of the node being visited.
    pub fn build(&self) -> NodeBuilder<'a> {
        let builder = NodeBuilder::new(self.pool);
        match self.current {
            Some(node) => builder.at(node.span),
            None => builder,
        }
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    // ========================================================================
    // Position
    // ========================================================================

    /// Ancestors of the node being visited, root first.
    pub fn path(&self) -> &[NodeRef<'a>] {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.path.last().copied()
    }

    /// The node whose hook is running.
    pub fn current(&self) -> Option<NodeRef<'a>> {
        self.current
    }

    /// Number of ancestors of the node being visited.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Deepest path seen since the context was created.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The function whose definition encloses the node being visited.
    pub fn current_function(&self) -> Option<&'a Function<'a>> {
        self.current_function
    }

    /// Replacements returned directly from hooks so far.
    pub fn immediate_replacements(&self) -> usize {
        self.immediate_replacements
    }

    // ========================================================================
    // Temporaries
    // ========================================================================

    pub fn create_temp_variable(&mut self, ty: Type<'a>) -> &'a Variable<'a> {
        self.temporaries.create(self.pool, ty)
    }

    /// A fresh temporary initialized with `init`, and its declaration.
    pub fn declare_temp(&mut self, init: NodeRef<'a>) -> (&'a Variable<'a>, NodeRef<'a>) {
        let ty = init.ty().unwrap_or_else(Type::void);
        let variable = self.create_temp_variable(ty);
        let declaration = self.build().declare(variable, Some(init));
        (variable, declaration)
    }

    /// A fresh uninitialized temporary of type `ty`, and its declaration.
    pub fn declare_uninitialized_temp(&mut self, ty: Type<'a>) -> (&'a Variable<'a>, NodeRef<'a>) {
        let variable = self.create_temp_variable(ty);
        let declaration = self.build().declare(variable, None);
        (variable, declaration)
    }

    // ========================================================================
    // Edit queues
    // ========================================================================

    /// Queue replacing `original` inside the current parent.
    ///
    /// # Panics
    ///
    /// Panics when called while visiting the root.
    pub fn queue_replacement(&mut self, original: NodeRef<'a>, replacement: NodeRef<'a>) {
        let Some(parent) = self.parent() else {
            panic!("cannot queue a replacement of the traversal root");
        };
        self.queue_replacement_with_parent(parent, original, replacement);
    }

    pub fn queue_replacement_with_parent(
        &mut self,
        parent: NodeRef<'a>,
        original: NodeRef<'a>,
        replacement: NodeRef<'a>,
    ) {
        self.replacements.push(Replacement {
            parent,
            original,
            replacement,
        });
    }

    /// Queue replacing `original` in the child list of `parent` (a block,
    /// declaration or aggregate) with zero or more nodes.
    pub fn queue_multi_replacement(
        &mut self,
        parent: NodeRef<'a>,
        original: NodeRef<'a>,
        replacements: &[NodeRef<'a>],
    ) {
        self.multi_replacements.push(MultiReplacement {
            parent,
            original,
            replacements: replacements.to_vec(),
        });
    }

    /// Queue statements around the statement that contains the current node,
    /// in the nearest enclosing block.
    ///
    /// Returns `false` when no block encloses the current node.
    pub fn insert_statements_in_parent_block(
        &mut self,
        before: &[NodeRef<'a>],
        after: &[NodeRef<'a>],
    ) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let Some(block_index) = self
            .path
            .iter()
            .rposition(|node| matches!(node.kind, NodeKind::Block(_)))
        else {
            return false;
        };
        let anchor = self.path.get(block_index + 1).copied().unwrap_or(current);
        self.insertions.push(Insertion {
            block: self.path[block_index],
            anchor,
            before: before.to_vec(),
            after: after.to_vec(),
        });
        true
    }

    pub fn has_pending_edits(&self) -> bool {
        !(self.replacements.is_empty()
            && self.multi_replacements.is_empty()
            && self.insertions.is_empty())
    }

    /// Apply every queued edit and return how many were applied.
    ///
    /// Insertions go first, then multi-replacements, then single
    /// replacements, each in queue order.
    ///
    /// # Panics
    ///
    /// Panics when a queued target is no longer a child of its recorded
    /// parent.
    pub fn commit(&mut self) -> usize {
        let pool = self.pool;
        let mut applied = 0;

        for Insertion {
            block,
            anchor,
            before,
            after,
        } in self.insertions.drain(..)
        {
            assert!(
                child_list(block).insert_around(pool, anchor, &before, &after),
                "insertion anchor {} at {} is not a statement of its block",
                anchor.kind_name(),
                anchor.span,
            );
            applied += 1;
        }

        for edit in self.multi_replacements.drain(..) {
            let list = child_list(edit.parent);
            assert!(
                list.replace_with_many(pool, edit.original, &edit.replacements),
                "multi-replacement target {} at {} is not a child of {}",
                edit.original.kind_name(),
                edit.original.span,
                edit.parent.kind_name(),
            );
            applied += 1;
        }

        for edit in self.replacements.drain(..) {
            assert!(
                edit.parent.replace_child(pool, edit.original, edit.replacement),
                "replacement target {} at {} is not a child of {}",
                edit.original.kind_name(),
                edit.original.span,
                edit.parent.kind_name(),
            );
            applied += 1;
        }

        tracing::debug!(applied, "committed queued edits");
        applied
    }
}

fn child_list<'a>(parent: NodeRef<'a>) -> &'a Sequence<'a> {
    match &parent.kind {
        NodeKind::Block(block) => &block.statements,
        NodeKind::Declaration(declaration) => &declaration.declarators,
        NodeKind::Aggregate(aggregate) => &aggregate.args,
        _ => panic!("{} has no child list", parent.kind_name()),
    }
}
