//! Driver for rewrites that handle one site per traversal.

use super::{TraverseCx, Visitor, traverse};
use crate::node::NodeRef;

/// Upper bound on traversals before a rewrite is considered divergent.
pub const MAX_FIXED_POINT_ITERATIONS: usize = 1 << 16;

/// A visitor that rewrites at most one site per traversal.
///
/// After a match the visitor should skip everything else, so that the next
/// traversal sees the committed tree.
pub trait SingleSiteRewrite<'a>: Visitor<'a> {
    /// Whether the last traversal matched a site.
    fn found(&self) -> bool;

    /// Forget the previous match.
    fn reset(&mut self);
}

/// Traverse and commit until a traversal matches nothing. Returns the number
/// of rewritten sites.
///
/// # Panics
///
/// Panics after [`MAX_FIXED_POINT_ITERATIONS`] rewrites.
pub fn run_to_fixed_point<'a, V: SingleSiteRewrite<'a> + ?Sized>(
    visitor: &mut V,
    cx: &mut TraverseCx<'_, 'a>,
    root: NodeRef<'a>,
) -> usize {
    let mut sites = 0;
    loop {
        visitor.reset();
        traverse(visitor, cx, root);
        if !visitor.found() {
            debug_assert!(!cx.has_pending_edits(), "edits queued without a match");
            break;
        }
        cx.commit();
        sites += 1;
        assert!(
            sites < MAX_FIXED_POINT_ITERATIONS,
            "rewrite did not reach a fixed point after {sites} sites"
        );
    }
    tracing::debug!(sites, "fixed point reached");
    sites
}
