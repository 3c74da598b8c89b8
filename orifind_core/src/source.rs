//! The read-only view of a content tree that the scanner walks.
//!
//! The tree is owned by the content renderer. Search code only ever holds
//! `NodeId`s between calls and re-validates them with `contains` before use,
//! so nodes may disappear between two scan slices without harm.

use std::fmt;

/// Stable identity of one node in a content tree.
///
/// Identities are never reused within one tree, so a stale id can be
/// detected with [`TextSource::contains`] instead of silently resolving
/// to a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered, traversable tree of text-bearing nodes.
///
/// Pre-order traversal from [`root`](Self::root) following
/// [`children`](Self::children) must match the document's visual
/// top-to-bottom order.
pub trait TextSource {
    /// Root of the tree.
    fn root(&self) -> NodeId;

    /// Whether `id` is still attached to the tree.
    fn contains(&self, id: NodeId) -> bool;

    /// Live children of `id` in document order. Unknown ids have none.
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    /// Text value of a text-bearing node, `None` for containers.
    fn text(&self, id: NodeId) -> Option<&str>;

    /// Whether `id` and its subtree take part in search.
    fn is_searchable(&self, id: NodeId) -> bool;
}
