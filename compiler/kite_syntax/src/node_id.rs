//! Node handles for the flat syntax tree.

use std::fmt;
use std::ops::Range;

/// A node of a [`SyntaxTree`](crate::SyntaxTree), in allocation order.
///
/// Children are allocated before their parents, so a node's id is always
/// greater than the ids of everything below it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Parent slot of top-level nodes.
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "n{}", self.0)
        } else {
            f.write_str("n<none>")
        }
    }
}

/// Slice of the tree's flattened child lists owned by one node.
#[derive(Copy, Clone)]
pub(crate) struct ChildSpan {
    start: u32,
    len: u32,
}

impl ChildSpan {
    pub(crate) const fn new(start: u32, len: u32) -> Self {
        ChildSpan { start, len }
    }

    pub(crate) fn as_range(self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}
