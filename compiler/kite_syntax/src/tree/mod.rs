//! Flat syntax tree storage.
//!
//! [`SyntaxTree`] uses struct-of-arrays layout (parallel `kinds`, `texts`,
//! `parents` arrays indexed by [`NodeId`]). Child lists are flattened into a
//! single `child_lists` vector addressed by `ChildSpan`.
//!
//! Nodes are allocated in post-order by [`SyntaxTreeBuilder`]: every child
//! has a smaller id than its parent, and siblings are stored in source order.
//! The tree is immutable once built; all queries take `&self`.

use kite_ir::{Name, SharedInterner};

use crate::node_id::ChildSpan;
use crate::{NodeId, SyntaxKind};

/// Immutable syntax tree.
///
/// # Index Spaces
///
/// - `kinds`/`texts`/`parents`/`children`/`slots`: parallel arrays indexed
///   by [`NodeId`]
/// - `child_lists`: flat `Vec<NodeId>` indexed by `ChildSpan`
pub struct SyntaxTree {
    kinds: Vec<SyntaxKind>,
    /// Source text of leaves; `Name::EMPTY` for interior nodes.
    texts: Vec<Name>,
    /// Parent of each node; `NodeId::INVALID` for top-level nodes.
    parents: Vec<NodeId>,
    children: Vec<ChildSpan>,
    /// Position of each node in its parent's child list.
    slots: Vec<u32>,
    child_lists: Vec<NodeId>,
    roots: Vec<NodeId>,
    interner: SharedInterner,
}

impl SyntaxTree {
    fn empty(interner: SharedInterner) -> Self {
        Self {
            kinds: Vec::new(),
            texts: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            slots: Vec::new(),
            child_lists: Vec::new(),
            roots: Vec::new(),
            interner,
        }
    }

    /// Kind tag of a node.
    #[inline]
    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.kinds[id.index()]
    }

    /// Interned source text of a leaf (`Name::EMPTY` for interior nodes).
    #[inline]
    pub fn name(&self, id: NodeId) -> Name {
        self.texts[id.index()]
    }

    /// Source text of a leaf (empty for interior nodes).
    pub fn text(&self, id: NodeId) -> &str {
        self.interner.lookup_static(self.name(id))
    }

    /// Parent of a node, `None` for top-level nodes.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parents[id.index()];
        parent.is_valid().then_some(parent)
    }

    /// Children of a node in source order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.child_lists[self.children[id.index()].as_range()]
    }

    /// First child of a node.
    #[inline]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// First child of a node with the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.kind(child) == kind)
    }

    /// Children of a node with the given kind, in source order.
    pub fn children_of_kind(
        &self,
        id: NodeId,
        kind: SyntaxKind,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.kind(child) == kind)
    }

    /// The sibling immediately after a node, in source order.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let slot = self.slots[id.index()] as usize;
        self.children(parent).get(slot + 1).copied()
    }

    /// Every sibling after a node, in source order.
    pub fn following_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.next_sibling(id), move |&node| self.next_sibling(node))
    }

    /// Top-level nodes in source order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Reconstruct the source text under a node by concatenating its leaves.
    pub fn source_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_source(id, &mut out);
        out
    }

    fn write_source(&self, id: NodeId, out: &mut String) {
        let children = self.children(id);
        if children.is_empty() {
            out.push_str(self.text(id));
        }
        for &child in children {
            self.write_source(child, out);
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn alloc(&mut self, kind: SyntaxKind, text: Name, children: &[NodeId]) -> NodeId {
        let id = NodeId::new(to_u32(self.kinds.len(), "syntax nodes"));
        let start = to_u32(self.child_lists.len(), "child list entries");
        let len = to_u32(children.len(), "children of one node");

        self.kinds.push(kind);
        self.texts.push(text);
        self.parents.push(NodeId::INVALID);
        self.slots.push(0);
        self.children.push(ChildSpan::new(start, len));
        self.child_lists.extend_from_slice(children);

        for (slot, &child) in children.iter().enumerate() {
            self.parents[child.index()] = id;
            self.slots[child.index()] = to_u32(slot, "children of one node");
        }
        id
    }
}

/// Convert a length to `u32`, panicking with context on overflow.
fn to_u32(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("too many {what}: {len} exceeds u32::MAX"))
}

/// Builder for a [`SyntaxTree`].
///
/// Mirrors how a parser emits nodes: open a node, emit its children, close
/// it. Leaves are emitted with [`leaf`](Self::leaf) or
/// [`token`](Self::token).
pub struct SyntaxTreeBuilder {
    tree: SyntaxTree,
    /// Open nodes and the children collected for each so far.
    stack: Vec<(SyntaxKind, Vec<NodeId>)>,
}

impl SyntaxTreeBuilder {
    /// Create a builder interning leaf text into `interner`.
    pub fn new(interner: SharedInterner) -> Self {
        Self {
            tree: SyntaxTree::empty(interner),
            stack: Vec::new(),
        }
    }

    /// Open an interior node.
    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.stack.push((kind, Vec::new()));
    }

    /// Close the innermost open node and return its id.
    ///
    /// # Panics
    /// Panics if no node is open.
    pub fn finish_node(&mut self) -> NodeId {
        let Some((kind, children)) = self.stack.pop() else {
            panic!("finish_node called without a matching start_node");
        };
        let id = self.tree.alloc(kind, Name::EMPTY, &children);
        self.attach(id);
        id
    }

    /// Emit a leaf with the given source text.
    pub fn leaf(&mut self, kind: SyntaxKind, text: &str) -> NodeId {
        let name = self.tree.interner.intern(text);
        let id = self.tree.alloc(kind, name, &[]);
        self.attach(id);
        id
    }

    /// Emit a punctuation token with its fixed text.
    pub fn token(&mut self, kind: SyntaxKind) -> NodeId {
        self.leaf(kind, kind.punctuation().unwrap_or(""))
    }

    /// Emit a single space.
    pub fn space(&mut self) -> NodeId {
        self.token(SyntaxKind::Whitespace)
    }

    fn attach(&mut self, id: NodeId) {
        match self.stack.last_mut() {
            Some((_, children)) => children.push(id),
            None => self.tree.roots.push(id),
        }
    }

    /// Finish building, closing any nodes left open.
    pub fn finish(mut self) -> SyntaxTree {
        debug_assert!(
            self.stack.is_empty(),
            "{} syntax nodes left open",
            self.stack.len()
        );
        while !self.stack.is_empty() {
            self.finish_node();
        }
        self.tree
    }
}
