//! Call-site argument resolution.
//!
//! A call's arguments live in three places in the tree:
//!
//! - value arguments inside the parenthesized [`ValueArgumentList`] child
//! - type arguments inside the [`TypeArgumentList`] child
//! - trailing function literals, written after the parentheses
//!
//! Trailing literals are the subtle part. Normally they are direct children
//! of the call node. When the callee itself is a function literal
//! (`{ a } { b } { c }`), the parser attaches the trailing literals as
//! siblings following the callee instead, and the callee literal is *not* one
//! of the call's function-literal arguments. A trailing literal may be
//! label-qualified (`f() label@{ x }`); the inner literal is reported and the
//! label is dropped.
//!
//! [`ValueArgumentList`]: SyntaxKind::ValueArgumentList
//! [`TypeArgumentList`]: SyntaxKind::TypeArgumentList

use kite_ir::Name;
use smallvec::SmallVec;

use crate::{NodeId, SyntaxKind, SyntaxTree};

/// Typed view of a [`SyntaxKind::CallExpr`] node.
#[derive(Copy, Clone)]
pub struct CallExpr<'t> {
    tree: &'t SyntaxTree,
    node: NodeId,
}

impl<'t> CallExpr<'t> {
    /// View `node` as a call, if it is one.
    pub fn cast(tree: &'t SyntaxTree, node: NodeId) -> Option<Self> {
        (tree.kind(node) == SyntaxKind::CallExpr).then_some(CallExpr { tree, node })
    }

    /// The underlying node.
    #[inline]
    pub fn node(self) -> NodeId {
        self.node
    }

    /// The callee: the first child that is an expression.
    pub fn callee(self) -> Option<NodeId> {
        self.tree
            .children(self.node)
            .iter()
            .copied()
            .find(|&child| self.tree.kind(child).is_expression())
    }

    /// The parenthesized value-argument list, if written.
    pub fn value_argument_list(self) -> Option<NodeId> {
        self.tree
            .child_of_kind(self.node, SyntaxKind::ValueArgumentList)
    }

    /// The type-argument list, if written.
    pub fn type_argument_list(self) -> Option<NodeId> {
        self.tree
            .child_of_kind(self.node, SyntaxKind::TypeArgumentList)
    }

    /// Function-literal arguments in source order.
    pub fn function_literal_arguments(self) -> SmallVec<[NodeId; 2]> {
        let callee = self.callee();
        match callee {
            Some(callee) if self.tree.kind(callee) == SyntaxKind::FunctionLiteral => self
                .tree
                .following_siblings(callee)
                .filter_map(|sibling| trailing_literal(self.tree, sibling))
                .collect(),
            _ => self
                .tree
                .children(self.node)
                .iter()
                .copied()
                .filter(|&child| Some(child) != callee)
                .filter_map(|child| trailing_literal(self.tree, child))
                .collect(),
        }
    }

    /// Entries of the value-argument list, or empty if there is none.
    pub fn value_arguments(self) -> Vec<ValueArgument> {
        let Some(list) = self.value_argument_list() else {
            return Vec::new();
        };
        self.tree
            .children_of_kind(list, SyntaxKind::ValueArgument)
            .map(|argument| ValueArgument::from_node(self.tree, argument))
            .collect()
    }

    /// Entries of the type-argument list, or empty if there is none.
    pub fn type_arguments(self) -> Vec<NodeId> {
        let Some(list) = self.type_argument_list() else {
            return Vec::new();
        };
        self.tree
            .children_of_kind(list, SyntaxKind::TypeProjection)
            .collect()
    }
}

/// The function literal a trailing argument position contributes, if any.
///
/// A literal contributes itself; a label-qualified literal contributes the
/// inner literal. Every other kind contributes nothing.
fn trailing_literal(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    match tree.kind(node) {
        SyntaxKind::FunctionLiteral => Some(node),
        SyntaxKind::LabeledExpr => LabeledExpr::cast(tree, node)?
            .labeled_expression()
            .filter(|&inner| tree.kind(inner) == SyntaxKind::FunctionLiteral),
        _ => None,
    }
}

/// Typed view of a [`SyntaxKind::LabeledExpr`] node.
#[derive(Copy, Clone)]
pub struct LabeledExpr<'t> {
    tree: &'t SyntaxTree,
    node: NodeId,
}

impl<'t> LabeledExpr<'t> {
    /// View `node` as a label-qualified expression, if it is one.
    pub fn cast(tree: &'t SyntaxTree, node: NodeId) -> Option<Self> {
        (tree.kind(node) == SyntaxKind::LabeledExpr).then_some(LabeledExpr { tree, node })
    }

    /// The label name without its trailing `@`.
    pub fn label(self) -> Option<&'t str> {
        let qualifier = self
            .tree
            .child_of_kind(self.node, SyntaxKind::LabelQualifier)?;
        let text = self.tree.text(qualifier);
        Some(text.strip_suffix('@').unwrap_or(text))
    }

    /// The expression the label applies to.
    pub fn labeled_expression(self) -> Option<NodeId> {
        self.tree
            .children(self.node)
            .iter()
            .copied()
            .find(|&child| self.tree.kind(child).is_expression())
    }
}

/// How a value argument is passed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgumentKind {
    Positional,
    /// `name = value`
    Named(Name),
    /// `*value`
    Spread,
}

/// One entry of a value-argument list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ValueArgument {
    /// The [`SyntaxKind::ValueArgument`] node.
    pub node: NodeId,
    /// The argument expression, absent only for malformed input.
    pub expression: Option<NodeId>,
    pub kind: ArgumentKind,
}

impl ValueArgument {
    fn from_node(tree: &SyntaxTree, node: NodeId) -> Self {
        let children = tree.children(node);
        let expression = children
            .iter()
            .copied()
            .find(|&child| tree.kind(child).is_expression());

        let is_spread = children
            .iter()
            .any(|&child| tree.kind(child) == SyntaxKind::Star);
        let named = children.windows(2).find_map(|pair| {
            (tree.kind(pair[0]) == SyntaxKind::Ident && tree.kind(pair[1]) == SyntaxKind::Eq)
                .then(|| tree.name(pair[0]))
        });

        let kind = match (is_spread, named) {
            (true, _) => ArgumentKind::Spread,
            (false, Some(name)) => ArgumentKind::Named(name),
            (false, None) => ArgumentKind::Positional,
        };
        ValueArgument {
            node,
            expression,
            kind,
        }
    }
}

/// The arguments of one call, split by where they are written.
///
/// Computed fresh on every [`resolve_arguments`] call; never cached here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallArguments {
    pub function_literals: SmallVec<[NodeId; 2]>,
    pub value_arguments: Vec<ValueArgument>,
    pub type_arguments: Vec<NodeId>,
}

/// Resolve the function-literal, value, and type arguments of a call.
///
/// Pure and total over any call node the parser produces: unrecognized
/// children are ignored and missing lists resolve to empty sequences.
pub fn resolve_arguments(call: CallExpr<'_>) -> CallArguments {
    CallArguments {
        function_literals: call.function_literal_arguments(),
        value_arguments: call.value_arguments(),
        type_arguments: call.type_arguments(),
    }
}
