//! Kite syntax - read-only syntax trees and call-shape queries.
//!
//! The parser is an external collaborator; this crate owns the flat tree it
//! produces and the queries later phases run over it.
//!
//! - [`SyntaxTree`] - struct-of-arrays node storage with child and sibling
//!   navigation, built through [`SyntaxTreeBuilder`]
//! - [`SyntaxKind`] - the closed set of node kinds
//! - [`CallExpr`] / [`resolve_arguments`] - which trailing arguments of a
//!   call are function literals, and which are value or type arguments

mod call;
mod kind;
mod node_id;
mod tree;

pub use call::{resolve_arguments, ArgumentKind, CallArguments, CallExpr, LabeledExpr, ValueArgument};
pub use kind::SyntaxKind;
pub use node_id::NodeId;
pub use tree::{SyntaxTree, SyntaxTreeBuilder};
