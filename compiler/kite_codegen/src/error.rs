//! Errors raised while building the codegen context tree.
//!
//! Every failure here is an internal-consistency error: it means an earlier
//! pass produced a malformed descriptor graph or the driver broke the
//! depth-first discipline. None of them is a user diagnostic, and none is
//! recoverable locally; they abort compilation of the unit.

use kite_ir::DescriptorId;
use kite_syntax::NodeId;

use crate::{ContextId, LookupId};

/// Error channel for the code generator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    /// A compiler bug, reported distinctly from user-facing diagnostics.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CodegenError {
    /// Returns `true` for internal-consistency errors.
    pub fn is_internal(&self) -> bool {
        matches!(self, CodegenError::Internal(_))
    }
}

/// An invariant violation detected by the context tree or binding layer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("internal compiler error: {descriptor:?} has no enclosing class or package")]
    UnmappableDescriptor { descriptor: DescriptorId },

    #[error("internal compiler error: {descriptor:?} is not a function or function literal")]
    NotCallable { descriptor: DescriptorId },

    #[error("internal compiler error: {descriptor:?} is not in the descriptor table")]
    UnknownDescriptor { descriptor: DescriptorId },

    #[error("internal compiler error: suspend literal {descriptor:?} compiled as a plain closure")]
    SuspendLiteralWithoutCoroutine { descriptor: DescriptorId },

    #[error("internal compiler error: coroutine original {descriptor:?} is not a suspend function")]
    NotSuspendFunction { descriptor: DescriptorId },

    #[error("internal compiler error: function literal {node:?} has no descriptor binding")]
    UnboundLiteral { node: NodeId },

    #[error("internal compiler error: {context:?} is not a live context")]
    UnknownContext { context: ContextId },

    #[error("internal compiler error: {lookup:?} is not a local lookup of this tree")]
    UnknownLookup { lookup: LookupId },

    #[error("internal compiler error: parent chain of {context:?} does not terminate")]
    ParentCycle { context: ContextId },

    #[error("internal compiler error: {context:?} was built before its parent {parent:?}")]
    ParentAfterChild {
        context: ContextId,
        parent: ContextId,
    },

    #[error(
        "internal compiler error: cannot discard {context:?} while {innermost:?} is still live"
    )]
    NotInnermost {
        context: ContextId,
        innermost: ContextId,
    },
}
