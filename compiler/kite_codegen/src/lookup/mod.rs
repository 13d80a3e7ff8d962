//! Local-variable lookup shared by the contexts of one function body.
//!
//! Every context built for a body (the function's own context and each
//! nested closure context) holds the same [`LookupId`]. The lookup records
//! which context declared each local and which locals each closure had to
//! capture to reach them.

use std::fmt;

use kite_ir::DescriptorId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{ClassIdentity, ContextId};

/// Index of a [`LocalLookup`] owned by a [`ContextTree`](crate::ContextTree).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct LookupId(u32);

impl LookupId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        LookupId(index)
    }

    /// Get the index into the tree's lookup storage.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LookupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LookupId({})", self.0)
    }
}

/// Declarations and captures of one function body.
#[derive(Clone, Debug, Default)]
pub struct LocalLookup {
    /// Variable -> context whose body declared it.
    declared: FxHashMap<DescriptorId, ContextId>,
    /// Closure context -> captured variables, in first-capture order.
    captures: FxHashMap<ContextId, Vec<DescriptorId>>,
}

impl LocalLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `variable` is declared by `context`.
    ///
    /// Redeclaring moves the variable to the newer context.
    pub fn declare(&mut self, context: ContextId, variable: DescriptorId) {
        self.declared.insert(variable, context);
    }

    /// The context that declared `variable`, if any.
    pub fn declaring_context(&self, variable: DescriptorId) -> Option<ContextId> {
        self.declared.get(&variable).copied()
    }

    /// Record that `closure` captures `variable`.
    ///
    /// Returns `true` if this is the first capture of `variable` by `closure`.
    pub fn record_capture(&mut self, closure: ContextId, variable: DescriptorId) -> bool {
        let captured = self.captures.entry(closure).or_default();
        if captured.contains(&variable) {
            return false;
        }
        captured.push(variable);
        true
    }

    /// Returns `true` if `closure` captures `variable`.
    pub fn is_captured(&self, closure: ContextId, variable: DescriptorId) -> bool {
        self.captures
            .get(&closure)
            .is_some_and(|vars| vars.contains(&variable))
    }

    /// Variables captured by `closure`, in first-capture order.
    pub fn captures(&self, closure: ContextId) -> &[DescriptorId] {
        self.captures.get(&closure).map_or(&[], Vec::as_slice)
    }

    /// Drop everything recorded for a discarded context.
    pub(crate) fn forget(&mut self, context: ContextId) {
        self.captures.remove(&context);
        self.declared.retain(|_, declared_in| *declared_in != context);
    }
}

/// Path from a use site to a local's declaring context.
///
/// Holds the anonymous class of every closure crossed on the way out,
/// innermost first. An empty chain means the local is used in the context
/// that declared it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureChain {
    hops: SmallVec<[ClassIdentity; 4]>,
}

impl CaptureChain {
    pub(crate) fn new(hops: SmallVec<[ClassIdentity; 4]>) -> Self {
        Self { hops }
    }

    /// Returns `true` if no closure boundary is crossed.
    #[inline]
    pub fn is_local(&self) -> bool {
        self.hops.is_empty()
    }

    /// Closure classes crossed, innermost first.
    pub fn hops(&self) -> &[ClassIdentity] {
        &self.hops
    }

    /// Number of closure boundaries crossed.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}
