//! The codegen context tree.
//!
//! A [`CodegenContext`] describes the declaration whose code is being
//! generated, what kind of owner emits it, the enclosing context, and the
//! local-variable lookup of the surrounding function body. Contexts live in
//! a [`ContextTree`] arena and refer to their parent by [`ContextId`]; a
//! parent is always allocated before its children, so parent chains are
//! acyclic and finite.
//!
//! The driver builds the tree depth-first: it pushes a context when it
//! enters a declaration or function literal and pops it when the body has
//! been emitted. Only the innermost live context can be popped.
//!
//! # Closure contexts
//!
//! [`ClosureContext`] is the context of a function literal. Its descriptor
//! is the anonymous class the literal compiles to, its owner kind is
//! always [`OwnerKind::Implementation`], and it records whether the literal
//! is the body of a coroutine:
//!
//! | Kind | `function_descriptor` | `coroutine_descriptor` | class from |
//! |------|-----------------------|------------------------|------------|
//! | plain | the literal | none | the literal |
//! | coroutine | the literal | the suspend function | the suspend function |

use std::fmt;

use kite_ir::{DescriptorId, DescriptorKind, DescriptorTable, Name};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
    CaptureChain, ClassIdentity, CodegenBinding, CodegenError, CodegenOptions, InternalError,
    LocalLookup, LookupId, OwnerKind,
};

/// Index into a [`ContextTree`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ContextId(u32);

impl ContextId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        ContextId(index)
    }

    /// Get the index into the tree.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.0)
    }
}

/// The declaration a context generates code for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextDescriptor {
    /// A class, package, or function from the descriptor table.
    Declaration(DescriptorId),
    /// The anonymous class generated for a callable.
    AnonymousClass(ClassIdentity),
}

/// Whether a closure is a plain function literal or a coroutine body.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClosureKind {
    Plain,
    /// The literal is the compiled body of the suspend function `original`.
    Coroutine { original: DescriptorId },
}

impl ClosureKind {
    #[inline]
    pub fn is_coroutine(self) -> bool {
        matches!(self, ClosureKind::Coroutine { .. })
    }
}

/// Context of a function literal compiled to an anonymous class.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClosureContext {
    function_descriptor: DescriptorId,
    kind: ClosureKind,
    class: ClassIdentity,
}

impl ClosureContext {
    /// The literal being compiled.
    #[inline]
    pub fn function_descriptor(&self) -> DescriptorId {
        self.function_descriptor
    }

    /// The user-visible suspend function, for coroutine bodies.
    #[inline]
    pub fn coroutine_descriptor(&self) -> Option<DescriptorId> {
        match self.kind {
            ClosureKind::Plain => None,
            ClosureKind::Coroutine { original } => Some(original),
        }
    }

    /// The declaration whose signature determines the closure's result
    /// type: the suspend function for coroutine bodies, else the literal.
    #[inline]
    pub fn return_type_descriptor(&self) -> DescriptorId {
        self.coroutine_descriptor()
            .unwrap_or(self.function_descriptor)
    }

    /// Declared result type of [`return_type_descriptor`](Self::return_type_descriptor).
    pub fn return_type(&self, descriptors: &DescriptorTable) -> Option<Name> {
        descriptors
            .get(self.return_type_descriptor())
            .and_then(|d| d.return_type)
    }

    #[inline]
    pub fn kind(&self) -> ClosureKind {
        self.kind
    }

    /// The anonymous class this closure compiles to.
    #[inline]
    pub fn class_identity(&self) -> ClassIdentity {
        self.class
    }
}

/// Variant-specific data of a context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextScope {
    /// A named class, package, or function.
    Declaration,
    Closure(ClosureContext),
}

/// One node of the context tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenContext {
    owner_kind: OwnerKind,
    descriptor: ContextDescriptor,
    parent: Option<ContextId>,
    local_lookup: LookupId,
    scope: ContextScope,
}

impl CodegenContext {
    #[inline]
    pub fn owner_kind(&self) -> OwnerKind {
        self.owner_kind
    }

    #[inline]
    pub fn context_descriptor(&self) -> ContextDescriptor {
        self.descriptor
    }

    /// The enclosing context; `None` only for roots.
    #[inline]
    pub fn parent_context(&self) -> Option<ContextId> {
        self.parent
    }

    #[inline]
    pub fn local_lookup(&self) -> LookupId {
        self.local_lookup
    }

    #[inline]
    pub fn scope(&self) -> ContextScope {
        self.scope
    }

    /// The closure data, if this is a closure context.
    #[inline]
    pub fn as_closure(&self) -> Option<&ClosureContext> {
        match &self.scope {
            ContextScope::Closure(closure) => Some(closure),
            ContextScope::Declaration => None,
        }
    }

    #[inline]
    pub fn is_closure(&self) -> bool {
        self.as_closure().is_some()
    }

    /// Human-readable label for debugging output.
    ///
    /// Closures render as `Closure: <class name>`; other contexts as
    /// `Context: <fully-qualified name>`.
    pub fn label(&self, binding: &CodegenBinding<'_>) -> String {
        match self.descriptor {
            ContextDescriptor::AnonymousClass(class) if self.is_closure() => {
                format!("Closure: {}", binding.class_name(class))
            }
            ContextDescriptor::AnonymousClass(class) => {
                format!("Context: {}", binding.class_name(class))
            }
            ContextDescriptor::Declaration(descriptor) => {
                format!("Context: {}", binding.descriptors().fq_name(descriptor))
            }
        }
    }
}

/// Arena of codegen contexts and the local lookups they share.
pub struct ContextTree {
    /// Live contexts; the last one is the innermost.
    contexts: Vec<CodegenContext>,
    lookups: Vec<LocalLookup>,
    verify_on_pop: bool,
}

impl Default for ContextTree {
    /// A tree configured from the process environment.
    fn default() -> Self {
        Self::new(&CodegenOptions::from_env())
    }
}

impl ContextTree {
    pub fn new(options: &CodegenOptions) -> Self {
        Self {
            contexts: Vec::new(),
            lookups: Vec::new(),
            verify_on_pop: options.verify_tree_on_pop,
        }
    }

    /// Allocate an empty local lookup for a new function body.
    pub fn new_local_lookup(&mut self) -> LookupId {
        let id = LookupId::new(to_u32(self.lookups.len(), "local lookups"));
        self.lookups.push(LocalLookup::new());
        id
    }

    pub fn local_lookup(&self, lookup: LookupId) -> Result<&LocalLookup, CodegenError> {
        self.lookups
            .get(lookup.index())
            .ok_or_else(|| InternalError::UnknownLookup { lookup }.into())
    }

    pub fn local_lookup_mut(&mut self, lookup: LookupId) -> Result<&mut LocalLookup, CodegenError> {
        self.lookups
            .get_mut(lookup.index())
            .ok_or_else(|| InternalError::UnknownLookup { lookup }.into())
    }

    /// Push the context of a named declaration (class, package, or
    /// function). Roots pass `parent: None`.
    pub fn new_declaration_context(
        &mut self,
        owner_kind: OwnerKind,
        descriptor: DescriptorId,
        parent: Option<ContextId>,
        lookup: LookupId,
    ) -> Result<ContextId, CodegenError> {
        self.check_links(parent, lookup)?;
        let id = self.push(CodegenContext {
            owner_kind,
            descriptor: ContextDescriptor::Declaration(descriptor),
            parent,
            local_lookup: lookup,
            scope: ContextScope::Declaration,
        });
        debug!(?id, ?descriptor, %owner_kind, ?parent, "entered declaration context");
        Ok(id)
    }

    /// Push the context of a plain function literal.
    ///
    /// With `parent: None` the closure is a root, as for a literal compiled
    /// on its own.
    pub fn new_closure_context(
        &mut self,
        binding: &CodegenBinding<'_>,
        function_descriptor: DescriptorId,
        parent: Option<ContextId>,
        lookup: LookupId,
    ) -> Result<ContextId, CodegenError> {
        self.push_closure(
            binding,
            function_descriptor,
            ClosureKind::Plain,
            parent,
            lookup,
        )
    }

    /// Push the context of a literal compiled as the body of the suspend
    /// function `original`. The anonymous class is derived from `original`.
    pub fn new_coroutine_closure_context(
        &mut self,
        binding: &CodegenBinding<'_>,
        function_descriptor: DescriptorId,
        original: DescriptorId,
        parent: Option<ContextId>,
        lookup: LookupId,
    ) -> Result<ContextId, CodegenError> {
        self.push_closure(
            binding,
            function_descriptor,
            ClosureKind::Coroutine { original },
            parent,
            lookup,
        )
    }

    fn push_closure(
        &mut self,
        binding: &CodegenBinding<'_>,
        function_descriptor: DescriptorId,
        kind: ClosureKind,
        parent: Option<ContextId>,
        lookup: LookupId,
    ) -> Result<ContextId, CodegenError> {
        self.check_links(parent, lookup)?;
        check_suspension(binding.descriptors(), function_descriptor, kind)?;

        let callable = match kind {
            ClosureKind::Plain => function_descriptor,
            ClosureKind::Coroutine { original } => original,
        };
        let class = binding.anonymous_class_for_callable(callable)?;

        let id = self.push(CodegenContext {
            owner_kind: OwnerKind::Implementation,
            descriptor: ContextDescriptor::AnonymousClass(class),
            parent,
            local_lookup: lookup,
            scope: ContextScope::Closure(ClosureContext {
                function_descriptor,
                kind,
                class,
            }),
        });
        debug!(
            ?id,
            ?function_descriptor,
            ?kind,
            ?parent,
            class = binding.class_name(class),
            "entered closure context"
        );
        Ok(id)
    }

    fn check_links(&self, parent: Option<ContextId>, lookup: LookupId) -> Result<(), CodegenError> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        self.local_lookup(lookup)?;
        Ok(())
    }

    fn push(&mut self, context: CodegenContext) -> ContextId {
        let id = ContextId::new(to_u32(self.contexts.len(), "codegen contexts"));
        self.contexts.push(context);
        id
    }

    pub fn get(&self, context: ContextId) -> Result<&CodegenContext, CodegenError> {
        self.contexts
            .get(context.index())
            .ok_or_else(|| InternalError::UnknownContext { context }.into())
    }

    /// The enclosing context of `context`.
    pub fn parent_context(&self, context: ContextId) -> Result<Option<ContextId>, CodegenError> {
        Ok(self.get(context)?.parent)
    }

    /// The innermost live context.
    pub fn innermost(&self) -> Option<ContextId> {
        self.contexts
            .len()
            .checked_sub(1)
            .map(|last| ContextId::new(to_u32(last, "codegen contexts")))
    }

    /// Iterate from `context` outwards to its root, `context` first.
    ///
    /// Stops early at a dangling parent id; [`verify`](Self::verify)
    /// reports those.
    pub fn ancestors(&self, context: ContextId) -> impl Iterator<Item = ContextId> + '_ {
        std::iter::successors(Some(context), move |&c| {
            self.contexts.get(c.index()).and_then(|ctx| ctx.parent)
        })
        .take_while(move |c| c.index() < self.contexts.len())
        .take(self.contexts.len())
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Record that `context` declares the local `variable`.
    pub fn declare_local(
        &mut self,
        context: ContextId,
        variable: DescriptorId,
    ) -> Result<(), CodegenError> {
        let lookup = self.get(context)?.local_lookup;
        self.local_lookup_mut(lookup)?.declare(context, variable);
        trace!(?context, ?variable, "declared local");
        Ok(())
    }

    /// Resolve a use of `variable` inside `context`.
    ///
    /// Returns `None` when the variable is not a local of the surrounding
    /// body (a field or global, say). Otherwise returns the closure classes
    /// crossed between the use and the declaration, and records the
    /// variable as captured by each of those closures.
    pub fn resolve_local(
        &mut self,
        context: ContextId,
        variable: DescriptorId,
    ) -> Result<Option<CaptureChain>, CodegenError> {
        let lookup_id = self.get(context)?.local_lookup;
        let Some(declaring) = self.local_lookup(lookup_id)?.declaring_context(variable) else {
            return Ok(None);
        };

        let mut hops = SmallVec::new();
        let mut crossed: SmallVec<[ContextId; 4]> = SmallVec::new();
        let mut current = context;

        for _ in 0..=self.contexts.len() {
            if current == declaring {
                let lookup = self.local_lookup_mut(lookup_id)?;
                for &closure in &crossed {
                    lookup.record_capture(closure, variable);
                }
                trace!(?context, ?variable, hops = crossed.len(), "resolved local");
                return Ok(Some(CaptureChain::new(hops)));
            }

            let ctx = self.get(current)?;
            if let Some(closure) = ctx.as_closure() {
                hops.push(closure.class_identity());
                crossed.push(current);
            }
            match ctx.parent {
                Some(parent) => current = parent,
                // Declared in a context that does not enclose the use.
                None => return Ok(None),
            }
        }

        Err(InternalError::ParentCycle { context }.into())
    }

    /// Discard `context` once its body has been emitted.
    ///
    /// `context` must be the innermost live context. Its declarations and
    /// captures are dropped from its local lookup, and its id is handed to
    /// the next context pushed.
    pub fn pop(&mut self, context: ContextId) -> Result<CodegenContext, CodegenError> {
        let innermost = self
            .innermost()
            .ok_or(InternalError::UnknownContext { context })?;
        if innermost != context {
            if context.index() < self.contexts.len() {
                return Err(InternalError::NotInnermost { context, innermost }.into());
            }
            return Err(InternalError::UnknownContext { context }.into());
        }

        let popped = self
            .contexts
            .pop()
            .ok_or(InternalError::UnknownContext { context })?;
        if let Some(lookup) = self.lookups.get_mut(popped.local_lookup.index()) {
            lookup.forget(context);
        }
        trace!(?context, "left context");

        if self.verify_on_pop {
            self.verify()?;
        }
        Ok(popped)
    }

    /// Check every parent chain: each parent must be live and allocated
    /// before its child, and each lookup must belong to this tree.
    pub fn verify(&self) -> Result<(), CodegenError> {
        for (index, ctx) in self.contexts.iter().enumerate() {
            let context = ContextId::new(to_u32(index, "codegen contexts"));
            self.local_lookup(ctx.local_lookup)?;

            if let Some(parent) = ctx.parent {
                if parent.index() >= self.contexts.len() {
                    return Err(InternalError::UnknownContext { context: parent }.into());
                }
                if parent.index() >= index {
                    return Err(InternalError::ParentAfterChild { context, parent }.into());
                }
            }
        }
        Ok(())
    }
}

/// A closure is a coroutine exactly when its body is a suspend literal
/// compiled for a suspend function.
fn check_suspension(
    descriptors: &DescriptorTable,
    function_descriptor: DescriptorId,
    kind: ClosureKind,
) -> Result<(), CodegenError> {
    match kind {
        ClosureKind::Plain => {
            let suspend_literal = DescriptorKind::AnonymousFunction { is_suspend: true };
            if descriptors.kind(function_descriptor) == Some(suspend_literal) {
                return Err(InternalError::SuspendLiteralWithoutCoroutine {
                    descriptor: function_descriptor,
                }
                .into());
            }
        }
        ClosureKind::Coroutine { original } => {
            let suspend_function = DescriptorKind::Function { is_suspend: true };
            if descriptors.kind(original) != Some(suspend_function) {
                return Err(InternalError::NotSuspendFunction {
                    descriptor: original,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Convert a length to `u32`, panicking with context on overflow.
fn to_u32(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("too many {what}: {len} exceeds u32::MAX"))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
