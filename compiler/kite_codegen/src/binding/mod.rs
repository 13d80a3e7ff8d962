//! Codegen binding: side tables from syntax to descriptors, and the
//! anonymous-class identity assigned to each callable.
//!
//! Semantic analysis fills [`CodegenBinding`] with
//! [`bind`](CodegenBinding::bind) and
//! [`record_coroutine`](CodegenBinding::record_coroutine) before code
//! generation starts. During code generation the binding only grows its
//! class cache, which sits behind a lock so one binding can be shared by
//! readers on several threads.
//!
//! # Class naming
//!
//! A callable's class is named `<owner><sep><functions...><sep><n>`:
//!
//! - `<owner>` is the innermost enclosing class (or package path), or the
//!   class of the innermost enclosing function literal (for a coroutine
//!   body, the class of its suspend function)
//! - `<functions...>` are the named functions between that owner and the
//!   callable, outermost first
//! - `<n>` counts callables sharing the same prefix, starting at 1
//!
//! `main` in package `demo` containing one literal gives `demo$main$1`; a
//! literal inside that literal gives `demo$main$1$1`.

use kite_ir::{DescriptorId, DescriptorKind, DescriptorTable, Name};
use kite_syntax::NodeId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{CodegenError, CodegenOptions, InternalError};

/// Identity of a generated anonymous class.
///
/// Equal identities name the same class. The identity is stable for the
/// lifetime of the binding that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassIdentity {
    internal_name: Name,
    callable: DescriptorId,
}

impl ClassIdentity {
    /// Interned internal name, e.g. `demo/app/Outer$run$1`.
    #[inline]
    pub fn internal_name(self) -> Name {
        self.internal_name
    }

    /// The callable this class was generated for.
    #[inline]
    pub fn callable(self) -> DescriptorId {
        self.callable
    }
}

#[derive(Default)]
struct ClassCache {
    classes: FxHashMap<DescriptorId, ClassIdentity>,
    /// Next index per naming prefix.
    counters: FxHashMap<Name, u32>,
}

/// Side tables produced by semantic analysis, plus the class cache.
pub struct CodegenBinding<'d> {
    descriptors: &'d DescriptorTable,
    separator: char,
    nodes: FxHashMap<NodeId, DescriptorId>,
    /// Literal -> user-visible suspend function it implements.
    coroutine_originals: FxHashMap<DescriptorId, DescriptorId>,
    cache: RwLock<ClassCache>,
}

impl<'d> CodegenBinding<'d> {
    pub fn new(descriptors: &'d DescriptorTable, options: &CodegenOptions) -> Self {
        Self {
            descriptors,
            separator: options.class_name_separator,
            nodes: FxHashMap::default(),
            coroutine_originals: FxHashMap::default(),
            cache: RwLock::new(ClassCache::default()),
        }
    }

    /// The descriptor table this binding resolves against.
    #[inline]
    pub fn descriptors(&self) -> &'d DescriptorTable {
        self.descriptors
    }

    /// Bind a syntax node to the declaration it introduces or refers to.
    pub fn bind(&mut self, node: NodeId, descriptor: DescriptorId) {
        self.nodes.insert(node, descriptor);
    }

    /// The descriptor bound to `node`.
    #[inline]
    pub fn descriptor_for(&self, node: NodeId) -> Option<DescriptorId> {
        self.nodes.get(&node).copied()
    }

    /// Mark `literal` as the compiled body of the suspend function
    /// `original`.
    pub fn record_coroutine(&mut self, literal: DescriptorId, original: DescriptorId) {
        self.coroutine_originals.insert(literal, original);
    }

    /// The suspend function `literal` implements, if it is a coroutine body.
    #[inline]
    pub fn coroutine_original(&self, literal: DescriptorId) -> Option<DescriptorId> {
        self.coroutine_originals.get(&literal).copied()
    }

    /// Map a callable to the anonymous class generated for it.
    ///
    /// Total and deterministic for well-formed input: the same callable
    /// always maps to the same identity, and distinct callables never share
    /// one.
    pub fn anonymous_class_for_callable(
        &self,
        callable: DescriptorId,
    ) -> Result<ClassIdentity, CodegenError> {
        // Fast path: read lock only
        if let Some(&class) = self.cache.read().classes.get(&callable) {
            trace!(?callable, "anonymous class cache hit");
            return Ok(class);
        }

        let kind = self
            .descriptors
            .kind(callable)
            .ok_or(InternalError::UnknownDescriptor {
                descriptor: callable,
            })?;
        if !kind.is_callable() {
            return Err(InternalError::NotCallable {
                descriptor: callable,
            }
            .into());
        }

        // Computed before taking the write lock; may recurse for an
        // enclosing literal.
        let prefix = self.naming_prefix(callable)?;
        let interner = self.descriptors.interner();
        let prefix_name = interner.intern(&prefix);

        let mut cache = self.cache.write();
        // Slow path: another thread may have named it in the meantime
        if let Some(&class) = cache.classes.get(&callable) {
            return Ok(class);
        }

        let counter = cache.counters.entry(prefix_name).or_insert(0);
        *counter += 1;
        let internal_name = interner.intern(&format!("{prefix}{}{counter}", self.separator));

        let class = ClassIdentity {
            internal_name,
            callable,
        };
        cache.classes.insert(callable, class);

        debug!(
            ?callable,
            class = interner.lookup(internal_name),
            "assigned anonymous class"
        );
        Ok(class)
    }

    /// Internal name of a generated class.
    pub fn class_name(&self, class: ClassIdentity) -> &str {
        self.descriptors
            .interner()
            .lookup_static(class.internal_name)
    }

    /// Number of callables that have been assigned a class so far.
    pub fn assigned_classes(&self) -> usize {
        self.cache.read().classes.len()
    }

    /// Prefix shared by the classes of callables declared at the same spot.
    fn naming_prefix(&self, callable: DescriptorId) -> Result<String, CodegenError> {
        let mut functions: SmallVec<[&str; 4]> = SmallVec::new();

        for ancestor in self.descriptors.ancestors(callable) {
            let owner = match self.descriptors.kind(ancestor) {
                Some(DescriptorKind::Function { .. }) => {
                    functions.push(self.descriptors.name(ancestor));
                    continue;
                }
                Some(DescriptorKind::AnonymousFunction { .. }) => {
                    // A coroutine body compiles into its suspend function's class.
                    let compiled_as = self.coroutine_original(ancestor).unwrap_or(ancestor);
                    let enclosing = self.anonymous_class_for_callable(compiled_as)?;
                    self.class_name(enclosing).to_owned()
                }
                Some(DescriptorKind::Class | DescriptorKind::Package) => {
                    self.owner_internal_name(ancestor)
                }
                Some(DescriptorKind::Variable) | None => continue,
            };

            let mut prefix = owner;
            for function in functions.iter().rev() {
                prefix.push(self.separator);
                prefix.push_str(function);
            }
            return Ok(prefix);
        }

        Err(InternalError::UnmappableDescriptor {
            descriptor: callable,
        }
        .into())
    }

    /// Internal name of a class or package: the package path joined with
    /// `/`, then every other enclosing declaration joined with the
    /// separator.
    fn owner_internal_name(&self, owner: DescriptorId) -> String {
        let mut segments: SmallVec<[DescriptorId; 4]> = SmallVec::new();
        segments.push(owner);
        segments.extend(self.descriptors.ancestors(owner));

        let mut name = String::new();
        let mut after_package = false;
        for &segment in segments.iter().rev() {
            let is_package = self.descriptors.kind(segment) == Some(DescriptorKind::Package);
            if !name.is_empty() {
                name.push(if is_package || !after_package {
                    '/'
                } else {
                    self.separator
                });
            }
            if is_package {
                name.push_str(&self.descriptors.name(segment).replace('.', "/"));
            } else {
                name.push_str(self.descriptors.name(segment));
                after_package = true;
            }
        }
        name
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
