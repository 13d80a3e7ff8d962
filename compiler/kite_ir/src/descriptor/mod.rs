//! Declaration descriptors.
//!
//! Semantic analysis resolves every declaration to a [`Descriptor`] stored in
//! a [`DescriptorTable`]. Later phases refer to declarations by
//! [`DescriptorId`], which is also the descriptor's identity: two ids are the
//! same declaration exactly when they compare equal.
//!
//! Descriptors form a forest through their `containing` links. A function
//! literal's containing declaration is the function (or literal) whose body
//! it appears in; a top-level function's is its class or package.

use std::fmt;

use crate::{Name, SharedInterner};

/// Index into a [`DescriptorTable`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct DescriptorId(u32);

impl DescriptorId {
    /// Create a new `DescriptorId`.
    #[inline]
    pub const fn new(index: u32) -> Self {
        DescriptorId(index)
    }

    /// Get the index into the table.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorId({})", self.0)
    }
}

/// What kind of declaration a descriptor describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// A package. Its name may contain `.` separators.
    Package,
    /// A named class, object, or interface.
    Class,
    /// A named function.
    Function { is_suspend: bool },
    /// A function literal.
    AnonymousFunction { is_suspend: bool },
    /// A local variable or parameter.
    Variable,
}

impl DescriptorKind {
    /// Returns `true` for named functions and function literals.
    #[inline]
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            DescriptorKind::Function { .. } | DescriptorKind::AnonymousFunction { .. }
        )
    }
}

/// A resolved declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub name: Name,
    pub kind: DescriptorKind,
    pub containing: Option<DescriptorId>,
    /// Declared result type, for callables that spell one out.
    pub return_type: Option<Name>,
    /// Dotted path from the outermost containing declaration.
    pub fq_name: Name,
}

/// Storage for every descriptor of a compilation.
///
/// Descriptors are append-only: once pushed, a descriptor never changes, so
/// ids stay valid for the lifetime of the table.
pub struct DescriptorTable {
    interner: SharedInterner,
    descriptors: Vec<Descriptor>,
}

impl DescriptorTable {
    /// Create an empty table interning names into `interner`.
    pub fn new(interner: SharedInterner) -> Self {
        Self {
            interner,
            descriptors: Vec::new(),
        }
    }

    /// Access the interner names are stored in.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Declare a package.
    pub fn package(&mut self, name: &str) -> DescriptorId {
        self.push(name, DescriptorKind::Package, None, None)
    }

    /// Declare a class inside `containing`.
    pub fn class(&mut self, name: &str, containing: DescriptorId) -> DescriptorId {
        self.push(name, DescriptorKind::Class, Some(containing), None)
    }

    /// Declare a named function inside `containing`.
    pub fn function(
        &mut self,
        name: &str,
        containing: DescriptorId,
        return_type: Option<&str>,
    ) -> DescriptorId {
        self.push(
            name,
            DescriptorKind::Function { is_suspend: false },
            Some(containing),
            return_type,
        )
    }

    /// Declare a suspendable named function inside `containing`.
    pub fn suspend_function(
        &mut self,
        name: &str,
        containing: DescriptorId,
        return_type: Option<&str>,
    ) -> DescriptorId {
        self.push(
            name,
            DescriptorKind::Function { is_suspend: true },
            Some(containing),
            return_type,
        )
    }

    /// Declare a function literal inside `containing`.
    ///
    /// `containing` is `None` only for malformed input; later phases treat
    /// such a literal as unmappable.
    pub fn anonymous_function(
        &mut self,
        containing: Option<DescriptorId>,
        is_suspend: bool,
        return_type: Option<&str>,
    ) -> DescriptorId {
        self.push(
            "<anonymous>",
            DescriptorKind::AnonymousFunction { is_suspend },
            containing,
            return_type,
        )
    }

    /// Declare a local variable or parameter inside `containing`.
    pub fn variable(&mut self, name: &str, containing: DescriptorId) -> DescriptorId {
        self.push(name, DescriptorKind::Variable, Some(containing), None)
    }

    /// Append a descriptor and return its id.
    ///
    /// # Panics
    /// Panics if `containing` is not an id of this table, or if the table
    /// exceeds `u32` capacity.
    pub fn push(
        &mut self,
        name: &str,
        kind: DescriptorKind,
        containing: Option<DescriptorId>,
        return_type: Option<&str>,
    ) -> DescriptorId {
        let fq_name = match containing {
            Some(parent) => {
                let parent_fq = self.interner.lookup(self.descriptors[parent.index()].fq_name);
                self.interner.intern(&format!("{parent_fq}.{name}"))
            }
            None => self.interner.intern(name),
        };
        let id = DescriptorId::new(
            u32::try_from(self.descriptors.len())
                .unwrap_or_else(|_| panic!("descriptor table exceeded u32 capacity")),
        );
        self.descriptors.push(Descriptor {
            name: self.interner.intern(name),
            kind,
            containing,
            return_type: return_type.map(|ty| self.interner.intern(ty)),
            fq_name,
        });
        id
    }

    /// Get a descriptor, or `None` for an id from another table.
    #[inline]
    pub fn get(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(id.index())
    }

    /// Get the kind of a descriptor.
    #[inline]
    pub fn kind(&self, id: DescriptorId) -> Option<DescriptorKind> {
        self.get(id).map(|d| d.kind)
    }

    /// Get the containing declaration of a descriptor.
    #[inline]
    pub fn containing(&self, id: DescriptorId) -> Option<DescriptorId> {
        self.get(id).and_then(|d| d.containing)
    }

    /// Iterate over the containing declarations of `id`, innermost first.
    ///
    /// Stops after `len()` steps so a corrupted table cannot loop forever.
    pub fn ancestors(&self, id: DescriptorId) -> impl Iterator<Item = DescriptorId> + '_ {
        std::iter::successors(self.containing(id), move |&d| self.containing(d))
            .take(self.descriptors.len())
    }

    /// The dotted path of a descriptor, e.g. `demo.Outer.run.<anonymous>`.
    pub fn fq_name(&self, id: DescriptorId) -> &str {
        self.get(id)
            .map_or("<unknown>", |d| self.interner.lookup_static(d.fq_name))
    }

    /// The simple name of a descriptor.
    pub fn name(&self, id: DescriptorId) -> &str {
        self.get(id)
            .map_or("<unknown>", |d| self.interner.lookup_static(d.name))
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if no descriptor has been declared.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
