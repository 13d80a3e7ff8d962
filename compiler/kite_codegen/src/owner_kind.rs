//! Owner kinds of generated classes.

use std::fmt;

/// What a generated class or member represents.
///
/// Drives signature and accessor rules elsewhere in the backend; the context
/// tree only carries it as a tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    /// A package scope.
    Package,
    /// A concrete implementation class. Every closure class has this kind.
    Implementation,
    /// The holder of an interface's default method bodies.
    DefaultImpls,
    /// A synthetic class collecting a package's top-level declarations.
    PackageFacade,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKind::Package => write!(f, "package"),
            OwnerKind::Implementation => write!(f, "implementation"),
            OwnerKind::DefaultImpls => write!(f, "default-impls"),
            OwnerKind::PackageFacade => write!(f, "package-facade"),
        }
    }
}
