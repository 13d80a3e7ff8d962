//! Codegen contexts for the Kite backend.
//!
//! This crate provides:
//!
//! - **Context tree** ([`ContextTree`], [`CodegenContext`]): the stack of
//!   declarations whose code is being generated, with closure contexts
//!   ([`ClosureContext`]) for function literals and coroutine bodies.
//!
//! - **Binding** ([`CodegenBinding`]): side tables from syntax nodes to
//!   descriptors, and the anonymous class ([`ClassIdentity`]) of every
//!   callable.
//!
//! - **Local lookup** ([`LocalLookup`], [`CaptureChain`]): which context
//!   declared each local and which closures capture it.
//!
//! - **Closure walker** ([`ClosureWalker`]): discovers function literals in
//!   a body, including the trailing literals of calls, and drives the
//!   context tree depth-first.
//!
//! # Crate Dependencies
//!
//! `kite_codegen` depends on `kite_ir` (for `DescriptorTable`, `Name`) and
//! `kite_syntax` (for `SyntaxTree`, `resolve_arguments`). Bytecode emission
//! lives elsewhere; this crate only decides where code goes.

mod binding;
mod context;
mod error;
mod lookup;
mod options;
mod owner_kind;
mod walker;

use std::sync::Once;

pub use binding::{ClassIdentity, CodegenBinding};
pub use context::{
    ClosureContext, ClosureKind, CodegenContext, ContextDescriptor, ContextId, ContextScope,
    ContextTree,
};
pub use error::{CodegenError, InternalError};
pub use lookup::{CaptureChain, LocalLookup, LookupId};
pub use options::CodegenOptions;
pub use owner_kind::OwnerKind;
pub use walker::{ClosureVisitor, ClosureWalker, EmittedClosure};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging.
///
/// Call this once at startup to enable tracing output. Set `RUST_LOG` to
/// control verbosity, e.g. `RUST_LOG=kite_codegen=debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
