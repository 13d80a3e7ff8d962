//! Kite IR - shared identifiers for the Kite compiler backend.
//!
//! This crate contains the data every later phase agrees on:
//! - Names for interned identifiers
//! - Declaration descriptors produced by semantic analysis
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → `Name(u32)`, declarations → `DescriptorId(u32)`
//! - **Identity is the index**: two descriptors are the same declaration
//!   exactly when their ids are equal, so ids can key memo tables directly.

mod descriptor;
mod interner;
mod name;

pub use descriptor::{Descriptor, DescriptorId, DescriptorKind, DescriptorTable};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
