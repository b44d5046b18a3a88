//! Shared foundational types used across the weft place-and-route crates.
//!
//! Provides interned identifiers for fabric wire and pin names, and 128-bit
//! content fingerprints used to compare configurations across runs.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;

pub use hash::{ContentHash, ContentHasher};
pub use ident::{Ident, Interner};
