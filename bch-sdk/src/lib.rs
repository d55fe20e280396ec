#![deny(missing_docs)]

//! Bitcoin Cash SDK - signing and script validation core.
//!
//! Re-exports the component crates for convenient single-crate usage:
//! cryptographic primitives, scripts with their interpreter, and
//! transactions with signature hashing and spend verification.

pub use bch_primitives as primitives;
pub use bch_script as script;
pub use bch_transaction as transaction;
