/// Bitcoin Cash cryptographic primitives.
///
/// This crate provides the foundational building blocks for signing and
/// script validation:
/// - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160, HMAC)
/// - Arbitrary-precision modular arithmetic
/// - The secp256k1 point engine, keys and signature encodings
/// - Deterministic ECDSA with public key recovery
/// - Variable-length integer and byte buffer helpers

pub mod bn;
pub mod ec;
pub mod ecdsa;
pub mod hash;
pub mod util;

mod error;
pub use error::PrimitivesError;
