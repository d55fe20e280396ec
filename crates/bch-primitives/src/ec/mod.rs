/// Elliptic curve cryptography on secp256k1.
///
/// Provides the curve point engine, private keys, public keys and the
/// ECDSA signature value with its encodings.

pub mod curve;
pub mod private_key;
pub mod public_key;
pub mod signature;

pub use curve::Point;
pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;

/// Anything that controls, or is, a secp256k1 public key.
///
/// Lets callers accept a private key or a bare public key wherever only the
/// public half is needed (locking scripts, recovery-id search).
pub trait KeyMaterial {
    /// The public key this material corresponds to.
    fn public_key(&self) -> PublicKey;
}

/// An address format that can be derived from a public key hash.
///
/// Implemented by the address encoders, which live outside this crate, and
/// passed to [`PublicKey::to_address`] at the call site.
pub trait AddressDerivable {
    /// The address representation this encoder produces.
    type Address;

    /// Build an address from the Hash160 of a serialized public key.
    fn address_from_hash160(&self, hash: &[u8; 20]) -> Self::Address;
}
