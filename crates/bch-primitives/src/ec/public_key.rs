//! secp256k1 public key.
//!
//! A public key is a validated curve point plus the encoding preference it
//! was created with. Parsing always checks curve membership.

use std::fmt;

use crate::ec::curve::Point;
use crate::ec::signature::Signature;
use crate::ec::{AddressDerivable, KeyMaterial};
use crate::ecdsa::{self, VerifyRequest};
use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes (prefix + 32 byte x-coordinate).
pub const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes (prefix + 32 byte x + 32 byte y).
pub const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
///
/// Never mutated after construction. Equality compares the underlying
/// point, not the encoding preference.
#[derive(Clone, Debug)]
pub struct PublicKey {
    point: Point,
    compressed: bool,
    /// Uncompressed SEC1 encoding, computed once at construction.
    encoded: [u8; UNCOMPRESSED_LEN],
}

impl PublicKey {
    /// Wrap a curve point.
    ///
    /// # Arguments
    /// * `point` - The public point; validated before use.
    /// * `compressed` - Whether `to_bytes` should emit the 33-byte form.
    ///
    /// # Returns
    /// `Ok(PublicKey)`, or `InvalidPoint` for infinity or off-curve points.
    pub fn from_point(point: Point, compressed: bool) -> Result<Self, PrimitivesError> {
        point.validate()?;
        let sec1 = point.to_sec1(false)?;
        let mut encoded = [0u8; UNCOMPRESSED_LEN];
        encoded.copy_from_slice(&sec1);
        Ok(PublicKey {
            point,
            compressed,
            encoded,
        })
    }

    /// Create a PublicKey from SEC1 encoded bytes.
    ///
    /// Accepts both compressed (33-byte) and uncompressed (65-byte) formats.
    /// The compression preference follows the input encoding.
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded public key bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the bytes don't represent a valid point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey(
                "pubkey bytes are empty".to_string(),
            ));
        }
        let point = Point::from_sec1(bytes)?;
        Self::from_point(point, bytes.len() == COMPRESSED_LEN)
    }

    /// Create a PublicKey from a hex-encoded SEC1 string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// The underlying curve point.
    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Serialize the public key in compressed SEC1 format (33 bytes).
    ///
    /// The first byte is 0x02 (even Y) or 0x03 (odd Y), followed by the 32-byte X coordinate.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let mut out = [0u8; COMPRESSED_LEN];
        out[0] = 0x02 | (self.encoded[UNCOMPRESSED_LEN - 1] & 1);
        out[1..].copy_from_slice(&self.encoded[1..33]);
        out
    }

    /// Serialize the public key in uncompressed SEC1 format (65 bytes).
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        self.encoded
    }

    /// Serialize in the encoding this key was created with.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.compressed {
            self.to_compressed().to_vec()
        } else {
            self.to_uncompressed().to_vec()
        }
    }

    /// Hex of `to_bytes`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Hash160 of the serialized key, as committed to by P2PKH outputs.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Derive an address using the supplied encoder.
    ///
    /// Address text formats live outside this crate; the encoder is handed
    /// the key's Hash160 and builds whatever representation it owns.
    pub fn to_address<E: AddressDerivable>(&self, encoder: &E) -> E::Address {
        encoder.address_from_hash160(&self.hash160())
    }

    /// Verify a big-endian 32-byte digest against this key.
    ///
    /// # Returns
    /// `true` if the signature is valid for this digest and public key.
    pub fn verify(&self, digest: &[u8], sig: &Signature) -> bool {
        ecdsa::verify(&VerifyRequest::new(digest, sig, self)).valid
    }
}

impl KeyMaterial for PublicKey {
    fn public_key(&self) -> PublicKey {
        self.clone()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
