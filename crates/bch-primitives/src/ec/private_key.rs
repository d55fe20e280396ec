//! secp256k1 private key.
//!
//! Holds a scalar in `[1, N)`. Signing goes through the deterministic
//! ECDSA engine, so no randomness is consumed after key generation.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::bn::{BigNumber, Endian};
use crate::ec::curve;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::ec::KeyMaterial;
use crate::ecdsa::{self, SignRequest};
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// A secp256k1 private key.
///
/// `Debug` output never includes the secret scalar.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    bytes: [u8; PRIVATE_KEY_BYTES_LEN],
    compressed: bool,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    pub fn new() -> Self {
        let mut bytes = [0u8; PRIVATE_KEY_BYTES_LEN];
        loop {
            OsRng.fill_bytes(&mut bytes);
            if let Ok(key) = Self::from_bytes(&bytes) {
                return key;
            }
        }
    }

    /// Create a private key from a raw 32-byte big-endian scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte slice representing the private key scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the scalar is in `[1, N)`, or `InvalidPrivateKey`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let d = BigNumber::from_bytes(bytes, Endian::Big);
        if d.is_zero() {
            return Err(PrimitivesError::InvalidPrivateKey("scalar is zero".to_string()));
        }
        if &d >= curve::n() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "scalar is not below the curve order".to_string(),
            ));
        }
        let mut out = [0u8; PRIVATE_KEY_BYTES_LEN];
        out.copy_from_slice(bytes);
        Ok(PrivateKey {
            bytes: out,
            compressed: true,
        })
    }

    /// Create a private key from a hexadecimal string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Return a copy whose public key serializes uncompressed.
    pub fn uncompressed(mut self) -> Self {
        self.compressed = false;
        self
    }

    /// Serialize the private key as a 32-byte big-endian array.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// The secret scalar `d`.
    pub fn scalar(&self) -> BigNumber {
        BigNumber::from_bytes(&self.bytes, Endian::Big)
    }

    /// Derive the corresponding public key, `d · G`.
    pub fn pub_key(&self) -> PublicKey {
        let point = curve::g().mul(&self.scalar());
        // d is in [1, N), so d·G is a finite point on the curve.
        match PublicKey::from_point(point, self.compressed) {
            Ok(pk) => pk,
            Err(_) => unreachable!("d·G is on the curve for d in [1, N)"),
        }
    }

    /// Sign a big-endian 32-byte digest with RFC 6979 nonces.
    ///
    /// # Returns
    /// A low-S signature with its recovery id set.
    pub fn sign(&self, digest: &[u8]) -> Result<Signature, PrimitivesError> {
        ecdsa::sign(&SignRequest::new(digest, self))
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMaterial for PrivateKey {
    fn public_key(&self) -> PublicKey {
        self.pub_key()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priv_keys() {
        let key_bytes: [u8; 32] = [
            0xea, 0xf0, 0x2c, 0xa3, 0x48, 0xc5, 0x24, 0xe6, 0x39, 0x26, 0x55, 0xba, 0x4d, 0x29,
            0x60, 0x3c, 0xd1, 0xa7, 0x34, 0x7d, 0x9d, 0x65, 0xcf, 0xe9, 0x3c, 0xe1, 0xeb, 0xff,
            0xdc, 0xa2, 0x26, 0x94,
        ];
        let priv_key = PrivateKey::from_bytes(&key_bytes).unwrap();
        let pub_key = priv_key.pub_key();

        let reparsed = PublicKey::from_bytes(&pub_key.to_uncompressed()).unwrap();
        assert_eq!(reparsed, pub_key);
        assert_eq!(priv_key.to_bytes(), key_bytes);
    }

    #[test]
    fn test_generator_key() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let key = PrivateKey::from_bytes(&one).unwrap();
        assert_eq!(
            key.pub_key().to_hex(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(key.clone().uncompressed().pub_key().to_bytes().len(), 65);
    }

    #[test]
    fn test_private_key_out_of_range() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        let n_bytes = curve::n().to_bytes(32, Endian::Big).unwrap();
        assert!(PrivateKey::from_bytes(&n_bytes).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_private_key_from_invalid_hex() {
        assert!(PrivateKey::from_hex("").is_err());
        assert!(PrivateKey::from_hex("0").is_err());
        assert!(PrivateKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_hex_round_trip() {
        let key = PrivateKey::new();
        let again = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, again);
    }

    #[test]
    fn test_debug_hides_scalar() {
        let key = PrivateKey::new();
        let dbg = format!("{:?}", key);
        assert!(!dbg.contains(&key.to_hex()));
    }
}
