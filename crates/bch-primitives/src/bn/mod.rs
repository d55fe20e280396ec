//! Arbitrary-precision integers for curve and scalar arithmetic.
//!
//! `BigNumber` wraps a signed `num_bigint::BigInt`. Every modular operation
//! takes its modulus explicitly, so the caller decides whether a value lives
//! in the scalar field (mod N) or the base field (mod P).

use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::PrimitivesError;

/// Byte order for big-number and digest serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Most significant byte first (network order for scalars).
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

/// An arbitrary-precision signed integer with modular helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigNumber(BigInt);

impl BigNumber {
    /// The value zero.
    pub fn zero() -> Self {
        BigNumber(BigInt::zero())
    }

    /// The value one.
    pub fn one() -> Self {
        BigNumber(BigInt::one())
    }

    /// Interpret `bytes` as an unsigned magnitude in the given byte order.
    pub fn from_bytes(bytes: &[u8], endian: Endian) -> Self {
        let n = match endian {
            Endian::Big => BigInt::from_bytes_be(Sign::Plus, bytes),
            Endian::Little => BigInt::from_bytes_le(Sign::Plus, bytes),
        };
        BigNumber(n)
    }

    /// Parse an unsigned big-endian hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Ok(Self::from_bytes(&bytes, Endian::Big))
    }

    /// Serialize the value as exactly `size` bytes, zero-padded.
    ///
    /// # Arguments
    /// * `size` - Output width in bytes.
    /// * `endian` - Byte order of the output.
    ///
    /// # Returns
    /// The padded bytes, or `Overflow` if the value is negative or needs
    /// more than `size` bytes.
    pub fn to_bytes(&self, size: usize, endian: Endian) -> Result<Vec<u8>, PrimitivesError> {
        if self.0.is_negative() {
            return Err(PrimitivesError::Overflow(size));
        }
        let (_, mag) = self.0.to_bytes_be();
        let mag: &[u8] = if self.0.is_zero() { &[] } else { &mag };
        if mag.len() > size {
            return Err(PrimitivesError::Overflow(size));
        }
        let mut out = vec![0u8; size];
        out[size - mag.len()..].copy_from_slice(mag);
        if endian == Endian::Little {
            out.reverse();
        }
        Ok(out)
    }

    /// Serialize as a fixed 32-byte array, the width of a secp256k1 scalar.
    pub fn to_bytes32(&self, endian: Endian) -> Result<[u8; 32], PrimitivesError> {
        let v = self.to_bytes(32, endian)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&v);
        Ok(out)
    }

    /// Minimal big-endian magnitude bytes (empty for zero).
    pub fn to_bytes_minimal(&self) -> Vec<u8> {
        if self.0.is_zero() {
            return Vec::new();
        }
        self.0.magnitude().to_bytes_be()
    }

    pub fn add(&self, other: &BigNumber) -> BigNumber {
        BigNumber(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &BigNumber) -> BigNumber {
        BigNumber(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &BigNumber) -> BigNumber {
        BigNumber(&self.0 * &other.0)
    }

    pub fn neg(&self) -> BigNumber {
        BigNumber(-&self.0)
    }

    /// Reduce into `[0, m)`. A negative value wraps to its positive residue.
    pub fn umod(&self, m: &BigNumber) -> BigNumber {
        BigNumber(self.0.mod_floor(&m.0))
    }

    /// `(self + other) mod m`
    pub fn add_mod(&self, other: &BigNumber, m: &BigNumber) -> BigNumber {
        BigNumber((&self.0 + &other.0).mod_floor(&m.0))
    }

    /// `(self - other) mod m`, always non-negative.
    pub fn sub_mod(&self, other: &BigNumber, m: &BigNumber) -> BigNumber {
        BigNumber((&self.0 - &other.0).mod_floor(&m.0))
    }

    /// `(self * other) mod m`
    pub fn mul_mod(&self, other: &BigNumber, m: &BigNumber) -> BigNumber {
        BigNumber((&self.0 * &other.0).mod_floor(&m.0))
    }

    /// `self^exp mod m` for a non-negative exponent.
    pub fn pow_mod(&self, exp: &BigNumber, m: &BigNumber) -> BigNumber {
        BigNumber(self.0.mod_floor(&m.0).modpow(&exp.0, &m.0))
    }

    /// Modular inverse of `self` with respect to `m`.
    ///
    /// # Returns
    /// `x` in `[0, m)` with `self * x ≡ 1 (mod m)`, or `DivisionByZero` when
    /// `self ≡ 0 (mod m)` or shares a factor with `m`.
    pub fn invm(&self, m: &BigNumber) -> Result<BigNumber, PrimitivesError> {
        let a = self.0.mod_floor(&m.0);
        if a.is_zero() {
            return Err(PrimitivesError::DivisionByZero);
        }
        let egcd = a.extended_gcd(&m.0);
        if !egcd.gcd.is_one() {
            return Err(PrimitivesError::DivisionByZero);
        }
        Ok(BigNumber(egcd.x.mod_floor(&m.0)))
    }

    /// Compare absolute magnitudes, ignoring sign.
    pub fn ucmp(&self, other: &BigNumber) -> Ordering {
        self.0.magnitude().cmp(other.0.magnitude())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_odd(&self) -> bool {
        self.0.is_odd()
    }

    /// Number of significant bits in the magnitude.
    pub fn bit_len(&self) -> u64 {
        self.0.bits()
    }

    /// Test bit `i` of the magnitude (bit 0 is least significant).
    pub fn bit(&self, i: u64) -> bool {
        self.0.magnitude().bit(i)
    }

    /// Shift right by `n` bits.
    pub fn shr(&self, n: usize) -> BigNumber {
        BigNumber(&self.0 >> n)
    }

    /// Borrow the underlying `BigInt`.
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }
}

impl From<u64> for BigNumber {
    fn from(v: u64) -> Self {
        BigNumber(BigInt::from(v))
    }
}

impl From<i64> for BigNumber {
    fn from(v: i64) -> Self {
        BigNumber(BigInt::from(v))
    }
}

impl From<BigInt> for BigNumber {
    fn from(v: BigInt) -> Self {
        BigNumber(v)
    }
}

impl fmt::Display for BigNumber {
    /// Lowercase hex, with a leading `-` for negative values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_negative() {
            write!(f, "-{:x}", self.0.magnitude())
        } else {
            write!(f, "{:x}", self.0.magnitude())
        }
    }
}
