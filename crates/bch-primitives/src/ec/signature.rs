//! ECDSA signature value and its wire encodings.
//!
//! Supports DER encoding/decoding, the 65-byte compact (recoverable) form,
//! the transaction form (DER followed by a sighash byte) and low-S
//! canonicalization.

use crate::bn::{BigNumber, Endian};
use crate::ec::curve;
use crate::PrimitivesError;

/// Offset added to the recovery id in the compact header byte.
const COMPACT_HEADER_BASE: u8 = 27;

/// Header bit set in the compact form when the key is compressed.
const COMPACT_COMPRESSED_FLAG: u8 = 4;

/// An ECDSA signature with R and S components.
///
/// `recovery_id` is set by the signer (or by `from_compact`) and allows the
/// public key to be reconstructed. `sighash_type` is set when the signature
/// was parsed from, or is destined for, a transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The R component, in `(0, N)` for any signature produced here.
    pub r: BigNumber,
    /// The S component, `<= N/2` for any signature produced here.
    pub s: BigNumber,
    /// Recovery id in `0..=3`, if known.
    pub recovery_id: Option<u8>,
    /// Sighash type byte, if this signature belongs to a transaction input.
    pub sighash_type: Option<u8>,
}

impl Signature {
    /// Create a signature from raw R and S values.
    pub fn new(r: BigNumber, s: BigNumber) -> Self {
        Signature {
            r,
            s,
            recovery_id: None,
            sighash_type: None,
        }
    }

    /// Return a copy carrying the given sighash type.
    pub fn with_sighash_type(mut self, sighash_type: u8) -> Self {
        self.sighash_type = Some(sighash_type);
        self
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// Expected format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    /// Trailing bytes beyond the declared sequence length are ignored.
    ///
    /// # Returns
    /// `Ok(Signature)`, or `MalformedInput` if the structure is broken or
    /// either component is zero or not below `N`.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let malformed = |msg: &str| PrimitivesError::MalformedInput(format!("DER signature: {}", msg));

        if bytes.len() < 8 {
            return Err(malformed("too short"));
        }
        if bytes[0] != 0x30 {
            return Err(malformed("no header magic"));
        }
        let sig_len = bytes[1] as usize;
        if sig_len + 2 > bytes.len() || sig_len + 2 < 8 {
            return Err(malformed("bad length"));
        }
        let data = &bytes[..sig_len + 2];
        let mut idx = 2;

        if data[idx] != 0x02 {
            return Err(malformed("no 1st int marker"));
        }
        idx += 1;
        let r_len = data[idx] as usize;
        idx += 1;
        if r_len == 0 || idx + r_len > data.len() - 3 {
            return Err(malformed("bogus R length"));
        }
        let r_bytes = &data[idx..idx + r_len];
        idx += r_len;

        if data[idx] != 0x02 {
            return Err(malformed("no 2nd int marker"));
        }
        idx += 1;
        let s_len = data[idx] as usize;
        idx += 1;
        if s_len == 0 || idx + s_len > data.len() {
            return Err(malformed("bogus S length"));
        }
        let s_bytes = &data[idx..idx + s_len];

        if r_bytes[0] & 0x80 != 0 || s_bytes[0] & 0x80 != 0 {
            return Err(malformed("negative integer"));
        }

        let r = BigNumber::from_bytes(r_bytes, Endian::Big);
        let s = BigNumber::from_bytes(s_bytes, Endian::Big);
        check_component(&r, "R")?;
        check_component(&s, "S")?;
        Ok(Signature::new(r, s))
    }

    /// Serialize the signature in DER format.
    ///
    /// Components are encoded as they are; call `to_low_s` first if a
    /// canonical encoding of a foreign signature is needed.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = der_int(&self.r);
        let sb = der_int(&self.s);

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Parse a transaction signature: DER bytes followed by one sighash byte.
    pub fn from_tx_format(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let (sighash, der) = bytes
            .split_last()
            .ok_or_else(|| PrimitivesError::MalformedInput("empty transaction signature".to_string()))?;
        Ok(Signature::from_der(der)?.with_sighash_type(*sighash))
    }

    /// Serialize as DER followed by the sighash byte.
    ///
    /// # Returns
    /// The encoded bytes, or `InvalidState` if no sighash type is set.
    pub fn to_tx_format(&self) -> Result<Vec<u8>, PrimitivesError> {
        let sighash = self.sighash_type.ok_or_else(|| {
            PrimitivesError::InvalidState("signature has no sighash type".to_string())
        })?;
        let mut out = self.to_der();
        out.push(sighash);
        Ok(out)
    }

    /// Parse a 65-byte compact signature: `<header> <32-byte R> <32-byte S>`.
    ///
    /// The header is `27 + recovery_id`, plus 4 when the signing key was
    /// compressed.
    ///
    /// # Returns
    /// The signature together with the compression flag from the header.
    pub fn from_compact(bytes: &[u8]) -> Result<(Self, bool), PrimitivesError> {
        if bytes.len() != 65 {
            return Err(PrimitivesError::MalformedInput(format!(
                "compact signature must be 65 bytes, got {}",
                bytes.len()
            )));
        }
        let header = bytes[0]
            .checked_sub(COMPACT_HEADER_BASE)
            .ok_or(PrimitivesError::InvalidRecoveryId(bytes[0]))?;
        if header > 7 {
            return Err(PrimitivesError::InvalidRecoveryId(bytes[0]));
        }
        let compressed = header & COMPACT_COMPRESSED_FLAG != 0;
        let r = BigNumber::from_bytes(&bytes[1..33], Endian::Big);
        let s = BigNumber::from_bytes(&bytes[33..65], Endian::Big);
        check_component(&r, "R")?;
        check_component(&s, "S")?;
        let mut sig = Signature::new(r, s);
        sig.recovery_id = Some(header & 3);
        Ok((sig, compressed))
    }

    /// Serialize in the 65-byte compact form.
    ///
    /// # Returns
    /// The compact bytes, or `InvalidState` if no recovery id is set.
    pub fn to_compact(&self, compressed: bool) -> Result<[u8; 65], PrimitivesError> {
        let recovery_id = self.recovery_id.ok_or_else(|| {
            PrimitivesError::InvalidState("signature has no recovery id".to_string())
        })?;
        if recovery_id > 3 {
            return Err(PrimitivesError::InvalidRecoveryId(recovery_id));
        }
        let mut out = [0u8; 65];
        out[0] = COMPACT_HEADER_BASE
            + recovery_id
            + if compressed { COMPACT_COMPRESSED_FLAG } else { 0 };
        out[1..33].copy_from_slice(&self.r.to_bytes(32, Endian::Big)?);
        out[33..65].copy_from_slice(&self.s.to_bytes(32, Endian::Big)?);
        Ok(out)
    }

    /// True when `s <= N/2`.
    pub fn has_low_s(&self) -> bool {
        &self.s <= curve::half_n()
    }

    /// Return the low-S form of this signature, replacing `s` by `N - s`
    /// when it lies in the upper half. The recovery id parity flips with it.
    pub fn to_low_s(&self) -> Signature {
        if self.has_low_s() {
            return self.clone();
        }
        Signature {
            r: self.r.clone(),
            s: curve::n().sub(&self.s),
            recovery_id: self.recovery_id.map(|id| id ^ 1),
            sighash_type: self.sighash_type,
        }
    }
}

fn check_component(v: &BigNumber, name: &str) -> Result<(), PrimitivesError> {
    if v.is_zero() {
        return Err(PrimitivesError::MalformedInput(format!("signature {} is zero", name)));
    }
    if v >= curve::n() {
        return Err(PrimitivesError::MalformedInput(format!(
            "signature {} is >= curve order",
            name
        )));
    }
    Ok(())
}

/// Minimal DER integer body: big-endian magnitude with a 0x00 pad when
/// the high bit is set.
fn der_int(v: &BigNumber) -> Vec<u8> {
    let mag = v.to_bytes_minimal();
    if mag.is_empty() {
        return vec![0x00];
    }
    if mag[0] & 0x80 != 0 {
        let mut out = Vec::with_capacity(mag.len() + 1);
        out.push(0x00);
        out.extend_from_slice(&mag);
        out
    } else {
        mag
    }
}
