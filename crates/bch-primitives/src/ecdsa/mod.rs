//! ECDSA signing, verification and public key recovery over secp256k1.
//!
//! Requests are immutable structs built once per call. Nonces follow
//! RFC 6979 (HMAC-SHA256) with a bad-r/s counter: when a candidate nonce
//! yields `r = 0` or `s = 0`, the counter is bumped and the HMAC ratchet
//! advances to the next candidate.

use log::debug;

use crate::bn::{BigNumber, Endian};
use crate::ec::curve::{self, Point};
use crate::ec::{KeyMaterial, PrivateKey, PublicKey, Signature};
use crate::hash::sha256_hmac_parts;
use crate::PrimitivesError;

/// Digest width accepted by the engine.
pub const DIGEST_LEN: usize = 32;

/// A signing request.
#[derive(Clone, Copy, Debug)]
pub struct SignRequest<'a> {
    /// Message digest, exactly 32 bytes.
    pub digest: &'a [u8],
    /// The signing key. Signing fails with `InvalidState` when absent.
    pub private_key: Option<&'a PrivateKey>,
    /// Byte order of `digest`; little-endian digests are reversed before use.
    pub endian: Endian,
}

impl<'a> SignRequest<'a> {
    /// A big-endian request for `digest` under `private_key`.
    pub fn new(digest: &'a [u8], private_key: &'a PrivateKey) -> Self {
        SignRequest {
            digest,
            private_key: Some(private_key),
            endian: Endian::Big,
        }
    }

    /// The same request with a different digest byte order.
    pub fn with_endian(self, endian: Endian) -> Self {
        SignRequest { endian, ..self }
    }
}

/// A verification request.
#[derive(Clone, Copy, Debug)]
pub struct VerifyRequest<'a> {
    pub digest: &'a [u8],
    pub signature: &'a Signature,
    pub public_key: &'a PublicKey,
    pub endian: Endian,
}

impl<'a> VerifyRequest<'a> {
    /// A big-endian request checking `signature` over `digest`.
    pub fn new(digest: &'a [u8], signature: &'a Signature, public_key: &'a PublicKey) -> Self {
        VerifyRequest {
            digest,
            signature,
            public_key,
            endian: Endian::Big,
        }
    }

    /// The same request with a different digest byte order.
    pub fn with_endian(self, endian: Endian) -> Self {
        VerifyRequest { endian, ..self }
    }
}

/// Why a signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyFailure {
    #[error("digest is not 32 bytes")]
    MalformedDigest,
    #[error("r is not in (0, N)")]
    ROutOfRange,
    #[error("s is not in (0, N)")]
    SOutOfRange,
    #[error("u1·G + u2·Q is the point at infinity")]
    PointAtInfinity,
    #[error("x coordinate of u1·G + u2·Q does not match r")]
    RMismatch,
}

/// Outcome of [`verify`]: a verdict plus the reason when it is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub failure: Option<VerifyFailure>,
}

impl Verification {
    fn accepted() -> Self {
        Verification {
            valid: true,
            failure: None,
        }
    }

    fn rejected(reason: VerifyFailure) -> Self {
        debug!("signature rejected: {}", reason);
        Verification {
            valid: false,
            failure: Some(reason),
        }
    }
}

/// Normalize a digest to big-endian order.
fn digest_be(digest: &[u8], endian: Endian) -> Option<[u8; DIGEST_LEN]> {
    if digest.len() != DIGEST_LEN {
        return None;
    }
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(digest);
    if endian == Endian::Little {
        out.reverse();
    }
    Some(out)
}

fn in_scalar_range(v: &BigNumber) -> bool {
    !v.is_zero() && !v.is_negative() && v < curve::n()
}

/// Derive the RFC 6979 nonce for private scalar `d` and digest `digest`.
///
/// # Arguments
/// * `d` - Private scalar in `[1, N)`.
/// * `digest` - Big-endian 32-byte message digest.
/// * `badrs` - Number of candidates already rejected by the signer.
///
/// # Returns
/// A nonce in `(0, N)`. Candidates outside that range are skipped by
/// continuing the ratchet, as are the first `badrs` candidates.
pub fn deterministic_k(
    d: &BigNumber,
    digest: &[u8; DIGEST_LEN],
    badrs: u32,
) -> Result<BigNumber, PrimitivesError> {
    let n = curve::n();
    let x = d.to_bytes(32, Endian::Big)?;
    let h1 = BigNumber::from_bytes(digest, Endian::Big)
        .umod(n)
        .to_bytes(32, Endian::Big)?;

    let mut v = [0x01u8; 32];
    let mut k = [0x00u8; 32];
    k = sha256_hmac_parts(&k, &[&v, &[0x00], &x, &h1]);
    v = sha256_hmac_parts(&k, &[&v]);
    k = sha256_hmac_parts(&k, &[&v, &[0x01], &x, &h1]);
    v = sha256_hmac_parts(&k, &[&v]);
    v = sha256_hmac_parts(&k, &[&v]);
    let mut t = BigNumber::from_bytes(&v, Endian::Big);

    let mut i = 0;
    while i < badrs || !in_scalar_range(&t) {
        k = sha256_hmac_parts(&k, &[&v, &[0x00]]);
        v = sha256_hmac_parts(&k, &[&v]);
        v = sha256_hmac_parts(&k, &[&v]);
        t = BigNumber::from_bytes(&v, Endian::Big);
        i += 1;
    }
    Ok(t)
}

/// Produce a deterministic low-S signature.
///
/// # Returns
/// A signature with `r, s ∈ (0, N)`, `s <= N/2` and the recovery id set.
/// Fails with `InvalidState` if the digest is not 32 bytes or no private
/// key is supplied.
pub fn sign(req: &SignRequest<'_>) -> Result<Signature, PrimitivesError> {
    let digest = digest_be(req.digest, req.endian).ok_or_else(|| {
        PrimitivesError::InvalidState(format!(
            "digest must be {} bytes, got {}",
            DIGEST_LEN,
            req.digest.len()
        ))
    })?;
    let key = req
        .private_key
        .ok_or_else(|| PrimitivesError::InvalidState("no private key to sign with".to_string()))?;

    let n = curve::n();
    let d = key.scalar();
    let e = BigNumber::from_bytes(&digest, Endian::Big);

    let mut badrs = 0u32;
    loop {
        let k = deterministic_k(&d, &digest, badrs)?;
        let big_r = curve::g().mul(&k);
        let (rx, ry) = match &big_r {
            Point::Affine { x, y } => (x, y),
            Point::Infinity => {
                badrs += 1;
                continue;
            }
        };
        let r = rx.umod(n);
        let s = k.invm(n)?.mul_mod(&e.add(&d.mul(&r)), n);
        if r.is_zero() || s.is_zero() {
            badrs += 1;
            continue;
        }

        let mut recovery_id = ry.is_odd() as u8;
        if rx >= n {
            recovery_id |= 2;
        }
        let mut sig = Signature::new(r, s);
        sig.recovery_id = Some(recovery_id);
        return Ok(sig.to_low_s());
    }
}

/// Verify a signature.
///
/// Never fails: malformed-but-parseable input is reported through
/// [`Verification::failure`]. High-S signatures are accepted here.
pub fn verify(req: &VerifyRequest<'_>) -> Verification {
    let digest = match digest_be(req.digest, req.endian) {
        Some(d) => d,
        None => return Verification::rejected(VerifyFailure::MalformedDigest),
    };
    let sig = req.signature;
    if !in_scalar_range(&sig.r) {
        return Verification::rejected(VerifyFailure::ROutOfRange);
    }
    if !in_scalar_range(&sig.s) {
        return Verification::rejected(VerifyFailure::SOutOfRange);
    }

    let n = curve::n();
    let e = BigNumber::from_bytes(&digest, Endian::Big);
    let w = match sig.s.invm(n) {
        Ok(w) => w,
        Err(_) => return Verification::rejected(VerifyFailure::SOutOfRange),
    };
    let u1 = e.mul_mod(&w, n);
    let u2 = sig.r.mul_mod(&w, n);

    match Point::mul_add(&u1, &u2, req.public_key.point()) {
        Point::Infinity => Verification::rejected(VerifyFailure::PointAtInfinity),
        Point::Affine { x, .. } if x.umod(n) == sig.r => Verification::accepted(),
        Point::Affine { .. } => Verification::rejected(VerifyFailure::RMismatch),
    }
}

/// Reconstruct the public key that produced `sig` over `digest`.
///
/// Bit 0 of `recovery_id` selects the parity of `R.y`; bit 1 selects
/// `R.x = r + N` instead of `R.x = r`. The recovered key is compressed.
///
/// # Returns
/// The public key, `InvalidRecoveryId` for ids above 3, `MalformedInput`
/// for a bad digest or out-of-range signature, or `InvalidPoint` when no
/// valid `R` exists for this id.
pub fn recover_public_key(
    digest: &[u8],
    sig: &Signature,
    recovery_id: u8,
    endian: Endian,
) -> Result<PublicKey, PrimitivesError> {
    if recovery_id > 3 {
        return Err(PrimitivesError::InvalidRecoveryId(recovery_id));
    }
    let digest = digest_be(digest, endian).ok_or_else(|| {
        PrimitivesError::MalformedInput(format!("digest must be {} bytes", DIGEST_LEN))
    })?;
    if !in_scalar_range(&sig.r) || !in_scalar_range(&sig.s) {
        return Err(PrimitivesError::MalformedInput(
            "signature components must be in (0, N)".to_string(),
        ));
    }

    let n = curve::n();
    let x = if recovery_id & 2 != 0 {
        sig.r.add(n)
    } else {
        sig.r.clone()
    };
    let big_r = Point::from_x(recovery_id & 1 == 1, &x)?;
    if !big_r.mul(n).is_infinity() {
        return Err(PrimitivesError::InvalidPoint("N·R is not infinity".to_string()));
    }

    let e = BigNumber::from_bytes(&digest, Endian::Big);
    let r_inv = sig.r.invm(n)?;
    // Q = r⁻¹·(s·R − e·G) = (−e·r⁻¹)·G + (s·r⁻¹)·R
    let u1 = e.neg().mul_mod(&r_inv, n);
    let u2 = sig.s.mul_mod(&r_inv, n);
    let q = Point::mul_add(&u1, &u2, &big_r);
    PublicKey::from_point(q, true)
}

/// Find the recovery id that reconstructs `key` from `sig` over `digest`.
///
/// Each candidate that fails to recover is logged and skipped.
///
/// # Returns
/// The first matching id, or `NoValidRecoveryFactor` after all four fail.
pub fn calculate_recovery_id<K: KeyMaterial + ?Sized>(
    digest: &[u8],
    sig: &Signature,
    key: &K,
    endian: Endian,
) -> Result<u8, PrimitivesError> {
    let expected = key.public_key();
    for id in 0..4u8 {
        match recover_public_key(digest, sig, id, endian) {
            Ok(candidate) if candidate == expected => return Ok(id),
            Ok(_) => debug!("recovery id {} yields a different key", id),
            Err(e) => debug!("recovery id {} rejected: {}", id, e),
        }
    }
    Err(PrimitivesError::NoValidRecoveryFactor)
}
