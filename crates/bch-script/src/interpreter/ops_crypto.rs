//! Hashing and signature-checking operations for the script interpreter.

use log::debug;

use bch_primitives::ec::{PublicKey, Signature};
use bch_primitives::hash;

use crate::{Script, ScriptError};

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::*;
use super::thread::Thread;

const SIGHASH_FORKID: u8 = 0x40;
const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Largest DER signature body without the sighash byte.
const MAX_DER_SIG_LEN: usize = 72;
/// Smallest DER signature body.
const MIN_DER_SIG_LEN: usize = 8;

/// The digest produced by one of the hashing opcodes.
pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop()?;
        let digest = match hash_type {
            HashType::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashType::Sha1 => hash::sha1(&buf).to_vec(),
            HashType::Sha256 => hash::sha256(&buf).to_vec(),
            HashType::Hash160 => hash::hash160(&buf).to_vec(),
            HashType::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push(digest);
        Ok(())
    }

    /// The part of the running script after the last executed
    /// OP_CODESEPARATOR.
    pub(crate) fn sub_script(&self) -> Result<Script, InterpreterError> {
        unparse(&self.scripts[self.script_idx][self.last_code_sep..])
    }

    /// Script code committed to by `full_sig`. Legacy signatures get
    /// themselves and every OP_CODESEPARATOR stripped out first.
    fn script_code_for(&self, base: &Script, full_sig: &[u8]) -> Result<Script, InterpreterError> {
        if self.uses_fork_id(full_sig) {
            return Ok(base.clone());
        }
        base.find_and_delete(full_sig)
            .and_then(|s| s.remove_codeseparators())
            .map_err(script_error)
    }

    fn uses_fork_id(&self, full_sig: &[u8]) -> bool {
        self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID)
            && full_sig.last().is_some_and(|t| t & SIGHASH_FORKID != 0)
    }

    /// Ask the transaction context whether `full_sig` signs the spend.
    ///
    /// An empty signature is false without consulting the context. Errors
    /// raised while hashing count as a failed check.
    fn check_tx_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
    ) -> Result<bool, InterpreterError> {
        if full_sig.is_empty() {
            return Ok(false);
        }
        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for signature check",
            )
        })?;
        match ctx.verify_signature(full_sig, pub_key, script_code, self.input_idx, self.flags) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                debug!("signature check for input {} failed: {}", self.input_idx, e);
                Ok(false)
            }
        }
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pub_key = self.dstack.peek(0)?;
        let full_sig = self.dstack.peek(1)?;

        self.check_tx_signature_encoding(&full_sig)?;
        self.check_pub_key_encoding(&pub_key)?;

        let valid = if full_sig.is_empty() {
            false
        } else {
            let script_code = self.script_code_for(&self.sub_script()?, &full_sig)?;
            self.check_tx_signature(&full_sig, &pub_key, &script_code)?
        };

        if !valid && self.has_flag(ScriptFlags::NULL_FAIL) && !full_sig.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig",
            ));
        }

        self.dstack.drop_top(2)?;
        self.dstack.push_bool(valid);
        Ok(())
    }

    pub(crate) fn op_checksigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
    }

    /// OP_CHECKMULTISIG.
    ///
    /// Stack layout, top first: key count, keys, signature count,
    /// signatures, dummy. Signatures must appear in the same order as the
    /// keys they match; each key is tried at most once.
    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.dstack.peek_int(0)?.value();
        if num_keys < 0 || num_keys as usize > self.cfg.max_pub_keys_per_multisig {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "number of pubkeys {} outside 0..={}",
                    num_keys, self.cfg.max_pub_keys_per_multisig
                ),
            ));
        }
        let num_keys = num_keys as usize;

        self.num_ops += num_keys;
        if self.num_ops > self.cfg.max_ops {
            return Err(InterpreterError::new(
                InterpreterErrorCode::OpCountExceeded,
                format!("exceeded max operation limit of {}", self.cfg.max_ops),
            ));
        }

        let keys_start = 1;
        let num_sigs = self.dstack.peek_int(keys_start + num_keys)?.value();
        if num_sigs < 0 || num_sigs as usize > num_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of signatures {} outside 0..={}", num_sigs, num_keys),
            ));
        }
        let num_sigs = num_sigs as usize;

        let sigs_start = keys_start + num_keys + 1;
        let pub_keys = (0..num_keys)
            .map(|k| self.dstack.peek(keys_start + k))
            .collect::<Result<Vec<_>, _>>()?;
        let signatures = (0..num_sigs)
            .map(|k| self.dstack.peek(sigs_start + k))
            .collect::<Result<Vec<_>, _>>()?;

        // Legacy signatures are removed from the script code up front so
        // that no signature can commit to another one.
        let mut base = self.sub_script()?;
        for sig in &signatures {
            if !self.uses_fork_id(sig) {
                base = base.find_and_delete(sig).map_err(script_error)?;
            }
        }

        let mut success = true;
        let mut sig_idx = 0usize;
        let mut key_idx = 0usize;
        let mut remaining_sigs = num_sigs;
        let mut remaining_keys = num_keys;
        while success && remaining_sigs > 0 {
            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[key_idx];

            self.check_tx_signature_encoding(sig)?;
            self.check_pub_key_encoding(pub_key)?;

            let ok = !sig.is_empty() && {
                let script_code = self.script_code_for(&base, sig)?;
                self.check_tx_signature(sig, pub_key, &script_code)?
            };
            if ok {
                sig_idx += 1;
                remaining_sigs -= 1;
            }
            key_idx += 1;
            remaining_keys -= 1;

            if remaining_sigs > remaining_keys {
                success = false;
            }
        }

        if !success
            && self.has_flag(ScriptFlags::NULL_FAIL)
            && signatures.iter().any(|s| !s.is_empty())
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "not all signatures empty on failed checkmultisig",
            ));
        }

        self.dstack.drop_top(sigs_start + num_sigs)?;

        // Historical off-by-one: one extra element is consumed.
        let dummy = self.dstack.pop()?;
        if self.has_flag(ScriptFlags::NULL_DUMMY) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy argument has length {} instead of 0", dummy.len()),
            ));
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
    }

    /// OP_CHECKDATASIG and OP_CHECKDATASIGVERIFY: `<sig> <msg> <pubkey>`,
    /// with the signature over SHA-256 of the message and no sighash byte.
    pub(crate) fn op_checkdatasig(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let pub_key = self.dstack.peek(0)?;
        let message = self.dstack.peek(1)?;
        let sig = self.dstack.peek(2)?;

        self.check_signature_encoding(&sig)?;
        self.check_pub_key_encoding(&pub_key)?;

        let valid = !sig.is_empty() && verify_data_signature(&sig, &message, &pub_key);

        if !valid && self.has_flag(ScriptFlags::NULL_FAIL) && !sig.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checkdatasig",
            ));
        }

        self.dstack.drop_top(3)?;
        self.dstack.push_bool(valid);

        if pop.opcode == crate::opcodes::OP_CHECKDATASIGVERIFY {
            return self.abstract_verify(pop, InterpreterErrorCode::CheckDataSigVerify);
        }
        Ok(())
    }

    /// Encoding rules for a signature with a trailing sighash byte.
    pub(crate) fn check_tx_signature_encoding(&self, full_sig: &[u8]) -> Result<(), InterpreterError> {
        let Some((&hash_type, der)) = full_sig.split_last() else {
            return Ok(());
        };
        self.check_signature_encoding(der)?;
        if self.has_flag(ScriptFlags::STRICT_ENCODING) {
            self.check_hash_type_encoding(hash_type)?;
        }
        Ok(())
    }

    pub(crate) fn check_hash_type_encoding(&self, hash_type: u8) -> Result<(), InterpreterError> {
        let base = hash_type & !(SIGHASH_FORKID | SIGHASH_ANYONECANPAY);
        if !(1..=3).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("invalid hash type 0x{:x}", hash_type),
            ));
        }

        let uses_fork_id = hash_type & SIGHASH_FORKID != 0;
        let fork_id_enabled = self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID);
        if uses_fork_id != fork_id_enabled {
            return Err(InterpreterError::new(
                InterpreterErrorCode::IllegalForkID,
                if uses_fork_id {
                    "fork id sighash set without flag"
                } else {
                    "fork id sighash required but not set"
                },
            ));
        }
        Ok(())
    }

    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::STRICT_ENCODING) {
            return Ok(());
        }
        match pub_key {
            [0x02 | 0x03, ..] if pub_key.len() == 33 => Ok(()),
            [0x04, ..] if pub_key.len() == 65 => Ok(()),
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                "unsupported public key type",
            )),
        }
    }

    /// Strict DER and low-S rules for a bare signature (no sighash byte).
    pub(crate) fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        if sig.is_empty() {
            return Ok(());
        }
        if self.has_any(&[
            ScriptFlags::DER_SIGNATURES,
            ScriptFlags::LOW_S,
            ScriptFlags::STRICT_ENCODING,
        ]) {
            check_der_encoding(sig)?;
        }
        if self.has_flag(ScriptFlags::LOW_S) {
            // Out-of-range R or S values are left to signature verification.
            if !has_low_s(sig) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::SigHighS,
                    "signature is not canonical due to unnecessarily high S value",
                ));
            }
        }
        Ok(())
    }
}

fn script_error(e: ScriptError) -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::MalformedPush, e.to_string())
}

fn der_error(reason: &str) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::SigDer,
        format!("malformed signature: {}", reason),
    )
}

/// Strict DER layout: `0x30 len 0x02 rlen R 0x02 slen S`, with both
/// integers positive and minimally padded, and nothing trailing.
pub(crate) fn check_der_encoding(sig: &[u8]) -> Result<(), InterpreterError> {
    let len = sig.len();
    if len < MIN_DER_SIG_LEN {
        return Err(der_error("too short"));
    }
    if len > MAX_DER_SIG_LEN {
        return Err(der_error("too long"));
    }
    if sig[0] != 0x30 {
        return Err(der_error("wrong sequence marker"));
    }
    if sig[1] as usize != len - 2 {
        return Err(der_error("bad length"));
    }

    let r_len = sig[3] as usize;
    if 5 + r_len >= len {
        return Err(der_error("S length missing"));
    }
    let s_len = sig[5 + r_len] as usize;
    if r_len + s_len + 6 != len {
        return Err(der_error("invalid S length"));
    }

    if sig[2] != 0x02 {
        return Err(der_error("R integer marker missing"));
    }
    if r_len == 0 {
        return Err(der_error("R length is zero"));
    }
    if sig[4] & 0x80 != 0 {
        return Err(der_error("R is negative"));
    }
    if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return Err(der_error("R value has too much padding"));
    }

    let s_off = 6 + r_len;
    if sig[4 + r_len] != 0x02 {
        return Err(der_error("S integer marker missing"));
    }
    if s_len == 0 {
        return Err(der_error("S length is zero"));
    }
    if sig[s_off] & 0x80 != 0 {
        return Err(der_error("S is negative"));
    }
    if s_len > 1 && sig[s_off] == 0x00 && sig[s_off + 1] & 0x80 == 0 {
        return Err(der_error("S value has too much padding"));
    }
    Ok(())
}

/// Half the secp256k1 group order, big-endian.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Compare the S integer of a DER-encoded signature against half the
/// order without decoding it as a scalar. Expects a layout that passed
/// [`check_der_encoding`]; anything shorter reads as not low.
fn has_low_s(sig: &[u8]) -> bool {
    let Some(&r_len) = sig.get(3) else {
        return false;
    };
    let s_off = 6 + r_len as usize;
    let Some(s) = sig
        .get(s_off - 1)
        .and_then(|&s_len| sig.get(s_off..s_off + s_len as usize))
    else {
        return false;
    };
    let leading_zeros = s.iter().take_while(|&&b| b == 0).count();
    let magnitude = &s[leading_zeros..];
    match magnitude.len() {
        n if n < HALF_ORDER.len() => true,
        n if n > HALF_ORDER.len() => false,
        _ => magnitude <= &HALF_ORDER[..],
    }
}

fn verify_data_signature(sig: &[u8], message: &[u8], pub_key: &[u8]) -> bool {
    let (Ok(sig), Ok(key)) = (Signature::from_der(sig), PublicKey::from_bytes(pub_key)) else {
        return false;
    };
    key.verify(&hash::sha256(message), &sig)
}
