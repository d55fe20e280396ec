//! Signature hash computation for transaction signing.
//!
//! Computes the hash that is signed by ECDSA to authorize spending a
//! transaction input. Two digest algorithms exist on Bitcoin Cash:
//!
//! * the legacy algorithm, which serializes a modified copy of the whole
//!   transaction;
//! * the replay-protected algorithm (BIP143 layout), selected by the
//!   `SIGHASH_FORKID` bit, which also commits to the spent value.
//!
//! Neither function mutates the transaction. Each builds a scratch preimage,
//! hashes it and drops it.
//!
//! See <https://github.com/bitcoincashorg/bitcoincash.org/blob/master/spec/replay-protected-sighash.md>

use bch_primitives::hash::sha256d;
use bch_primitives::util::{ByteWriter, VarInt};

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag selecting the BIP143-style digest.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The standard Bitcoin Cash sighash type: ALL | FORKID.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Value field written for the blanked outputs of a legacy SINGLE digest.
const NULL_OUTPUT_VALUE: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Compute the signature hash, choosing the algorithm from the type byte.
///
/// Types carrying `SIGHASH_FORKID` use [`forkid_signature_hash`]; all
/// others use [`legacy_signature_hash`], which ignores `satoshis`.
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `script_code`  - The script being satisfied (subscript).
/// * `sighash_type` - The combined sighash flags.
/// * `satoshis`     - The value of the output being spent.
///
/// # Returns
/// A 32-byte double-SHA256 hash to be signed by ECDSA.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    if sighash_type & SIGHASH_FORKID != 0 {
        forkid_signature_hash(tx, input_index, script_code, sighash_type, satoshis)
    } else {
        legacy_signature_hash(tx, input_index, script_code, sighash_type)
    }
}

fn check_input_index(tx: &Transaction, input_index: usize) -> Result<(), TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }
    Ok(())
}

fn check_single_output(
    tx: &Transaction,
    input_index: usize,
    sighash_type: u32,
) -> Result<(), TransactionError> {
    if sighash_type & SIGHASH_MASK == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        return Err(TransactionError::InvalidSighashType(format!(
            "SIGHASH_SINGLE for input {} but tx has {} outputs",
            input_index,
            tx.outputs.len()
        )));
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the legacy (pre-fork) signature hash for a given input.
///
/// # Returns
/// `sha256d` of [`calc_legacy_preimage`], or `InvalidSighashType` when
/// `SIGHASH_SINGLE` is used on an input with no matching output.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_legacy_preimage(tx, input_index, script_code, sighash_type)?;
    Ok(sha256d(&preimage))
}

/// Build the legacy preimage: a re-serialization of the transaction.
///
/// * The signing input carries `script_code`; every other input an empty
///   script. With `ANYONECANPAY` only the signing input is written.
/// * For NONE and SINGLE the other inputs' sequence numbers are zeroed.
///   ALL keeps them.
/// * NONE writes no outputs. SINGLE writes `input_index + 1` outputs, the
///   earlier ones blanked to value `-1` with an empty script. ALL writes
///   every output.
/// * The sighash type follows the lock time as a 4-byte LE integer.
pub fn calc_legacy_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    check_input_index(tx, input_index)?;
    check_single_output(tx, input_index, sighash_type)?;

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let zero_other_sequences = base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE;

    let mut writer = ByteWriter::with_capacity(256 + script_code.len());
    writer.write_u32_le(tx.version);

    if anyone_can_pay {
        let input = &tx.inputs[input_index];
        writer.write_varint(VarInt(1));
        input.write_outpoint(&mut writer);
        writer.write_var_bytes(script_code);
        writer.write_u32_le(input.sequence_number);
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for (i, input) in tx.inputs.iter().enumerate() {
            input.write_outpoint(&mut writer);
            if i == input_index {
                writer.write_var_bytes(script_code);
                writer.write_u32_le(input.sequence_number);
            } else {
                writer.write_var_bytes(&[]);
                let sequence = if zero_other_sequences { 0 } else { input.sequence_number };
                writer.write_u32_le(sequence);
            }
        }
    }

    match base_type {
        SIGHASH_NONE => writer.write_varint(VarInt(0)),
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            for _ in 0..input_index {
                writer.write_u64_le(NULL_OUTPUT_VALUE);
                writer.write_var_bytes(&[]);
            }
            tx.outputs[input_index].write_to(&mut writer);
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);
    Ok(writer.into_bytes())
}

// -----------------------------------------------------------------------
// BIP143 (FORKID) signature hash
// -----------------------------------------------------------------------

/// Compute the replay-protected signature hash for a given input.
///
/// This is the algorithm used when `sighash_type` includes
/// `SIGHASH_FORKID`. It commits to the value being spent and uses a
/// different serialization order than the legacy digest.
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `script_code`  - The script being satisfied.
/// * `sighash_type` - The combined sighash flags (e.g. `SIGHASH_ALL | SIGHASH_FORKID`).
/// * `satoshis`     - The satoshi value of the output being spent.
///
/// # Returns
/// A 32-byte double-SHA256 hash to be signed by ECDSA.
pub fn forkid_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_forkid_preimage(tx, input_index, script_code, sighash_type, satoshis)?;
    Ok(sha256d(&preimage))
}

/// Compute the pre-image bytes for the replay-protected digest.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script) - the script being satisfied
/// 6. value (8 bytes LE) - satoshis of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
pub fn calc_forkid_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    check_input_index(tx, input_index)?;
    check_single_output(tx, input_index, sighash_type)?;

    let input = &tx.inputs[input_index];
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        prevouts_hash(tx)
    };

    let hash_sequence =
        if !anyone_can_pay && base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
            sequence_hash(tx)
        } else {
            [0u8; 32]
        };

    let hash_outputs = match base_type {
        SIGHASH_NONE => [0u8; 32],
        SIGHASH_SINGLE => outputs_hash(tx, Some(input_index)),
        _ => outputs_hash(tx, None),
    };

    let mut writer = ByteWriter::with_capacity(156 + script_code.len());
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.write_outpoint(&mut writer);
    writer.write_var_bytes(script_code);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

/// Double-SHA256 of all input outpoints concatenated.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        input.write_outpoint(&mut writer);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of all input sequence numbers concatenated.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of serialized outputs.
///
/// `None` hashes every output; `Some(n)` only the output at index `n`,
/// which the caller has already checked exists.
fn outputs_hash(tx: &Transaction, only: Option<usize>) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    match only {
        Some(n) => tx.outputs[n].write_to(&mut writer),
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }
    sha256d(writer.as_bytes())
}
