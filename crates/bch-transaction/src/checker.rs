//! Spend verification: the bridge between a transaction and the script
//! interpreter.
//!
//! [`TransactionChecker`] answers the interpreter's questions about the
//! spending transaction (signature validity, lock time, sequence numbers),
//! and [`verify_input`] runs one input's scripts against the output it
//! spends.

use bch_primitives::ec::{PublicKey, Signature};
use bch_script::interpreter::{
    Engine, InterpreterError, InterpreterErrorCode, ScriptFlags, TxContext,
};
use bch_script::Script;
use log::debug;

use crate::output::TransactionOutput;
use crate::sighash::{self, SIGHASH_FORKID};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Transaction view handed to the interpreter while checking one input.
#[derive(Debug, Clone, Copy)]
pub struct TransactionChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    satoshis: u64,
}

impl<'a> TransactionChecker<'a> {
    /// Create a checker for `input_index` of `tx`, spending an output worth
    /// `satoshis`.
    pub fn new(tx: &'a Transaction, input_index: usize, satoshis: u64) -> Self {
        TransactionChecker {
            tx,
            input_index,
            satoshis,
        }
    }

    /// The input this checker was built for.
    pub fn input_index(&self) -> usize {
        self.input_index
    }

    fn digest(
        &self,
        sub_script: &Script,
        input_idx: usize,
        sighash_type: u32,
        flags: ScriptFlags,
    ) -> Result<[u8; 32], TransactionError> {
        if sighash_type & SIGHASH_FORKID != 0 && flags.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
            sighash::forkid_signature_hash(
                self.tx,
                input_idx,
                sub_script.to_bytes(),
                sighash_type,
                self.satoshis,
            )
        } else {
            sighash::legacy_signature_hash(self.tx, input_idx, sub_script.to_bytes(), sighash_type)
        }
    }
}

impl TxContext for TransactionChecker<'_> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        flags: ScriptFlags,
    ) -> Result<bool, InterpreterError> {
        let (&sighash_byte, der) = match full_sig.split_last() {
            Some(parts) => parts,
            None => return Ok(false),
        };

        let signature = match Signature::from_der(der) {
            Ok(sig) => sig,
            Err(e) => {
                debug!("input {}: unparseable signature: {}", input_idx, e);
                return Ok(false);
            }
        };
        let key = match PublicKey::from_bytes(pub_key) {
            Ok(key) => key,
            Err(e) => {
                debug!("input {}: unparseable public key: {}", input_idx, e);
                return Ok(false);
            }
        };

        let digest = self
            .digest(sub_script, input_idx, u32::from(sighash_byte), flags)
            .map_err(|e| InterpreterError::new(InterpreterErrorCode::InvalidSigHashType, e.to_string()))?;

        Ok(key.verify(&digest, &signature))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx
            .inputs
            .get(input_idx)
            .map(|input| input.sequence_number)
            .unwrap_or(u32::MAX)
    }
}

/// Run the interpreter for one input of `tx`.
///
/// # Arguments
/// * `tx` - The spending transaction.
/// * `input_index` - The input to check.
/// * `prev_output` - The output that input spends.
/// * `flags` - Verification flags, e.g. `ScriptFlags::STANDARD`.
///
/// # Returns
/// `Ok(())` if the unlocking script satisfies the locking script, or the
/// interpreter's failure wrapped in `TransactionError::Interpreter`.
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    prev_output: &TransactionOutput,
    flags: ScriptFlags,
) -> Result<(), TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        ))
    })?;

    let checker = TransactionChecker::new(tx, input_index, prev_output.satoshis);
    Engine::new().evaluate(
        &input.unlocking_script,
        &prev_output.locking_script,
        flags,
        Some(&checker),
        input_index,
    )?;
    Ok(())
}

/// Run [`verify_input`] for every input, using each input's attached
/// source output.
pub fn verify_all(tx: &Transaction, flags: ScriptFlags) -> Result<(), TransactionError> {
    for (i, input) in tx.inputs.iter().enumerate() {
        let prev = input.source_output().ok_or_else(|| {
            TransactionError::InvalidTransaction(format!("missing source output on input {}", i))
        })?;
        verify_input(tx, i, prev, flags)?;
    }
    Ok(())
}
