//! Script templates for common output types.
//!
//! Provides the `UnlockingScriptTemplate` trait with P2PKH, bare multisig and
//! P2SH implementations for creating locking and unlocking scripts.

pub mod multisig;
pub mod p2pkh;
pub mod p2sh;

use bch_primitives::ec::PrivateKey;
use bch_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// Trait for script templates that produce unlocking scripts.
///
/// The `sign` method receives the full transaction and the input index,
/// computes the appropriate signature hash, signs it, and returns the
/// unlocking script.
pub trait UnlockingScriptTemplate {
    /// Produce an unlocking script for the given input.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The index of the input to sign.
    ///
    /// # Returns
    /// `Ok(Script)` containing the unlocking script, or an error on failure.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError>;

    /// Estimate the byte length of the unlocking script before signing.
    fn estimate_length(&self, tx: &Transaction, input_index: usize) -> usize;
}

/// Sign an input's digest and encode it in transaction form
/// (DER followed by the sighash byte).
pub(crate) fn tx_signature(
    key: &PrivateKey,
    tx: &Transaction,
    input_index: usize,
    script_code: Option<&Script>,
    sighash_flag: u32,
) -> Result<Vec<u8>, TransactionError> {
    let digest = match script_code {
        Some(code) => tx.calc_input_signature_hash_with_script(input_index, code, sighash_flag)?,
        None => tx.calc_input_signature_hash(input_index, sighash_flag)?,
    };
    let signature = key.sign(&digest)?.with_sighash_type(sighash_flag as u8);
    Ok(signature.to_tx_format()?)
}
