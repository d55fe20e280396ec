//! Bare m-of-n multisig script template.
//!
//! Locking script: `<m> <pubkey_1> ... <pubkey_n> <n> OP_CHECKMULTISIG`.
//! Unlocking script: `OP_0 <sig_1> ... <sig_m>`, with signatures in the same
//! order as their keys appear in the locking script. The leading `OP_0` is
//! the dummy element OP_CHECKMULTISIG consumes.

use bch_primitives::ec::{PrivateKey, PublicKey};
use bch_script::interpreter::ScriptNumber;
use bch_script::opcodes::*;
use bch_script::Script;

use crate::sighash::SIGHASH_ALL_FORKID;
use crate::template::{tx_signature, UnlockingScriptTemplate};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Most public keys a multisig script may list.
pub const MAX_PUB_KEYS: usize = 20;

/// Create an m-of-n multisig locking script.
///
/// # Arguments
/// * `required` - Number of signatures needed (`m`).
/// * `pub_keys` - The `n` candidate keys, in the order signatures must follow.
///
/// # Returns
/// The locking script, or `InvalidTransaction` unless
/// `1 <= m <= n <= 20`.
pub fn lock(required: usize, pub_keys: &[PublicKey]) -> Result<Script, TransactionError> {
    if pub_keys.is_empty() || pub_keys.len() > MAX_PUB_KEYS {
        return Err(TransactionError::InvalidTransaction(format!(
            "multisig needs 1 to {} keys, got {}",
            MAX_PUB_KEYS,
            pub_keys.len()
        )));
    }
    if required == 0 || required > pub_keys.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "multisig threshold {} invalid for {} keys",
            required,
            pub_keys.len()
        )));
    }

    let mut script = Script::new();
    script.append_minimal_push(&ScriptNumber::new(required as i64).to_bytes())?;
    for key in pub_keys {
        script.append_push_data(&key.to_bytes())?;
    }
    script.append_minimal_push(&ScriptNumber::new(pub_keys.len() as i64).to_bytes())?;
    script.append_opcodes(&[OP_CHECKMULTISIG])?;
    Ok(script)
}

/// Create a multisig unlocker.
///
/// `signers` must be listed in the same relative order as their public
/// keys in the locking script. Pass `redeem_script` when the multisig
/// script is wrapped in P2SH; the signatures then commit to it and it is
/// pushed last.
pub fn unlock(
    signers: Vec<PrivateKey>,
    sighash_flag: Option<u32>,
    redeem_script: Option<Script>,
) -> Multisig {
    Multisig {
        signers,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
        redeem_script,
    }
}

/// Multisig signing template.
pub struct Multisig {
    signers: Vec<PrivateKey>,
    sighash_flag: u32,
    redeem_script: Option<Script>,
}

impl UnlockingScriptTemplate for Multisig {
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        if self.signers.is_empty() {
            return Err(TransactionError::SigningError(
                "multisig unlock needs at least one signer".to_string(),
            ));
        }

        let mut script = Script::new();
        script.append_opcodes(&[OP_0])?;
        for key in &self.signers {
            let sig = tx_signature(
                key,
                tx,
                input_index,
                self.redeem_script.as_ref(),
                self.sighash_flag,
            )?;
            script.append_push_data(&sig)?;
        }
        if let Some(redeem) = &self.redeem_script {
            script.append_push_data(redeem.to_bytes())?;
        }
        Ok(script)
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        let redeem = self
            .redeem_script
            .as_ref()
            .map(|s| 3 + s.len())
            .unwrap_or(0);
        1 + 74 * self.signers.len() + redeem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: u8) -> Vec<PublicKey> {
        (1..=n)
            .map(|i| PrivateKey::from_bytes(&[i; 32]).unwrap().pub_key())
            .collect()
    }

    #[test]
    fn test_lock_two_of_three() {
        let script = lock(2, &keys(3)).unwrap();
        assert!(script.is_multisig_out());
        let bytes = script.to_bytes();
        assert_eq!(bytes[0], OP_2);
        assert_eq!(bytes[bytes.len() - 2], OP_3);
        assert_eq!(bytes[bytes.len() - 1], OP_CHECKMULTISIG);
    }

    #[test]
    fn test_lock_rejects_bad_threshold() {
        assert!(lock(0, &keys(2)).is_err());
        assert!(lock(3, &keys(2)).is_err());
        assert!(lock(1, &[]).is_err());
    }

    #[test]
    fn test_lock_twenty_keys_uses_number_push() {
        let script = lock(17, &keys(20)).unwrap();
        let chunks = script.chunks().unwrap();
        assert_eq!(chunks[0].data.as_deref(), Some(&[17u8][..]));
        assert_eq!(chunks[21].data.as_deref(), Some(&[20u8][..]));
    }
}
