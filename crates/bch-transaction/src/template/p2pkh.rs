//! Pay-to-Public-Key-Hash (P2PKH) script template.
//!
//! Creates standard P2PKH locking scripts (`OP_DUP OP_HASH160 <hash>
//! OP_EQUALVERIFY OP_CHECKSIG`) and unlocking scripts (`<sig> <pubkey>`).

use bch_primitives::ec::{KeyMaterial, PrivateKey};
use bch_script::opcodes::*;
use bch_script::Script;

use crate::sighash::SIGHASH_ALL_FORKID;
use crate::template::{tx_signature, UnlockingScriptTemplate};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Create a P2PKH locking script from a 20-byte public key hash.
///
/// Produces: `OP_DUP OP_HASH160 <20-byte pubkey hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn lock(public_key_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(public_key_hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// Create a P2PKH locking script paying to the holder of `key`.
///
/// Accepts a private key or a bare public key; the serialization the key
/// carries (compressed or not) decides the hash.
pub fn lock_to_key<K: KeyMaterial>(key: &K) -> Script {
    lock(&key.public_key().hash160())
}

/// Create a P2PKH unlocker for signing transaction inputs.
///
/// # Arguments
/// * `private_key` - The private key used to sign.
/// * `sighash_flag` - Optional sighash flag. Defaults to `SIGHASH_ALL_FORKID` (0x41).
///
/// # Returns
/// A `P2PKH` instance implementing `UnlockingScriptTemplate`.
pub fn unlock(private_key: PrivateKey, sighash_flag: Option<u32>) -> P2PKH {
    P2PKH {
        private_key,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
    }
}

/// P2PKH signing template holding a private key and sighash flag.
pub struct P2PKH {
    private_key: PrivateKey,
    sighash_flag: u32,
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the input against its source output's locking script and build
    /// `<DER_sig || sighash_byte> <pubkey>`.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        let sig = tx_signature(&self.private_key, tx, input_index, None, self.sighash_flag)?;
        let pub_key = self.private_key.pub_key().to_bytes();

        let mut script = Script::new();
        script.append_push_data(&sig)?;
        script.append_push_data(&pub_key)?;
        Ok(script)
    }

    /// 1 (push len) + 72 (DER sig + sighash) + 1 (push len) + 33 (compressed pubkey).
    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        107
    }
}
