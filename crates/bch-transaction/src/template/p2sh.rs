//! Pay-to-Script-Hash (P2SH) script template.
//!
//! Locking script: `OP_HASH160 <hash160(redeem_script)> OP_EQUAL`.
//! Spending it means supplying the redeem script as the last push of the
//! unlocking script, preceded by whatever the redeem script needs.

use bch_primitives::hash::hash160;
use bch_script::opcodes::*;
use bch_script::Script;

use crate::TransactionError;

/// Create a P2SH locking script committing to `redeem_script`.
pub fn lock(redeem_script: &Script) -> Script {
    let hash = hash160(redeem_script.to_bytes());
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(&hash);
    bytes.push(OP_EQUAL);
    Script::from_bytes(&bytes)
}

/// Append the serialized redeem script to an existing unlocking script.
///
/// # Arguments
/// * `unlocking` - Push-only script satisfying the redeem script.
/// * `redeem_script` - The script committed to by the P2SH output.
pub fn unlock(unlocking: &Script, redeem_script: &Script) -> Result<Script, TransactionError> {
    let mut script = unlocking.clone();
    script.append_push_data(redeem_script.to_bytes())?;
    Ok(script)
}
