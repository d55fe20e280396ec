//! Bitcoin Script type: a sequence of opcodes and data pushes.
//!
//! Scripts appear in transaction inputs (unlocking) and outputs (locking)
//! to define spending conditions. `Script` wraps a `Vec<u8>` and provides
//! construction, classification, serialization and ASM output.

use std::fmt;

use crate::chunk::{decode_script, encode_minimal_push, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Tokens naming a known opcode (e.g. "OP_DUP") are emitted directly,
    /// every other token must be hex and is pushed as data.
    ///
    /// # Arguments
    /// * `asm` - A whitespace-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or `InvalidAsmToken` naming the first bad token.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            if let Some(opcode) = string_to_opcode(token) {
                script.0.push(opcode);
            } else {
                let data = hex::decode(token)
                    .map_err(|_| ScriptError::InvalidAsmToken(token.to_string()))?;
                script.append_push_data(&data)?;
            }
        }
        Ok(script)
    }

    /// Build a script by concatenating the encodings of the given chunks.
    pub fn from_chunks(chunks: &[ScriptChunk]) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for chunk in chunks {
            script.append_chunk(chunk)?;
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly) representation.
    ///
    /// Data pushes appear as their hex encoding; opcodes appear by name.
    ///
    /// # Returns
    /// A space-separated ASM string, or an empty string for a script whose
    /// pushes run past its end.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(ScriptChunk::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a Pay-to-Public-Key (P2PK) output script.
    ///
    /// Pattern: <pubkey> OP_CHECKSIG with a 33-byte compressed or 65-byte
    /// uncompressed key.
    pub fn is_p2pk(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        match parts.as_slice() {
            [key, last] if last.op == OP_CHECKSIG => match key.data.as_deref() {
                Some([0x04, rest @ ..]) => rest.len() == 64,
                Some([0x02 | 0x03, rest @ ..]) => rest.len() == 32,
                _ => false,
            },
            _ => false,
        }
    }

    /// Check if this is a Pay-to-Script-Hash (P2SH) output script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Check if this is a data output script (OP_RETURN or OP_FALSE OP_RETURN).
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN)
            || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Check if this is a bare multisig output script.
    ///
    /// Pattern: OP_M <pubkey1> ... <pubkeyN> OP_N OP_CHECKMULTISIG
    pub fn is_multisig_out(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() < 4 {
            return false;
        }
        let keys = &parts[1..parts.len() - 2];
        let required = small_int_value(parts[0].op);
        let total = small_int_value(parts[parts.len() - 2].op);
        let all_keys = keys
            .iter()
            .all(|c| matches!(&c.data, Some(d) if !d.is_empty()));
        match (required, total) {
            (Some(m), Some(n)) => {
                all_keys
                    && m >= 1
                    && m <= n
                    && n as usize == keys.len()
                    && parts[parts.len() - 1].op == OP_CHECKMULTISIG
            }
            _ => false,
        }
    }

    /// True when every operation is a push (opcode value at most OP_16).
    ///
    /// Malformed scripts are not push-only.
    pub fn is_push_only(&self) -> bool {
        match self.chunks() {
            Ok(parts) => parts.iter().all(|c| c.op <= OP_16),
            Err(_) => false,
        }
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// Extract the 20-byte public key hash from a P2PKH script.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::InvalidScript("not a P2PKH script".to_string()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[3..23]);
        Ok(out)
    }

    /// Extract the 20-byte script hash from a P2SH script.
    pub fn script_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2sh() {
            return Err(ScriptError::InvalidScript("not a P2SH script".to_string()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[2..22]);
        Ok(out)
    }

    /// Parse the script into a vector of decoded chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Remove every chunk that pushes exactly `data` with the shortest
    /// length prefix.
    ///
    /// Matching is on whole chunks, so bytes that merely appear inside a
    /// larger push are left alone. Used to strip a signature from the
    /// script code before legacy sighashing.
    pub fn find_and_delete(&self, data: &[u8]) -> Result<Script, ScriptError> {
        let prefix_op = push_data_prefix(data.len())?[0];
        let kept: Vec<ScriptChunk> = self
            .chunks()?
            .into_iter()
            .filter(|c| !(c.op == prefix_op && c.data.as_deref() == Some(data)))
            .collect();
        Script::from_chunks(&kept)
    }

    /// Copy of the script with every OP_CODESEPARATOR removed.
    pub fn remove_codeseparators(&self) -> Result<Script, ScriptError> {
        let kept: Vec<ScriptChunk> = self
            .chunks()?
            .into_iter()
            .filter(|c| c.op != OP_CODESEPARATOR)
            .collect();
        Script::from_chunks(&kept)
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the proper PUSHDATA prefix.
    ///
    /// Chooses the shortest length prefix: direct push for 0-75 bytes,
    /// OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 for 256-65535, etc.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or `DataTooBig` if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append data using the minimal push encoding, so small values become
    /// OP_0, OP_1..OP_16 or OP_1NEGATE.
    pub fn append_minimal_push(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        self.0.extend_from_slice(&encode_minimal_push(data)?);
        Ok(())
    }

    /// Append hex-encoded data to the script with proper PUSHDATA prefix.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4), which need
    /// trailing data. Use `append_push_data` for those.
    ///
    /// # Arguments
    /// * `opcodes` - Slice of opcode bytes to append.
    ///
    /// # Returns
    /// `Ok(())` on success, or `InvalidOpcodeType` for a push data opcode.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes
            .iter()
            .find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op))
        {
            return Err(ScriptError::InvalidOpcodeType(
                opcode_to_string(op).to_string(),
            ));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append a chunk, keeping its original push opcode.
    pub fn append_chunk(&mut self, chunk: &ScriptChunk) -> Result<(), ScriptError> {
        let data = match &chunk.data {
            None => {
                self.0.push(chunk.op);
                return Ok(());
            }
            Some(d) => d,
        };
        self.0.push(chunk.op);
        match chunk.op {
            OP_PUSHDATA1 => {
                let len = u8::try_from(data.len()).map_err(|_| ScriptError::DataTooBig)?;
                self.0.push(len);
            }
            OP_PUSHDATA2 => {
                let len = u16::try_from(data.len()).map_err(|_| ScriptError::DataTooBig)?;
                self.0.extend_from_slice(&len.to_le_bytes());
            }
            OP_PUSHDATA4 => {
                let len = u32::try_from(data.len()).map_err(|_| ScriptError::DataTooBig)?;
                self.0.extend_from_slice(&len.to_le_bytes());
            }
            op if op as usize != data.len() => {
                return Err(ScriptError::InvalidScript(format!(
                    "direct push 0x{:02x} carries {} bytes",
                    op,
                    data.len()
                )));
            }
            _ => {}
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append the raw bytes of another script.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }

    /// Check if this script is byte-equal to another script.
    pub fn equals(&self, other: &Script) -> bool {
        self.0 == other.0
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
