//! Parsed opcode representation and script parser.

use crate::chunk::{decode_script, ScriptChunk};
use crate::opcodes::*;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;

/// A parsed opcode with its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpcode {
    /// The opcode byte value.
    pub opcode: u8,
    /// The data payload associated with push opcodes (empty for non-push opcodes).
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    /// Return the human-readable name of this opcode.
    pub fn name(&self) -> &'static str {
        opcode_to_string(self.opcode)
    }

    /// Return true if executing this opcode is forbidden under `flags`.
    ///
    /// The check runs whether or not the opcode sits in an executing branch.
    pub fn is_disabled(&self, flags: ScriptFlags) -> bool {
        match self.opcode {
            OP_INVERT | OP_2MUL | OP_2DIV | OP_MUL | OP_LSHIFT | OP_RSHIFT => true,
            OP_CAT | OP_SPLIT | OP_AND | OP_OR | OP_XOR | OP_DIV | OP_MOD | OP_NUM2BIN
            | OP_BIN2NUM => !flags.has_flag(ScriptFlags::ENABLE_MONOLITH_OPCODES),
            _ => false,
        }
    }

    /// Return true if this opcode is a conditional flow control opcode.
    ///
    /// OP_VERIF and OP_VERNOTIF count, which makes them fail even inside an
    /// untaken branch.
    pub fn is_conditional(&self) -> bool {
        (OP_IF..=OP_ENDIF).contains(&self.opcode)
    }

    /// Return true if this opcode pushes data (OP_0 through OP_PUSHDATA4).
    pub fn is_push_data(&self) -> bool {
        self.opcode <= OP_PUSHDATA4
    }

    /// Check that a push uses the smallest possible encoding.
    pub fn enforce_minimum_data_push(&self) -> Result<(), InterpreterError> {
        let data_len = self.data.len();
        let expected = match self.data.as_slice() {
            [] => OP_0,
            [b @ 1..=16] => OP_1 + b - 1,
            [0x81] => OP_1NEGATE,
            _ if data_len <= 75 => data_len as u8,
            _ if data_len <= 0xff => OP_PUSHDATA1,
            _ if data_len <= 0xffff => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        if self.opcode != expected {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "data push of {} bytes encoded with opcode {} instead of {}",
                    data_len,
                    self.name(),
                    opcode_to_string(expected)
                ),
            ));
        }
        Ok(())
    }
}

impl From<ScriptChunk> for ParsedOpcode {
    fn from(chunk: ScriptChunk) -> Self {
        ParsedOpcode {
            opcode: chunk.op,
            data: chunk.data.unwrap_or_default(),
        }
    }
}

/// A parsed script is a sequence of parsed opcodes.
pub type ParsedScript = Vec<ParsedOpcode>;

/// Check if a parsed script is push-only.
pub fn is_push_only(script: &ParsedScript) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Parse a Script into a ParsedScript.
///
/// # Returns
/// The opcode sequence, or `MalformedPush` if a push runs past the end.
pub fn parse_script(script: &Script) -> Result<ParsedScript, InterpreterError> {
    let chunks = decode_script(script.to_bytes()).map_err(|e| {
        InterpreterError::new(
            InterpreterErrorCode::MalformedPush,
            format!("malformed push in script: {}", e),
        )
    })?;
    Ok(chunks.into_iter().map(ParsedOpcode::from).collect())
}

/// Unparse a ParsedScript back to a Script.
///
/// Push opcodes keep their original encoding.
pub fn unparse(pscript: &[ParsedOpcode]) -> Result<Script, InterpreterError> {
    let chunks: Vec<ScriptChunk> = pscript
        .iter()
        .map(|pop| ScriptChunk {
            op: pop.opcode,
            data: if (OP_DATA_1..=OP_PUSHDATA4).contains(&pop.opcode) {
                Some(pop.data.clone())
            } else {
                None
            },
        })
        .collect();
    Script::from_chunks(&chunks).map_err(|e| {
        InterpreterError::new(InterpreterErrorCode::MalformedPush, e.to_string())
    })
}
