//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated bytes.
//! This module decodes raw script bytes into chunks and encodes push data
//! with the correct OP_PUSHDATA prefix.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Convert this chunk to its ASM string representation.
    ///
    /// Data pushes are rendered as hex; other opcodes use their `OP_` name.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) if self.op > OP_0 && self.op <= OP_PUSHDATA4 => hex::encode(data),
            _ => opcode_to_string(self.op).to_string(),
        }
    }
}

/// Read a little-endian push length of `width` bytes following `pos`.
fn read_len(bytes: &[u8], pos: usize, width: usize) -> Result<usize, ScriptError> {
    let field = bytes
        .get(pos + 1..pos + 1 + width)
        .ok_or(ScriptError::DataTooSmall)?;
    Ok(field
        .iter()
        .rev()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// A vector of parsed chunks, or `DataTooSmall` if a push runs past the
/// end of the script.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        let (header, length) = match op {
            OP_DATA_1..=OP_DATA_75 => (1, op as usize),
            OP_PUSHDATA1 => (2, read_len(bytes, pos, 1)?),
            OP_PUSHDATA2 => (3, read_len(bytes, pos, 2)?),
            OP_PUSHDATA4 => (5, read_len(bytes, pos, 4)?),
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
                continue;
            }
        };
        let start = pos + header;
        let end = start.checked_add(length).ok_or(ScriptError::DataTooSmall)?;
        if end > bytes.len() {
            return Err(ScriptError::DataTooSmall);
        }
        chunks.push(ScriptChunk {
            op,
            data: Some(bytes[start..end].to_vec()),
        });
        pos = end;
    }

    Ok(chunks)
}

/// Compute the OP_PUSHDATA prefix bytes for a data payload of the given length.
///
/// # Returns
/// The shortest prefix able to carry `data_len` bytes, or `DataTooBig`.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode a single push of `data` the way a minimal-data checker expects:
/// empty data and single bytes 1..=16 or 0x81 become small-int opcodes,
/// everything else gets the shortest length prefix.
pub fn encode_minimal_push(data: &[u8]) -> Result<Vec<u8>, ScriptError> {
    match data {
        [] => return Ok(vec![OP_0]),
        [b @ 1..=16] => return Ok(vec![OP_1 + b - 1]),
        [0x81] => return Ok(vec![OP_1NEGATE]),
        _ => {}
    }
    let mut out = push_data_prefix(data.len())?;
    out.extend_from_slice(data);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_script_simple() {
        let bytes = hex::decode("05000102030401FF02ABCD").unwrap();
        let parts = decode_script(&bytes).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].data.as_deref(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(parts[2].data.as_deref(), Some(&[0xab, 0xcd][..]));
    }

    #[test]
    fn test_decode_script_opcodes_and_return() {
        // OP_RETURN is an ordinary opcode here; its trailing push is decoded.
        let bytes = [OP_DUP, OP_RETURN, 0x01, 0xaa];
        let parts = decode_script(&bytes).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], ScriptChunk { op: OP_RETURN, data: None });
        assert_eq!(parts[2].data, Some(vec![0xaa]));
    }

    #[test]
    fn test_decode_pushdata_variants() {
        let mut script = vec![OP_PUSHDATA1, 3, 1, 2, 3];
        script.extend_from_slice(&[OP_PUSHDATA2, 2, 0, 9, 9]);
        script.extend_from_slice(&[OP_PUSHDATA4, 1, 0, 0, 0, 7]);
        let parts = decode_script(&script).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].data, Some(vec![1, 2, 3]));
        assert_eq!(parts[1].data, Some(vec![9, 9]));
        assert_eq!(parts[2].data, Some(vec![7]));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(decode_script(&[0x05, 1, 2]), Err(ScriptError::DataTooSmall)));
        assert!(decode_script(&[OP_PUSHDATA1]).is_err());
        assert!(decode_script(&[OP_PUSHDATA2, 0x01]).is_err());
        assert!(decode_script(&[OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_push_data_prefix_boundaries() {
        assert_eq!(push_data_prefix(0).unwrap(), vec![0x00]);
        assert_eq!(push_data_prefix(75).unwrap(), vec![75]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(
            push_data_prefix(65536).unwrap(),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_encode_minimal_push() {
        assert_eq!(encode_minimal_push(&[]).unwrap(), vec![OP_0]);
        assert_eq!(encode_minimal_push(&[5]).unwrap(), vec![OP_5]);
        assert_eq!(encode_minimal_push(&[0x81]).unwrap(), vec![OP_1NEGATE]);
        assert_eq!(encode_minimal_push(&[0]).unwrap(), vec![0x01, 0x00]);
        assert_eq!(encode_minimal_push(&[17]).unwrap(), vec![0x01, 17]);
    }

    #[test]
    fn test_chunk_asm() {
        let push = ScriptChunk { op: 2, data: Some(vec![0xab, 0xcd]) };
        assert_eq!(push.to_asm_string(), "abcd");
        let op = ScriptChunk { op: OP_CHECKSIG, data: None };
        assert_eq!(op.to_asm_string(), "OP_CHECKSIG");
    }
}
