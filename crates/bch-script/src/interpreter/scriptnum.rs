//! Script number arithmetic with consensus encoding rules.
//!
//! Numbers on the script stack are little-endian byte arrays with a sign
//! bit in the most significant bit of the last byte. Numeric opcodes accept
//! operands of at most 4 bytes, but results may grow to 5 bytes and stay
//! valid as long as they are not read back as operands.

use super::error::{InterpreterError, InterpreterErrorCode};

/// A decoded script number.
///
/// Operands are bounded to a few bytes, so every value and every
/// intermediate result fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScriptNumber(pub i64);

impl ScriptNumber {
    pub fn new(val: i64) -> Self {
        ScriptNumber(val)
    }

    /// Parse a byte array into a ScriptNumber.
    ///
    /// # Arguments
    /// * `bb` - The little-endian sign-magnitude encoding.
    /// * `script_num_len` - The max allowed byte length.
    /// * `require_minimal` - Reject encodings with superfluous bytes.
    ///
    /// # Returns
    /// The number, `InvalidStackOperation` when the operand is too long, or
    /// `MinimalData` for a non-minimal encoding under `require_minimal`.
    pub fn from_bytes(
        bb: &[u8],
        script_num_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bb.len() > script_num_len || bb.len() > 8 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bb,
                    bb.len(),
                    script_num_len
                ),
            ));
        }

        if require_minimal {
            check_minimal_data_encoding(bb)?;
        }

        let last = match bb.last() {
            Some(b) => *b,
            None => return Ok(ScriptNumber(0)),
        };

        let mut magnitude: u64 = 0;
        for (i, &b) in bb.iter().enumerate() {
            magnitude |= (b as u64) << (8 * i);
        }

        if last & 0x80 != 0 {
            magnitude &= !(0x80u64 << (8 * (bb.len() - 1)));
            return Ok(ScriptNumber(-(magnitude as i64)));
        }
        Ok(ScriptNumber(magnitude as i64))
    }

    /// Serialize the number in minimal little-endian sign-magnitude form.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.0 == 0 {
            return vec![];
        }

        let negative = self.0 < 0;
        let mut abs = self.0.unsigned_abs();
        let mut result = Vec::with_capacity(9);
        while abs > 0 {
            result.push((abs & 0xff) as u8);
            abs >>= 8;
        }

        // The top bit is the sign, so a magnitude that uses it needs an
        // extra byte.
        let last = result.len() - 1;
        if result[last] & 0x80 != 0 {
            result.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            result[last] |= 0x80;
        }
        result
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for ScriptNumber {
    fn from(v: i64) -> Self {
        ScriptNumber(v)
    }
}

/// Minimally encode a byte array (used by OP_BIN2NUM).
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![];
    }

    let mut data = data.to_vec();
    let last = data[data.len() - 1];

    if last & 0x7f != 0 {
        return data;
    }

    if data.len() == 1 {
        return vec![];
    }

    if data[data.len() - 2] & 0x80 != 0 {
        return data;
    }

    let mut i = data.len() - 1;
    while i > 0 {
        if data[i - 1] != 0 {
            if data[i - 1] & 0x80 != 0 {
                data[i] = last;
                return data[..=i].to_vec();
            } else {
                data[i - 1] |= last;
                return data[..i].to_vec();
            }
        }
        i -= 1;
    }

    vec![]
}

/// Check that a byte array uses minimal data encoding.
pub fn check_minimal_data_encoding(v: &[u8]) -> Result<(), InterpreterError> {
    if v.is_empty() {
        return Ok(());
    }

    if v[v.len() - 1] & 0x7f == 0 {
        if v.len() == 1 || v[v.len() - 2] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "numeric value encoded as {:02x?} is not minimally encoded",
                    v
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_script_num_bytes() {
        let tests: Vec<(i64, Vec<u8>)> = vec![
            (0, vec![]),
            (1, hex_to_bytes("01")),
            (-1, hex_to_bytes("81")),
            (127, hex_to_bytes("7f")),
            (-127, hex_to_bytes("ff")),
            (128, hex_to_bytes("8000")),
            (-128, hex_to_bytes("8080")),
            (129, hex_to_bytes("8100")),
            (-129, hex_to_bytes("8180")),
            (256, hex_to_bytes("0001")),
            (-256, hex_to_bytes("0081")),
            (32767, hex_to_bytes("ff7f")),
            (-32767, hex_to_bytes("ffff")),
            (32768, hex_to_bytes("008000")),
            (-32768, hex_to_bytes("008080")),
            (65535, hex_to_bytes("ffff00")),
            (-65535, hex_to_bytes("ffff80")),
            (524288, hex_to_bytes("000008")),
            (-524288, hex_to_bytes("000088")),
            (7340032, hex_to_bytes("000070")),
            (-7340032, hex_to_bytes("0000f0")),
            (8388608, hex_to_bytes("00008000")),
            (-8388608, hex_to_bytes("00008080")),
            (2147483647, hex_to_bytes("ffffff7f")),
            (-2147483647, hex_to_bytes("ffffffff")),
            // Out of range values (still valid for results)
            (2147483648, hex_to_bytes("0000008000")),
            (-2147483648, hex_to_bytes("0000008080")),
            (2415919104, hex_to_bytes("0000009000")),
            (-2415919104, hex_to_bytes("0000009080")),
            (4294967295, hex_to_bytes("ffffffff00")),
            (-4294967295, hex_to_bytes("ffffffff80")),
            (4294967296, hex_to_bytes("0000000001")),
            (-4294967296, hex_to_bytes("0000000081")),
            (281474976710655, hex_to_bytes("ffffffffffff00")),
            (-281474976710655, hex_to_bytes("ffffffffffff80")),
            (72057594037927935, hex_to_bytes("ffffffffffffff00")),
            (-72057594037927935, hex_to_bytes("ffffffffffffff80")),
            (9223372036854775807, hex_to_bytes("ffffffffffffff7f")),
            (-9223372036854775807, hex_to_bytes("ffffffffffffffff")),
        ];

        for (num, expected) in &tests {
            let got = ScriptNumber::new(*num).to_bytes();
            assert_eq!(
                &got, expected,
                "Bytes: num={}, got={:02x?}, want={:02x?}",
                num, got, expected
            );
        }
    }

    #[test]
    fn test_make_script_num() {
        struct Test {
            serialized: Vec<u8>,
            num: i64,
            num_len: usize,
            minimal_encoding: bool,
            expect_err: bool,
        }

        let tests = vec![
            // Minimal encoding rejects negative 0
            Test { serialized: hex_to_bytes("80"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            // Valid minimally encoded
            Test { serialized: vec![], num: 0, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("01"), num: 1, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("81"), num: -1, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("7f"), num: 127, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ff"), num: -127, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("8000"), num: 128, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("8080"), num: -128, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("8100"), num: 129, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("8180"), num: -129, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("0001"), num: 256, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("0081"), num: -256, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ff7f"), num: 32767, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffff"), num: -32767, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("008000"), num: 32768, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("008080"), num: -32768, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffffff7f"), num: 2147483647, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffffffff"), num: -2147483647, num_len: 4, minimal_encoding: true, expect_err: false },
            // 5-byte numbers
            Test { serialized: hex_to_bytes("ffffffff7f"), num: 549755813887, num_len: 5, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffffffffff"), num: -549755813887, num_len: 5, minimal_encoding: true, expect_err: false },
            // Out of range for 4-byte
            Test { serialized: hex_to_bytes("0000008000"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            // Non-minimally encoded with flag
            Test { serialized: hex_to_bytes("00"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            Test { serialized: hex_to_bytes("0100"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            // Non-minimally encoded without flag (OK)
            Test { serialized: hex_to_bytes("00"), num: 0, num_len: 4, minimal_encoding: false, expect_err: false },
            Test { serialized: hex_to_bytes("0100"), num: 1, num_len: 4, minimal_encoding: false, expect_err: false },
        ];

        for test in &tests {
            let result = ScriptNumber::from_bytes(
                &test.serialized,
                test.num_len,
                test.minimal_encoding,
            );
            match result {
                Ok(sn) => {
                    assert!(
                        !test.expect_err,
                        "from_bytes({:02x?}): expected error",
                        test.serialized
                    );
                    assert_eq!(
                        sn.value(),
                        test.num,
                        "from_bytes({:02x?}): got {}, want {}",
                        test.serialized,
                        sn.value(),
                        test.num
                    );
                }
                Err(_) => {
                    assert!(
                        test.expect_err,
                        "from_bytes({:02x?}): unexpected error",
                        test.serialized
                    );
                }
            }
        }
    }

    #[test]
    fn test_minimally_encode() {
        // Empty stays empty
        assert_eq!(minimally_encode(&[]), Vec::<u8>::new());
        // Already minimal
        assert_eq!(minimally_encode(&[0x7f]), vec![0x7f]);
        // Single zero byte becomes empty
        assert_eq!(minimally_encode(&[0x00]), Vec::<u8>::new());
        // Negative zero becomes empty
        assert_eq!(minimally_encode(&[0x80]), Vec::<u8>::new());
        // Padding folds the sign bit into the last significant byte
        assert_eq!(minimally_encode(&[0x05, 0x00, 0x00, 0x80]), vec![0x85]);
        assert_eq!(minimally_encode(&[0x80, 0x00, 0x80]), vec![0x80, 0x80]);
    }

    #[test]
    fn test_oversized_operand_is_stack_error() {
        let err = ScriptNumber::from_bytes(&[1, 2, 3, 4, 5], 4, false).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::InvalidStackOperation);
    }

    #[test]
    fn test_non_minimal_is_minimal_data_error() {
        let err = ScriptNumber::from_bytes(&[0x01, 0x00], 4, true).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::MinimalData);
    }
}
