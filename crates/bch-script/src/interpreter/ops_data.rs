//! Splice, bitwise and equality operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::*;
use super::thread::Thread;

impl<'a> Thread<'a> {
    /// a b -> a||b
    pub(crate) fn op_cat(&mut self) -> Result<(), InterpreterError> {
        let b = self.dstack.pop()?;
        let mut a = self.dstack.pop()?;
        if a.len() + b.len() > self.cfg.max_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "concatenated size {} exceeds max allowed size {}",
                    a.len() + b.len(),
                    self.cfg.max_element_size
                ),
            ));
        }
        a.extend_from_slice(&b);
        self.dstack.push(a);
        Ok(())
    }

    /// x n -> x[..n] x[n..]
    pub(crate) fn op_split(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        let c = self.dstack.pop()?;
        let pos = usize::try_from(n.value())
            .ok()
            .filter(|&p| p <= c.len())
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidSplitRange,
                    format!("split position {} outside 0..={}", n.value(), c.len()),
                )
            })?;
        let (a, b) = c.split_at(pos);
        self.dstack.push(a.to_vec());
        self.dstack.push(b.to_vec());
        Ok(())
    }

    /// Convert a number to a byte string of exactly `n` bytes, moving the
    /// sign bit to the new last byte.
    pub(crate) fn op_num2bin(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        let size = usize::try_from(n.value())
            .ok()
            .filter(|&s| s <= self.cfg.max_element_size)
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::ElementTooBig,
                    format!(
                        "requested size {} outside 0..={}",
                        n.value(),
                        self.cfg.max_element_size
                    ),
                )
            })?;

        let mut b = minimally_encode(&self.dstack.pop()?);
        if b.len() > size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ImpossibleEncoding,
                format!("{} byte number cannot fit in {} bytes", b.len(), size),
            ));
        }
        if b.len() == size {
            self.dstack.push(b);
            return Ok(());
        }

        let mut signbit = 0x00;
        if let Some(last) = b.last_mut() {
            signbit = *last & 0x80;
            *last &= 0x7f;
        }
        b.resize(size - 1, 0x00);
        b.push(signbit);

        self.dstack.push(b);
        Ok(())
    }

    /// Convert a byte string to a minimally encoded number.
    pub(crate) fn op_bin2num(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop()?;
        let b = minimally_encode(&a);
        if b.len() > self.cfg.max_number_length {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "script numbers are limited to {} bytes",
                    self.cfg.max_number_length
                ),
            ));
        }
        self.dstack.push(b);
        Ok(())
    }

    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let so = self.dstack.peek(0)?;
        self.dstack.push_int(&ScriptNumber::new(so.len() as i64));
        Ok(())
    }

    /// OP_AND / OP_OR / OP_XOR over two equal-length operands.
    pub(crate) fn op_bitwise(&mut self, f: fn(u8, u8) -> u8) -> Result<(), InterpreterError> {
        let b = self.dstack.pop()?;
        let a = self.dstack.pop()?;
        if a.len() != b.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidOperandSize,
                format!("operand sizes differ: {} != {}", a.len(), b.len()),
            ));
        }
        let c: Vec<u8> = a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect();
        self.dstack.push(c);
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop()?;
        let b = self.dstack.pop()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }

    pub(crate) fn op_equalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_equal()?;
        self.abstract_verify(pop, InterpreterErrorCode::EqualVerify)
    }
}
