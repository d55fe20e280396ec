//! Arithmetic operations for the script interpreter.
//!
//! Operands are popped as script numbers bounded by the configured operand
//! length; results are pushed in minimal encoding and may be one byte
//! longer than an operand.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_int(&mut self, f: impl FnOnce(i64) -> i64) -> Result<(), InterpreterError> {
        let m = self.dstack.pop_int()?;
        self.dstack.push_int(&ScriptNumber::new(f(m.value())));
        Ok(())
    }

    /// Pop `b` then `a` and push `f(a, b)`.
    pub(crate) fn op_binary_int(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<(), InterpreterError> {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        self.dstack.push_int(&ScriptNumber::new(f(a.value(), b.value())));
        Ok(())
    }

    pub(crate) fn op_bool_binop(&mut self, f: impl FnOnce(i64, i64) -> bool) -> Result<(), InterpreterError> {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        self.dstack.push_bool(f(a.value(), b.value()));
        Ok(())
    }

    pub(crate) fn op_numequalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_bool_binop(|a, b| a == b)?;
        self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify)
    }

    /// Truncating division; the quotient rounds toward zero.
    pub(crate) fn op_div(&mut self) -> Result<(), InterpreterError> {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        if b.is_zero() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivByZero,
                "divide by zero",
            ));
        }
        self.dstack.push_int(&ScriptNumber::new(a.value() / b.value()));
        Ok(())
    }

    /// Remainder with the sign of the dividend.
    pub(crate) fn op_mod(&mut self) -> Result<(), InterpreterError> {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        if b.is_zero() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivByZero,
                "mod by zero",
            ));
        }
        self.dstack.push_int(&ScriptNumber::new(a.value() % b.value()));
        Ok(())
    }

    /// x min max -> (min <= x < max)
    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max_val = self.dstack.pop_int()?;
        let min_val = self.dstack.pop_int()?;
        let x = self.dstack.pop_int()?;
        self.dstack.push_bool(min_val <= x && x < max_val);
        Ok(())
    }
}
