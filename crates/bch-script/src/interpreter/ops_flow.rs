//! Flow control and lock-time operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;
use super::TxContext;

/// Lock time threshold (block vs timestamp).
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;

/// Max sequence number.
const MAX_TX_IN_SEQUENCE_NUM: u32 = 0xffffffff;
/// Sequence lock time disabled bit.
const SEQUENCE_LOCK_TIME_DISABLED: u32 = 1 << 31;
/// Sequence lock time is seconds flag.
const SEQUENCE_LOCK_TIME_IS_SECONDS: i64 = 1 << 22;
/// Sequence lock time mask.
const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000ffff;

impl<'a> Thread<'a> {
    /// OP_IF and OP_NOTIF. Outside an executing branch nothing is popped and
    /// the new branch is never taken.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        let mut taken = false;
        if self.is_branch_executing() {
            taken = self.dstack.pop_bool()? != negate;
        }
        self.cond_stack.push(taken);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match self.cond_stack.last_mut() {
            Some(top) => {
                *top = !*top;
                Ok(())
            }
            None => Err(unbalanced(pop)),
        }
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.cond_stack.pop().map(|_| ()).ok_or_else(|| unbalanced(pop))
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        let verified = self.dstack.pop_bool()?;
        if !verified {
            return Err(InterpreterError::new(
                code,
                format!("{} failed", pop.name()),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::EarlyReturn,
            "script returned early",
        ))
    }

    pub(crate) fn op_upgradable_nop(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", pop.name()),
            ));
        }
        Ok(())
    }

    fn require_tx_context(&self, op_name: &str) -> Result<&'a dyn TxContext, InterpreterError> {
        self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                format!("no tx context for {}", op_name),
            )
        })
    }

    /// Read the lock-time operand on top of the stack without popping it.
    fn peek_lock_time_operand(&self) -> Result<i64, InterpreterError> {
        let so = self.dstack.peek(0)?;
        let n = ScriptNumber::from_bytes(
            &so,
            self.cfg.max_lock_time_number_length,
            self.dstack.requires_minimal_data(),
        )?;
        if n.value() < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", n.value()),
            ));
        }
        Ok(n.value())
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECK_LOCK_TIME_VERIFY) {
            return self.op_upgradable_nop(&ParsedOpcode {
                opcode: crate::opcodes::OP_NOP2,
                data: Vec::new(),
            });
        }

        let lock_time = self.peek_lock_time_operand()?;
        let ctx = self.require_tx_context("OP_CHECKLOCKTIMEVERIFY")?;

        verify_lock_time(ctx.lock_time() as i64, LOCK_TIME_THRESHOLD, lock_time)?;

        // A final input opts out of lock time enforcement entirely.
        if ctx.input_sequence(self.input_idx) == MAX_TX_IN_SEQUENCE_NUM {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLocktime,
                "transaction input is finalized",
            ));
        }

        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECK_SEQUENCE_VERIFY) {
            return self.op_upgradable_nop(&ParsedOpcode {
                opcode: crate::opcodes::OP_NOP3,
                data: Vec::new(),
            });
        }

        let sequence = self.peek_lock_time_operand()?;

        if sequence & (SEQUENCE_LOCK_TIME_DISABLED as i64) != 0 {
            return Ok(());
        }

        let ctx = self.require_tx_context("OP_CHECKSEQUENCEVERIFY")?;

        if ctx.tx_version() < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLocktime,
                format!("invalid transaction version: {}", ctx.tx_version()),
            ));
        }

        let tx_sequence = ctx.input_sequence(self.input_idx) as i64;
        if tx_sequence & (SEQUENCE_LOCK_TIME_DISABLED as i64) != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLocktime,
                format!(
                    "transaction sequence has sequence locktime disabled bit set: 0x{:x}",
                    tx_sequence
                ),
            ));
        }

        let lock_time_mask = SEQUENCE_LOCK_TIME_IS_SECONDS | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(
            tx_sequence & lock_time_mask,
            SEQUENCE_LOCK_TIME_IS_SECONDS,
            sequence & lock_time_mask,
        )
    }
}

fn unbalanced(pop: &ParsedOpcode) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::UnbalancedConditional,
        format!(
            "encountered opcode {} with no matching opcode to begin conditional execution",
            pop.name()
        ),
    )
}

/// Compare a required lock time against the transaction's value.
///
/// Both must be on the same side of `threshold` (block height vs time, or
/// blocks vs 512-second units for sequences) and the requirement must not
/// exceed the transaction's value.
pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold && lock_time >= threshold)
        || (tx_lock_time >= threshold && lock_time < threshold)
    {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLocktime,
            format!(
                "mismatched locktime types -- tx locktime {}, stack locktime {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLocktime,
            format!(
                "locktime requirement not satisfied -- locktime is greater than the transaction locktime: {} > {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_lock_time_types() {
        assert!(verify_lock_time(100, LOCK_TIME_THRESHOLD, 99).is_ok());
        assert!(verify_lock_time(100, LOCK_TIME_THRESHOLD, 100).is_ok());
        let err = verify_lock_time(100, LOCK_TIME_THRESHOLD, 101).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLocktime);
        // Height requirement against a timestamp lock time.
        assert!(verify_lock_time(600_000_000, LOCK_TIME_THRESHOLD, 100).is_err());
        assert!(verify_lock_time(600_000_000, LOCK_TIME_THRESHOLD, 500_000_001).is_ok());
    }
}
