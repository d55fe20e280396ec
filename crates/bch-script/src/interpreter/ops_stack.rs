//! Stack manipulation operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    /// OP_TOALTSTACK.
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop()?;
        self.astack.push(data);
        Ok(())
    }

    /// OP_FROMALTSTACK.
    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.astack.pop()?;
        self.dstack.push(data);
        Ok(())
    }

    /// Duplicate the top item only when it is true.
    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let so = self.dstack.peek(0)?;
        if as_bool(&so) {
            self.dstack.push(so);
        }
        Ok(())
    }

    /// OP_PICK: copy the item `n` back to the top. The index is an
    /// arithmetic operand; a negative or too-deep index is a stack error.
    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        self.dstack.pick(stack_index(&n)?)
    }

    /// OP_ROLL: move the item `n` back to the top.
    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_int()?;
        self.dstack.roll(stack_index(&n)?)
    }
}

fn stack_index(n: &ScriptNumber) -> Result<usize, InterpreterError> {
    usize::try_from(n.value()).map_err(|_| {
        InterpreterError::new(
            InterpreterErrorCode::InvalidStackOperation,
            format!("negative stack index {}", n.value()),
        )
    })
}
