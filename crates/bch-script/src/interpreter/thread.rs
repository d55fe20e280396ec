//! Script execution thread: the core interpreter loop.

use log::trace;

use crate::opcodes::*;
use crate::Script;

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashType;
use super::parsed_opcode::*;
use super::scriptnum::*;
use super::stack::Stack;
use super::TxContext;

/// Index of the unlocking script in `Thread::scripts`.
const UNLOCKING_SCRIPT: usize = 0;
/// Index of the locking script in `Thread::scripts`.
const LOCKING_SCRIPT: usize = 1;
/// Index of the P2SH redeem script, once it has been loaded.
const REDEEM_SCRIPT: usize = 2;

/// The execution thread for the script interpreter.
///
/// One thread evaluates one input and is discarded afterwards.
pub struct Thread<'a> {
    /// The main data stack used during script execution.
    pub dstack: Stack,
    /// The alternate stack used by OP_TOALTSTACK and OP_FROMALTSTACK.
    pub astack: Stack,
    /// Resource limits.
    pub cfg: Config,
    /// The parsed scripts to execute (unlocking, locking, and optionally P2SH).
    pub scripts: Vec<ParsedScript>,
    /// One entry per open IF; `true` when that branch is executing.
    pub cond_stack: Vec<bool>,
    /// Copy of the data stack after the unlocking script, for P2SH.
    pub saved_first_stack: Vec<Vec<u8>>,
    /// Index of the currently executing script in the scripts array.
    pub script_idx: usize,
    /// Offset of the currently executing opcode within the current script.
    pub script_off: usize,
    /// Offset of the first opcode after the most recent OP_CODESEPARATOR.
    pub last_code_sep: usize,
    /// Running count of non-push opcodes executed in the current script.
    pub num_ops: usize,
    /// Active script verification flags controlling interpreter behavior.
    pub flags: ScriptFlags,
    /// Whether the locking script is P2SH and P2SH evaluation is enabled.
    pub bip16: bool,
    /// Optional transaction context for signature and locktime verification.
    pub tx_context: Option<&'a dyn TxContext>,
    /// The transaction input index being verified.
    pub input_idx: usize,
}

impl<'a> Thread<'a> {
    /// Create a new execution thread from unlocking and locking scripts.
    ///
    /// Validates the flag combination and script sizes, parses both scripts
    /// and applies the push-only rules before any opcode runs.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        cfg: Config,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        if flags.has_flag(ScriptFlags::CLEAN_STACK) && !flags.has_flag(ScriptFlags::P2SH) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "clean stack requires P2SH evaluation",
            ));
        }

        for (name, script) in [("unlocking", unlocking_script), ("locking", locking_script)] {
            if script.len() > cfg.max_script_size {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ScriptTooBig,
                    format!(
                        "{} script size {} is larger than the max allowed size {}",
                        name,
                        script.len(),
                        cfg.max_script_size
                    ),
                ));
            }
        }

        let uscript = parse_script(unlocking_script)?;
        let lscript = parse_script(locking_script)?;

        if flags.has_flag(ScriptFlags::SIG_PUSH_ONLY) && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only",
            ));
        }

        let bip16 = flags.has_flag(ScriptFlags::P2SH) && locking_script.is_p2sh();
        if bip16 && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only",
            ));
        }

        let verify_minimal_data = flags.has_flag(ScriptFlags::MINIMAL_DATA);

        Ok(Thread {
            dstack: Stack::new(cfg.max_number_length, verify_minimal_data),
            astack: Stack::new(cfg.max_number_length, verify_minimal_data),
            cfg,
            scripts: vec![uscript, lscript],
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx: UNLOCKING_SCRIPT,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags,
            bip16,
            tx_context,
            input_idx,
        })
    }

    /// Check if a specific script verification flag is set.
    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Check if any of the given script verification flags are set.
    pub fn has_any(&self, flags: &[ScriptFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// Return true if the current conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&c| c)
    }

    /// Execute all scripts.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while !self.step()? {}

        if self.has_flag(ScriptFlags::CLEAN_STACK) && self.dstack.depth() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!(
                    "stack contains {} unexpected items",
                    self.dstack.depth().saturating_sub(1)
                ),
            ));
        }
        Ok(())
    }

    /// Execute one opcode. Returns true once every script has finished.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        // Empty scripts still go through the end-of-script checks.
        while self.script_idx < self.scripts.len()
            && self.script_off >= self.scripts[self.script_idx].len()
        {
            self.finish_script()?;
        }
        if self.script_idx >= self.scripts.len() {
            return Ok(true);
        }

        let opcode = self.scripts[self.script_idx][self.script_off].clone();
        trace!(
            "script {} offset {}: {} (stack depth {})",
            self.script_idx,
            self.script_off,
            opcode.name(),
            self.dstack.depth()
        );

        self.execute_opcode(&opcode)?;
        self.script_off += 1;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > self.cfg.max_stack_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, self.cfg.max_stack_size
                ),
            ));
        }

        if self.script_off >= self.scripts[self.script_idx].len() {
            self.finish_script()?;
        }
        Ok(self.script_idx >= self.scripts.len())
    }

    /// Run the end-of-script checks and move on to the next script.
    fn finish_script(&mut self) -> Result<(), InterpreterError> {
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution",
            ));
        }

        // The alt stack does not survive between scripts.
        self.astack.clear();

        match self.script_idx {
            UNLOCKING_SCRIPT if self.bip16 => {
                self.saved_first_stack = self.dstack.items().to_vec();
            }
            LOCKING_SCRIPT => {
                self.check_error_condition()?;
                if self.bip16 {
                    self.load_redeem_script()?;
                }
            }
            REDEEM_SCRIPT => self.check_error_condition()?,
            _ => {}
        }

        self.script_idx += 1;
        self.script_off = 0;
        self.num_ops = 0;
        self.last_code_sep = 0;
        Ok(())
    }

    /// Replace the data stack with the unlocking script's output minus its
    /// top element, and queue that element as the redeem script.
    fn load_redeem_script(&mut self) -> Result<(), InterpreterError> {
        let mut stack = std::mem::take(&mut self.saved_first_stack);
        let redeem_bytes = stack.pop().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "pay to script hash spend has no redeem script",
            )
        })?;
        if redeem_bytes.len() > self.cfg.max_script_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "redeem script size {} is larger than the max allowed size {}",
                    redeem_bytes.len(),
                    self.cfg.max_script_size
                ),
            ));
        }
        let redeem = parse_script(&Script::from_bytes(&redeem_bytes))?;
        self.scripts.push(redeem);
        self.dstack.replace(stack);
        Ok(())
    }

    /// The stack must be non-empty with a true top element.
    fn check_error_condition(&self) -> Result<(), InterpreterError> {
        if self.dstack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution",
            ));
        }
        if !self.dstack.peek_bool(0)? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }
        Ok(())
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.data.len() > self.cfg.max_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    self.cfg.max_element_size
                ),
            ));
        }

        // Count non-push operations
        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::OpCountExceeded,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops),
                ));
            }
        }

        // Disabled opcodes fail on sight, executing branch or not.
        if pop.is_disabled(self.flags) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        let exec = self.is_branch_executing();
        if !exec && !pop.is_conditional() {
            return Ok(());
        }

        if exec && pop.is_push_data() && self.has_flag(ScriptFlags::MINIMAL_DATA) {
            pop.enforce_minimum_data_push()?;
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_0..=OP_PUSHDATA4 => {
                self.dstack.push(pop.data.clone());
                Ok(())
            }
            OP_1NEGATE => {
                self.dstack.push_int(&ScriptNumber::new(-1));
                Ok(())
            }
            op @ OP_1..=OP_16 => {
                self.dstack.push(vec![op - (OP_1 - 1)]);
                Ok(())
            }
            OP_NOP => Ok(()),
            OP_IF => self.op_if(false),
            OP_NOTIF => self.op_if(true),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),

            // Locktime
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(),

            // Stack ops
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_top(2),
            OP_2DUP => self.dstack.dup_top(2),
            OP_3DUP => self.dstack.dup_top(3),
            OP_2OVER => self.dstack.over(2),
            OP_2ROT => self.dstack.rotate(2),
            OP_2SWAP => self.dstack.swap_pairs(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let d = self.dstack.depth();
                self.dstack.push_int(&ScriptNumber::new(d as i64));
                Ok(())
            }
            OP_DROP => self.dstack.drop_top(1),
            OP_DUP => self.dstack.dup_top(1),
            OP_NIP => self.dstack.remove_at(1),
            OP_OVER => self.dstack.over(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rotate(1),
            OP_SWAP => self.dstack.swap_pairs(1),
            OP_TUCK => self.dstack.tuck(),

            // Splice
            OP_CAT => self.op_cat(),
            OP_SPLIT => self.op_split(),
            OP_NUM2BIN => self.op_num2bin(),
            OP_BIN2NUM => self.op_bin2num(),
            OP_SIZE => self.op_size(),

            // Bitwise
            OP_AND => self.op_bitwise(|a, b| a & b),
            OP_OR => self.op_bitwise(|a, b| a | b),
            OP_XOR => self.op_bitwise(|a, b| a ^ b),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(pop),

            // Arithmetic
            OP_1ADD => self.op_unary_int(|a| a + 1),
            OP_1SUB => self.op_unary_int(|a| a - 1),
            OP_NEGATE => self.op_unary_int(|a| -a),
            OP_ABS => self.op_unary_int(|a| a.abs()),
            OP_NOT => self.op_unary_int(|a| (a == 0) as i64),
            OP_0NOTEQUAL => self.op_unary_int(|a| (a != 0) as i64),
            OP_ADD => self.op_binary_int(|a, b| a + b),
            OP_SUB => self.op_binary_int(|a, b| a - b),
            OP_DIV => self.op_div(),
            OP_MOD => self.op_mod(),
            OP_BOOLAND => self.op_bool_binop(|a, b| a != 0 && b != 0),
            OP_BOOLOR => self.op_bool_binop(|a, b| a != 0 || b != 0),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a == b),
            OP_NUMEQUALVERIFY => self.op_numequalverify(pop),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| a != b),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a < b),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a > b),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a <= b),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a >= b),
            OP_MIN => self.op_binary_int(|a, b| a.min(b)),
            OP_MAX => self.op_binary_int(|a, b| a.max(b)),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 => self.op_hash(HashType::Ripemd160),
            OP_SHA1 => self.op_hash(HashType::Sha1),
            OP_SHA256 => self.op_hash(HashType::Sha256),
            OP_HASH160 => self.op_hash(HashType::Hash160),
            OP_HASH256 => self.op_hash(HashType::Hash256),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off + 1;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(pop),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(pop),
            OP_CHECKDATASIG | OP_CHECKDATASIGVERIFY
                if self.has_flag(ScriptFlags::ENABLE_CHECKDATASIG) =>
            {
                self.op_checkdatasig(pop)
            }

            // NOP opcodes
            OP_NOP1 | OP_NOP4..=OP_NOP10 => self.op_upgradable_nop(pop),

            // OP_RESERVED, OP_VER, OP_VERIF, OP_VERNOTIF, OP_RESERVED1/2 and
            // every unassigned byte
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::BadOpcode,
                format!("attempt to execute invalid opcode {}", pop.name()),
            )),
        }
    }
}
