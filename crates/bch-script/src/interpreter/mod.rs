//! Bitcoin Cash script interpreter.
//!
//! Executes an unlocking script followed by a locking script (and, for
//! pay-to-script-hash outputs, the redeem script) and decides whether the
//! spend is authorized.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers
//! provide a [`TxContext`] implementation that computes signature hashes,
//! verifies signatures and exposes the lock-time fields of the spending
//! transaction.
//!
//! # Example
//!
//! ```ignore
//! use bch_script::interpreter::{Engine, ScriptFlags};
//!
//! let engine = Engine::new();
//! engine.evaluate(
//!     &unlocking_script,
//!     &locking_script,
//!     ScriptFlags::STANDARD,
//!     Some(&checker),
//!     0,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use log::debug;

use crate::Script;
use thread::Thread;

/// The spending transaction, as seen from inside one input's scripts.
///
/// Implementors provide the data needed by OP_CHECKSIG, OP_CHECKMULTISIG,
/// OP_CHECKLOCKTIMEVERIFY and OP_CHECKSEQUENCEVERIFY.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// # Arguments
    /// * `full_sig` - DER signature followed by the sighash type byte.
    /// * `pub_key` - Serialized public key.
    /// * `sub_script` - Script code the signature commits to, already
    ///   cleaned of the signature and code separators where required.
    /// * `input_idx` - The input being verified.
    /// * `flags` - Active verification flags; selects the digest algorithm.
    ///
    /// # Returns
    /// `Ok(true)` if the signature is valid, `Ok(false)` if not, and an
    /// error if no digest could be computed.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        flags: ScriptFlags,
    ) -> Result<bool, InterpreterError>;

    /// The transaction lock time.
    fn lock_time(&self) -> u32;

    /// The transaction version.
    fn tx_version(&self) -> u32;

    /// The sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// The script execution engine.
///
/// Holds only resource limits, so one engine can be shared across threads
/// and every call builds its own execution state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    /// An engine with consensus limits.
    pub fn new() -> Self {
        Engine {
            config: Config::new(),
        }
    }

    /// An engine with custom limits.
    pub fn with_config(config: Config) -> Self {
        Engine { config }
    }

    /// The limits this engine enforces.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute unlocking + locking scripts.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking (signature) script.
    /// * `locking_script` - The spent output's locking script.
    /// * `flags` - Verification flags.
    /// * `tx_context` - Transaction context for signature and lock-time
    ///   opcodes. Scripts that use neither may pass `None`.
    /// * `input_idx` - The input index being verified.
    ///
    /// # Returns
    /// `Ok(())` if the spend is authorized, otherwise the reason it halted.
    pub fn evaluate(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let result = Thread::new(
            unlocking_script,
            locking_script,
            flags,
            self.config,
            tx_context,
            input_idx,
        )
        .and_then(|mut thread| thread.execute());
        if let Err(e) = &result {
            debug!("script evaluation for input {} failed: {}", input_idx, e);
        }
        result
    }

    /// Like [`Engine::evaluate`], reduced to pass or fail.
    pub fn verify(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> bool {
        self.evaluate(unlocking_script, locking_script, flags, tx_context, input_idx)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::opcodes::*;
    use bch_primitives::ec::PrivateKey;
    use bch_primitives::hash::{hash160, sha256};

    fn run(unlock: &[u8], lock: &[u8], flags: ScriptFlags) -> Result<(), InterpreterError> {
        Engine::new().evaluate(
            &Script::from_bytes(unlock),
            &Script::from_bytes(lock),
            flags,
            None,
            0,
        )
    }

    fn run_with(
        unlock: &Script,
        lock: &Script,
        flags: ScriptFlags,
        ctx: &dyn TxContext,
    ) -> Result<(), InterpreterError> {
        Engine::new().evaluate(unlock, lock, flags, Some(ctx), 0)
    }

    fn code(result: Result<(), InterpreterError>) -> InterpreterErrorCode {
        result.unwrap_err().code
    }

    fn push(items: &[&[u8]]) -> Script {
        let mut s = Script::new();
        for item in items {
            s.append_push_data(item).unwrap();
        }
        s
    }

    /// Accepts a signature when its first byte equals the key's first
    /// byte, and remembers the script code it was asked about.
    struct MockContext {
        lock_time: u32,
        version: u32,
        sequence: u32,
        seen_script: RefCell<Option<Script>>,
    }

    impl MockContext {
        fn new() -> Self {
            MockContext {
                lock_time: 0,
                version: 2,
                sequence: 0,
                seen_script: RefCell::new(None),
            }
        }
    }

    impl TxContext for MockContext {
        fn verify_signature(
            &self,
            full_sig: &[u8],
            pub_key: &[u8],
            sub_script: &Script,
            _input_idx: usize,
            _flags: ScriptFlags,
        ) -> Result<bool, InterpreterError> {
            *self.seen_script.borrow_mut() = Some(sub_script.clone());
            Ok(full_sig.first() == pub_key.first())
        }

        fn lock_time(&self) -> u32 {
            self.lock_time
        }

        fn tx_version(&self) -> u32 {
            self.version
        }

        fn input_sequence(&self, _input_idx: usize) -> u32 {
            self.sequence
        }
    }

    #[test]
    fn test_op_1_op_1_op_equal() {
        assert!(run(&[OP_1], &[OP_1, OP_EQUAL], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_op_1_op_2_op_equal_fails() {
        let result = run(&[OP_1], &[OP_2, OP_EQUAL], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::EvalFalse);
    }

    #[test]
    fn test_empty_both_scripts() {
        assert_eq!(code(run(&[], &[], ScriptFlags::NONE)), InterpreterErrorCode::EmptyStack);
    }

    #[test]
    fn test_arithmetic() {
        assert!(run(&[OP_2, OP_3], &[OP_ADD, OP_5, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_5, OP_3], &[OP_SUB, OP_2, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_1], &[OP_NEGATE, OP_1NEGATE, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_3, OP_2, OP_5], &[OP_WITHIN], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_2, OP_3], &[OP_MAX, OP_3, OP_NUMEQUAL], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_oversized_operand() {
        // Five-byte operand to OP_1ADD.
        let unlock = [0x05, 1, 2, 3, 4, 5];
        let result = run(&unlock, &[OP_1ADD], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::InvalidStackOperation);
    }

    #[test]
    fn test_hash160_path() {
        let pubkey = vec![0x02; 33];
        let unlock = push(&[&pubkey]);
        let mut lock = Script::from_bytes(&[OP_DUP, OP_HASH160]);
        lock.append_push_data(&hash160(&pubkey)).unwrap();
        lock.append_opcodes(&[OP_EQUALVERIFY, OP_SIZE]).unwrap();
        lock.append_push_data(&[33]).unwrap();
        lock.append_opcodes(&[OP_EQUALVERIFY, OP_DROP, OP_1]).unwrap();
        let result = Engine::new().evaluate(&unlock, &lock, ScriptFlags::NONE, None, 0);
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_hash_digests() {
        let mut lock = Script::from_bytes(&[OP_SHA256]);
        lock.append_push_data(&sha256(b"abc")).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        let result = Engine::new().evaluate(&push(&[b"abc"]), &lock, ScriptFlags::NONE, None, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn test_if_else_endif() {
        let lock = [OP_IF, OP_2, OP_ELSE, OP_3, OP_ENDIF, OP_2, OP_EQUAL];
        assert!(run(&[OP_1], &lock, ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_0], &lock, ScriptFlags::NONE).is_err());
        assert!(run(&[OP_0], &[OP_NOTIF, OP_1, OP_ELSE, OP_0, OP_ENDIF], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_nested_if() {
        let lock = [OP_IF, OP_0, OP_IF, OP_0, OP_ELSE, OP_1, OP_ENDIF, OP_ENDIF];
        assert!(run(&[OP_1], &lock, ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_unbalanced_conditionals() {
        let result = run(&[OP_1], &[OP_IF, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::UnbalancedConditional);
        let result = run(&[OP_1], &[OP_ENDIF], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::UnbalancedConditional);
        let result = run(&[OP_1], &[OP_ELSE, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::UnbalancedConditional);
        // A conditional cannot span the unlocking and locking scripts.
        let result = run(&[OP_1, OP_IF], &[OP_ENDIF, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::UnbalancedConditional);
    }

    #[test]
    fn test_op_return() {
        let result = run(&[OP_1], &[OP_RETURN], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::EarlyReturn);
        // Not reached inside an untaken branch.
        assert!(run(&[OP_0], &[OP_IF, OP_RETURN, OP_ENDIF, OP_1], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_op_verify_fail() {
        let result = run(&[OP_0], &[OP_VERIFY, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::Verify);
    }

    #[test]
    fn test_stack_ops() {
        assert!(run(&[OP_1, OP_2, OP_3], &[OP_DEPTH, OP_3, OP_EQUALVERIFY, OP_ROT, OP_1, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_1, OP_2], &[OP_1, OP_PICK, OP_1, OP_EQUALVERIFY, OP_2DROP, OP_1], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_1, OP_2], &[OP_1, OP_ROLL, OP_1, OP_EQUALVERIFY, OP_2, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_1, OP_2], &[OP_TUCK, OP_DROP, OP_DROP], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_5], &[OP_TOALTSTACK, OP_FROMALTSTACK, OP_5, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_1], &[OP_IFDUP, OP_EQUAL], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_alt_stack_cleared_between_scripts() {
        let result = run(&[OP_1, OP_TOALTSTACK], &[OP_FROMALTSTACK], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::InvalidStackOperation);
    }

    #[test]
    fn test_disabled_opcodes() {
        let result = run(&[OP_2, OP_3], &[OP_MUL, OP_6, OP_EQUAL], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::DisabledOpcode);
        let result = run(&[OP_1], &[OP_INVERT], ScriptFlags::ENABLE_MONOLITH_OPCODES);
        assert_eq!(code(result), InterpreterErrorCode::DisabledOpcode);
    }

    #[test]
    fn test_disabled_opcode_in_untaken_branch() {
        let result = run(&[OP_0], &[OP_IF, OP_MUL, OP_ENDIF, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::DisabledOpcode);
        let result = run(&[OP_0], &[OP_IF, OP_CAT, OP_ENDIF, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::DisabledOpcode);
        let ok = run(&[OP_0], &[OP_IF, OP_CAT, OP_ENDIF, OP_1], ScriptFlags::ENABLE_MONOLITH_OPCODES);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_verif_in_untaken_branch() {
        let result = run(&[OP_0], &[OP_IF, OP_VERIF, OP_ENDIF, OP_1], ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::BadOpcode);
        // OP_VER is only rejected when executed.
        assert!(run(&[OP_0], &[OP_IF, OP_VER, OP_ENDIF, OP_1], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_op_count_limit() {
        let mut lock = vec![OP_NOP; config::MAX_OPS_PER_SCRIPT];
        assert!(run(&[OP_1], &lock, ScriptFlags::NONE).is_ok());
        lock.push(OP_NOP);
        let result = run(&[OP_1], &lock, ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::OpCountExceeded);
    }

    #[test]
    fn test_push_opcodes_do_not_count() {
        let lock = vec![OP_1; 300];
        assert!(run(&[OP_1], &lock, ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_stack_overflow() {
        let lock = vec![OP_1; 1000];
        let result = run(&[OP_1], &lock, ScriptFlags::NONE);
        assert_eq!(code(result), InterpreterErrorCode::StackOverflow);
        assert!(run(&[], &lock, ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_custom_config() {
        let cfg = Config {
            max_ops: 2,
            ..Config::default()
        };
        let engine = Engine::with_config(cfg);
        let unlock = Script::from_bytes(&[OP_1]);
        assert!(engine.verify(&unlock, &Script::from_bytes(&[OP_DUP, OP_DROP]), ScriptFlags::NONE, None, 0));
        assert!(!engine.verify(&unlock, &Script::from_bytes(&[OP_DUP, OP_DROP, OP_NOP]), ScriptFlags::NONE, None, 0));
    }

    #[test]
    fn test_monolith_ops() {
        let flags = ScriptFlags::ENABLE_MONOLITH_OPCODES;

        let mut lock = Script::from_bytes(&[OP_CAT]);
        lock.append_push_data(&[0xaa, 0xbb]).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        let unlock = push(&[&[0xaa], &[0xbb]]);
        assert!(Engine::new().verify(&unlock, &lock, flags, None, 0));
        let disabled = Engine::new().evaluate(&unlock, &lock, ScriptFlags::NONE, None, 0);
        assert_eq!(code(disabled), InterpreterErrorCode::DisabledOpcode);

        let mut lock = Script::from_bytes(&[OP_1, OP_SPLIT]);
        lock.append_push_data(&[0xbb, 0xcc]).unwrap();
        lock.append_opcodes(&[OP_EQUALVERIFY]).unwrap();
        lock.append_push_data(&[0xaa]).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        assert!(Engine::new().verify(&push(&[&[0xaa, 0xbb, 0xcc]]), &lock, flags, None, 0));

        let mut lock = Script::from_bytes(&[OP_NUM2BIN]);
        lock.append_push_data(&[2, 0, 0, 0]).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        assert!(Engine::new().verify(&Script::from_bytes(&[OP_2, OP_4]), &lock, flags, None, 0));

        let unlock = push(&[&[0x05, 0x00, 0x00]]);
        assert!(Engine::new().verify(&unlock, &Script::from_bytes(&[OP_BIN2NUM, OP_5, OP_EQUAL]), flags, None, 0));

        assert!(run(&[OP_7, OP_3], &[OP_DIV, OP_2, OP_EQUAL], flags).is_ok());
        assert!(run(&[OP_7, OP_3], &[OP_MOD, OP_1, OP_EQUAL], flags).is_ok());
        assert_eq!(code(run(&[OP_1, OP_0], &[OP_DIV], flags)), InterpreterErrorCode::DivByZero);
        assert_eq!(code(run(&[OP_1, OP_0], &[OP_MOD], flags)), InterpreterErrorCode::DivByZero);

        assert!(run(&[OP_3, OP_5], &[OP_AND, OP_1, OP_EQUAL], flags).is_ok());
        assert!(run(&[OP_3, OP_5], &[OP_XOR, OP_6, OP_EQUAL], flags).is_ok());
        let result = run(&[OP_3, OP_0], &[OP_OR], flags);
        assert_eq!(code(result), InterpreterErrorCode::InvalidOperandSize);
    }

    #[test]
    fn test_minimal_data() {
        // 5 pushed as a one-byte data push instead of OP_5.
        let unlock = [0x01, 0x05];
        assert!(run(&unlock, &[OP_5, OP_EQUAL], ScriptFlags::NONE).is_ok());
        let result = run(&unlock, &[OP_5, OP_EQUAL], ScriptFlags::MINIMAL_DATA);
        assert_eq!(code(result), InterpreterErrorCode::MinimalData);
    }

    #[test]
    fn test_sig_push_only() {
        let result = run(&[OP_1, OP_DUP], &[OP_EQUAL], ScriptFlags::SIG_PUSH_ONLY);
        assert_eq!(code(result), InterpreterErrorCode::NotPushOnly);
        assert!(run(&[OP_1, OP_DUP], &[OP_EQUAL], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_upgradable_nops() {
        assert!(run(&[OP_1], &[OP_NOP4], ScriptFlags::NONE).is_ok());
        let result = run(&[OP_1], &[OP_NOP4], ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS);
        assert_eq!(code(result), InterpreterErrorCode::DiscourageUpgradableNOPs);
    }

    fn p2sh_lock(redeem: &Script) -> Script {
        let mut lock = Script::from_bytes(&[OP_HASH160]);
        lock.append_push_data(&hash160(redeem.to_bytes())).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        lock
    }

    #[test]
    fn test_p2sh() {
        let redeem = Script::from_bytes(&[OP_2, OP_EQUAL]);
        let lock = p2sh_lock(&redeem);
        assert!(lock.is_p2sh());

        let mut good = Script::from_bytes(&[OP_2]);
        good.append_push_data(redeem.to_bytes()).unwrap();
        let mut bad = Script::from_bytes(&[OP_3]);
        bad.append_push_data(redeem.to_bytes()).unwrap();

        let engine = Engine::new();
        assert!(engine.verify(&good, &lock, ScriptFlags::P2SH, None, 0));
        let result = engine.evaluate(&bad, &lock, ScriptFlags::P2SH, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::EvalFalse);
        // Without P2SH evaluation only the hash is checked.
        assert!(engine.verify(&bad, &lock, ScriptFlags::NONE, None, 0));
    }

    #[test]
    fn test_p2sh_requires_push_only() {
        let redeem = Script::from_bytes(&[OP_1]);
        let lock = p2sh_lock(&redeem);
        let mut unlock = Script::from_bytes(&[OP_1, OP_DROP]);
        unlock.append_push_data(redeem.to_bytes()).unwrap();
        let result = Engine::new().evaluate(&unlock, &lock, ScriptFlags::P2SH, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::NotPushOnly);
    }

    #[test]
    fn test_clean_stack() {
        let result = run(&[OP_1], &[OP_1], ScriptFlags::CLEAN_STACK);
        assert_eq!(code(result), InterpreterErrorCode::InvalidFlags);

        let flags = ScriptFlags::CLEAN_STACK | ScriptFlags::P2SH;
        let result = run(&[OP_1, OP_1], &[OP_1], flags);
        assert_eq!(code(result), InterpreterErrorCode::CleanStack);
        assert!(run(&[OP_1], &[OP_1, OP_EQUAL], flags).is_ok());
    }

    #[test]
    fn test_mandatory_rejects_leftover_items() {
        let result = run(&[OP_1], &[OP_1], ScriptFlags::MANDATORY);
        assert_eq!(code(result), InterpreterErrorCode::CleanStack);
        // Relaxed flag sets only look at the top element.
        assert!(run(&[OP_1], &[OP_1], ScriptFlags::NONE).is_ok());
        assert!(run(&[OP_1], &[OP_1, OP_EQUAL], ScriptFlags::MANDATORY).is_ok());
    }

    #[test]
    fn test_mandatory_requires_push_only() {
        let result = run(&[OP_1, OP_DUP], &[OP_EQUAL], ScriptFlags::MANDATORY);
        assert_eq!(code(result), InterpreterErrorCode::NotPushOnly);
    }

    fn cltv_lock(n: u8, op: u8) -> Script {
        let mut lock = Script::new();
        lock.append_minimal_push(&[n]).unwrap();
        lock.append_opcodes(&[op, OP_DROP, OP_1]).unwrap();
        lock
    }

    #[test]
    fn test_check_lock_time_verify() {
        let flags = ScriptFlags::CHECK_LOCK_TIME_VERIFY;
        let mut ctx = MockContext::new();
        ctx.lock_time = 100;
        let unlock = Script::new();

        assert!(run_with(&unlock, &cltv_lock(99, OP_CHECKLOCKTIMEVERIFY), flags, &ctx).is_ok());
        assert!(run_with(&unlock, &cltv_lock(100, OP_CHECKLOCKTIMEVERIFY), flags, &ctx).is_ok());
        let result = run_with(&unlock, &cltv_lock(101, OP_CHECKLOCKTIMEVERIFY), flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::UnsatisfiedLocktime);

        ctx.sequence = 0xffff_ffff;
        let result = run_with(&unlock, &cltv_lock(99, OP_CHECKLOCKTIMEVERIFY), flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::UnsatisfiedLocktime);

        // No context to compare against.
        let result = Engine::new().evaluate(&unlock, &cltv_lock(99, OP_CHECKLOCKTIMEVERIFY), flags, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::InvalidParams);

        // Without the flag the opcode is NOP2.
        let result = Engine::new().evaluate(&unlock, &cltv_lock(200, OP_CHECKLOCKTIMEVERIFY), ScriptFlags::NONE, None, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn test_negative_lock_time() {
        let lock = [OP_1NEGATE, OP_CHECKLOCKTIMEVERIFY, OP_DROP, OP_1];
        let ctx = MockContext::new();
        let result = run_with(
            &Script::new(),
            &Script::from_bytes(&lock),
            ScriptFlags::CHECK_LOCK_TIME_VERIFY,
            &ctx,
        );
        assert_eq!(code(result), InterpreterErrorCode::NegativeLockTime);
    }

    #[test]
    fn test_check_sequence_verify() {
        let flags = ScriptFlags::CHECK_SEQUENCE_VERIFY;
        let mut ctx = MockContext::new();
        ctx.sequence = 10;
        let unlock = Script::new();

        assert!(run_with(&unlock, &cltv_lock(10, OP_CHECKSEQUENCEVERIFY), flags, &ctx).is_ok());
        let result = run_with(&unlock, &cltv_lock(11, OP_CHECKSEQUENCEVERIFY), flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::UnsatisfiedLocktime);

        ctx.version = 1;
        let result = run_with(&unlock, &cltv_lock(10, OP_CHECKSEQUENCEVERIFY), flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::UnsatisfiedLocktime);
    }

    #[test]
    fn test_checksig_with_context() {
        let ctx = MockContext::new();
        let lock = Script::from_bytes(&[OP_CHECKSIG]);

        assert!(run_with(&push(&[&[7, 0x01], &[7]]), &lock, ScriptFlags::NONE, &ctx).is_ok());

        let wrong = push(&[&[8, 0x01], &[7]]);
        let result = run_with(&wrong, &lock, ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::EvalFalse);
        let result = run_with(&wrong, &lock, ScriptFlags::NULL_FAIL, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::NullFail);

        // An empty signature is simply false, even under NULL_FAIL.
        let fresh = MockContext::new();
        let empty = Script::from_bytes(&[OP_0, 0x01, 7]);
        let lock = Script::from_bytes(&[OP_CHECKSIG, OP_NOT]);
        assert!(run_with(&empty, &lock, ScriptFlags::NULL_FAIL, &fresh).is_ok());
        assert!(fresh.seen_script.borrow().is_none());
    }

    #[test]
    fn test_checksigverify() {
        let ctx = MockContext::new();
        let lock = Script::from_bytes(&[OP_CHECKSIGVERIFY, OP_1]);
        assert!(run_with(&push(&[&[7, 0x01], &[7]]), &lock, ScriptFlags::NONE, &ctx).is_ok());
        let result = run_with(&push(&[&[8, 0x01], &[7]]), &lock, ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::CheckSigVerify);
    }

    #[test]
    fn test_checksig_script_code() {
        let ctx = MockContext::new();
        let sig: &[u8] = &[7, 0x01];

        // The signature itself is removed from the script code.
        let mut lock = push(&[sig]);
        lock.append_opcodes(&[OP_DROP, OP_CHECKSIG]).unwrap();
        assert!(run_with(&push(&[sig, &[7]]), &lock, ScriptFlags::NONE, &ctx).is_ok());
        assert_eq!(
            ctx.seen_script.borrow().as_ref().unwrap().to_bytes(),
            &[OP_DROP, OP_CHECKSIG]
        );

        // Only the part after the last executed code separator is committed.
        let lock = Script::from_bytes(&[OP_NOP, OP_CODESEPARATOR, OP_DUP, OP_DROP, OP_CHECKSIG]);
        assert!(run_with(&push(&[sig, &[7]]), &lock, ScriptFlags::NONE, &ctx).is_ok());
        assert_eq!(
            ctx.seen_script.borrow().as_ref().unwrap().to_bytes(),
            &[OP_DUP, OP_DROP, OP_CHECKSIG]
        );
    }

    #[test]
    fn test_strict_encoding_rejects_bad_signatures() {
        let ctx = MockContext::new();
        let lock = Script::from_bytes(&[OP_CHECKSIG]);
        // Not DER.
        let result = run_with(&push(&[&[7, 0x01], &[7]]), &lock, ScriptFlags::DER_SIGNATURES, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::SigDer);

        // Valid DER, undefined hash type.
        let der_sig: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x04];
        let pub_key = [0x02; 33];
        let result = run_with(&push(&[der_sig, &pub_key]), &lock, ScriptFlags::STRICT_ENCODING, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::InvalidSigHashType);

        // Fork id required when enabled.
        let flags = ScriptFlags::STRICT_ENCODING | ScriptFlags::ENABLE_SIGHASH_FORKID;
        let legacy: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01];
        let result = run_with(&push(&[legacy, &pub_key]), &lock, flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::IllegalForkID);

        // Bad public key.
        let forkid: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x41];
        let result = run_with(&push(&[forkid, &[0x05; 33]]), &lock, flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::PubKeyType);
    }

    #[test]
    fn test_low_s_rule_reads_out_of_range_values() {
        let ctx = MockContext::new();
        let lock = Script::from_bytes(&[OP_CHECKSIG]);
        let pub_key = [0x02; 33];

        // r = 0 is well-formed DER; it fails at verification, not parsing.
        let zero_r: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x01, 0x01];
        let result = run_with(&push(&[zero_r, &pub_key]), &lock, ScriptFlags::LOW_S, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::EvalFalse);
        let flags = ScriptFlags::LOW_S | ScriptFlags::NULL_FAIL;
        let result = run_with(&push(&[zero_r, &pub_key]), &lock, flags, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::NullFail);

        // s above the group order is high, not malformed.
        let mut big_s = vec![0x30, 0x26, 0x02, 0x01, 0x01, 0x02, 0x21, 0x00];
        big_s.extend_from_slice(&[0xff; 32]);
        big_s.push(0x01);
        let result = run_with(&push(&[big_s.as_slice(), &pub_key]), &lock, ScriptFlags::LOW_S, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::SigHighS);
    }

    fn multisig_lock(m: u8, keys: &[&[u8]]) -> Script {
        let mut lock = Script::from_bytes(&[OP_1 + m - 1]);
        for key in keys {
            lock.append_push_data(key).unwrap();
        }
        lock.append_opcodes(&[OP_1 + keys.len() as u8 - 1, OP_CHECKMULTISIG]).unwrap();
        lock
    }

    #[test]
    fn test_checkmultisig_order() {
        let ctx = MockContext::new();
        let lock = multisig_lock(2, &[&[1], &[2], &[3]]);

        let mut in_order = Script::from_bytes(&[OP_0]);
        in_order.append_push_data(&[1, 0x01]).unwrap();
        in_order.append_push_data(&[3, 0x01]).unwrap();
        assert!(run_with(&in_order, &lock, ScriptFlags::NONE, &ctx).is_ok());

        let mut reversed = Script::from_bytes(&[OP_0]);
        reversed.append_push_data(&[3, 0x01]).unwrap();
        reversed.append_push_data(&[1, 0x01]).unwrap();
        let result = run_with(&reversed, &lock, ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::EvalFalse);
        let result = run_with(&reversed, &lock, ScriptFlags::NULL_FAIL, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::NullFail);
    }

    #[test]
    fn test_checkmultisig_dummy_and_counts() {
        let ctx = MockContext::new();
        let lock = multisig_lock(1, &[&[1], &[2]]);

        let mut unlock = Script::from_bytes(&[OP_1]);
        unlock.append_push_data(&[2, 0x01]).unwrap();
        assert!(run_with(&unlock, &lock, ScriptFlags::NONE, &ctx).is_ok());
        let result = run_with(&unlock, &lock, ScriptFlags::NULL_DUMMY, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::SigNullDummy);

        // Missing dummy element.
        let mut no_dummy = Script::new();
        no_dummy.append_push_data(&[2, 0x01]).unwrap();
        let result = run_with(&no_dummy, &lock, ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::InvalidStackOperation);

        let too_many = Script::from_bytes(&[0x01, 21, OP_CHECKMULTISIG]);
        let result = run_with(&Script::new(), &too_many, ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::InvalidPubKeyCount);

        let sigs_over_keys = Script::from_bytes(&[OP_0, OP_2, OP_1, OP_1, OP_CHECKMULTISIG]);
        let result = run_with(&Script::new(), &sigs_over_keys, ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::InvalidSignatureCount);

        // 0-of-0 succeeds.
        let empty = Script::from_bytes(&[OP_0, OP_0, OP_0, OP_CHECKMULTISIG]);
        assert!(run_with(&Script::new(), &empty, ScriptFlags::NONE, &ctx).is_ok());
    }

    #[test]
    fn test_checkmultisig_counts_keys_as_ops() {
        let ctx = MockContext::new();
        let mut lock = vec![OP_NOP; config::MAX_OPS_PER_SCRIPT - 20];
        lock.extend_from_slice(&[OP_0, OP_0, 0x01, 20, OP_CHECKMULTISIG]);
        // Twenty keys are read from a stack that only holds counts.
        let result = run_with(&Script::new(), &Script::from_bytes(&lock), ScriptFlags::NONE, &ctx);
        assert_eq!(code(result), InterpreterErrorCode::OpCountExceeded);
    }

    fn data_sig_fixture(message: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let key = PrivateKey::from_bytes(&[0x11; 32]).unwrap();
        let sig = key.sign(&sha256(message)).unwrap();
        (sig.to_der(), key.pub_key().to_compressed().to_vec())
    }

    #[test]
    fn test_checkdatasig() {
        let flags = ScriptFlags::ENABLE_CHECKDATASIG
            | ScriptFlags::STRICT_ENCODING
            | ScriptFlags::LOW_S
            | ScriptFlags::NULL_FAIL;
        let (der, pub_key) = data_sig_fixture(b"hello");
        let mut lock = push(&[&pub_key]);
        lock.append_opcodes(&[OP_CHECKDATASIG]).unwrap();
        let engine = Engine::new();

        assert!(engine.verify(&push(&[&der, b"hello"]), &lock, flags, None, 0));

        let result = engine.evaluate(&push(&[&der, b"other"]), &lock, flags, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::NullFail);

        let mut empty_sig = Script::from_bytes(&[OP_0]);
        empty_sig.append_push_data(b"other").unwrap();
        let result = engine.evaluate(&empty_sig, &lock, flags, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::EvalFalse);

        let result = engine.evaluate(&push(&[&der, b"hello"]), &lock, ScriptFlags::NONE, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::BadOpcode);
    }

    #[test]
    fn test_checkdatasigverify() {
        let flags = ScriptFlags::ENABLE_CHECKDATASIG;
        let (der, pub_key) = data_sig_fixture(b"data");
        let mut lock = push(&[&pub_key]);
        lock.append_opcodes(&[OP_CHECKDATASIGVERIFY, OP_1]).unwrap();
        let engine = Engine::new();

        assert!(engine.verify(&push(&[&der, b"data"]), &lock, flags, None, 0));
        let result = engine.evaluate(&push(&[&der, b"datum"]), &lock, flags, None, 0);
        assert_eq!(code(result), InterpreterErrorCode::CheckDataSigVerify);
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = Engine::new();
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                std::thread::spawn(move || {
                    let unlock = Script::from_bytes(&[OP_1 + i]);
                    let lock = Script::from_bytes(&[OP_1 + i, OP_EQUAL]);
                    engine.verify(&unlock, &lock, ScriptFlags::STANDARD, None, 0)
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
