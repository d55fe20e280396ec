//! Interpreter error types.

use std::fmt;

/// Error codes for the script interpreter.
///
/// Every halt carries exactly one code, so callers can match on the reason
/// without parsing the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpreterErrorCode {
    InvalidFlags,
    InvalidParams,

    // Resource limits
    ScriptTooBig,
    ElementTooBig,
    OpCountExceeded,
    StackOverflow,
    InvalidPubKeyCount,
    InvalidSignatureCount,

    // Evaluation outcome
    EmptyStack,
    EvalFalse,
    CleanStack,
    EarlyReturn,

    // Opcodes and parsing
    DisabledOpcode,
    BadOpcode,
    MalformedPush,
    UnbalancedConditional,
    InvalidStackOperation,
    MinimalData,
    NotPushOnly,
    DiscourageUpgradableNOPs,

    // Operand checks
    NumberTooBig,
    DivByZero,
    InvalidOperandSize,
    InvalidSplitRange,
    ImpossibleEncoding,

    // *VERIFY failures
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    CheckMultiSigVerify,
    CheckDataSigVerify,

    // Signature and key encodings
    InvalidSigHashType,
    IllegalForkID,
    SigDer,
    SigHighS,
    PubKeyType,
    NullFail,
    SigNullDummy,

    // Lock times
    NegativeLockTime,
    UnsatisfiedLocktime,
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script interpreter error with an error code and description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {description}")]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: impl Into<String>) -> Self {
        InterpreterError {
            code,
            description: description.into(),
        }
    }
}

/// Check if an error has a specific error code.
pub fn is_error_code(err: &InterpreterError, code: InterpreterErrorCode) -> bool {
    err.code == code
}
