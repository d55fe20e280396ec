/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure does not support the request (for
    /// example an input index past the end).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// SIGHASH_SINGLE was requested for an input with no output at the
    /// same index.
    #[error("invalid sighash type: {0}")]
    InvalidSighashType(String),
    /// Signing could not proceed (for example the spent output is unknown).
    #[error("signing error: {0}")]
    SigningError(String),
    /// Binary or hex (de)serialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An underlying script error (forwarded from `bch-script`).
    #[error("script error: {0}")]
    Script(#[from] bch_script::ScriptError),
    /// The interpreter rejected a spend.
    #[error("script evaluation failed: {0}")]
    Interpreter(#[from] bch_script::interpreter::InterpreterError),
    /// An underlying primitives error (forwarded from `bch-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] bch_primitives::PrimitivesError),
}
