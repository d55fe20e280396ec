/// Error types for script operations.
///
/// Covers parsing errors, encoding failures and push-data limits. Errors
/// raised while executing a script are reported separately as
/// [`InterpreterError`](crate::interpreter::InterpreterError).
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Attempted to use `append_opcodes` for a push data opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// An ASM token was neither an opcode name nor hex data.
    #[error("invalid ASM token '{0}'")]
    InvalidAsmToken(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// Error from the primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] bch_primitives::PrimitivesError),
}
