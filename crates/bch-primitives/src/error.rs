/// Unified error type for all primitives operations.
///
/// Covers big-number arithmetic, curve point handling, key and signature
/// parsing, ECDSA signing and public key recovery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitivesError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid point: {0}")]
    InvalidPoint(String),

    #[error("division by zero: operand has no inverse")]
    DivisionByZero,

    #[error("value does not fit in {0} bytes")]
    Overflow(usize),

    #[error("invalid recovery id {0}, expected 0..=3")]
    InvalidRecoveryId(u8),

    #[error("no valid recovery factor found for signature")]
    NoValidRecoveryFactor,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("varint too large")]
    VarIntTooLarge,

    #[error("unexpected end of data")]
    UnexpectedEof,
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
