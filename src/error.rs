use thiserror::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum Error {
    /// PSS padding constraints cannot be met for the modulus size
    #[error("Encoding error")]
    EncodingError,
    #[error("Message too long")]
    MessageTooLong,
    #[error("Mask too long")]
    MaskTooLong,
    /// A blinded message, blind signature or inverse is not `kLen` bytes
    #[error("Unexpected input size")]
    UnexpectedInputSize,
    /// The decoded integer is not smaller than the modulus
    #[error("Invalid message length")]
    InvalidMessageLength,
    #[error("Invalid blind")]
    InvalidBlind,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Key type mismatch")]
    KeyTypeMismatch,
    #[error("Empty secret or context")]
    EmptySecretOrContext,
    #[error("Invalid encoding")]
    InvalidEncoding,
    #[error("Integer too large")]
    IntegerTooLarge,
    #[error("Not invertible")]
    NotInvertible,
    #[error("Invalid key")]
    InvalidKey,
    #[error("Unsupported parameters")]
    UnsupportedParameters,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("Expiry out of range")]
    ExpiryOutOfRange,
    #[error("No keys available")]
    NoKeys,
    #[error("Configuration error")]
    Config,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
