//! Error types shared by every layer of the wallet.
use thiserror::Error;

/// Errors produced by key handling, address parsing and transaction signing.
///
/// Variants never say which byte or word failed a checksum or signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Private or public key bytes have the wrong length or are not on the curve.
    #[error("invalid key format")]
    InvalidKeyFormat,

    /// Address string failed syntactic validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Amount string is not a valid non-negative OCT value.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A field required for signing was absent from the draft.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The draft's sender is not the address of the signing key.
    #[error("sender address does not match signing key")]
    SenderMismatch,

    /// Signature bytes are malformed or do not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The OS cryptographic random source is unavailable. Fatal.
    #[error("secure random source unavailable")]
    InsufficientEntropySource,

    /// Serialization of a canonical structure failed.
    #[error("serialization: {0}")]
    Serialization(String),
}
