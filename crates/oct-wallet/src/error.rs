//! Wallet error types.

use oct_core::error::CoreError;
use thiserror::Error;

/// Errors that can occur in wallet operations.
///
/// Cryptographic failures are reported by category only. In particular a
/// wrong password and a corrupted vault produce the same variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Mnemonic failed to parse or its checksum did not match.
    #[error("invalid mnemonic")]
    InvalidMnemonic,

    /// Requested mnemonic entropy size is not one of 128/160/192/224/256 bits.
    #[error("invalid entropy length: {0} bits")]
    InvalidEntropyLength(usize),

    /// Wrong password at unlock; the session stays locked.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Vault ciphertext failed authentication, or the key was wrong.
    #[error("vault corrupt or wrong password")]
    VaultCorruptOrWrongPassword,

    /// Private transfer was not addressed to this key or was tampered with.
    #[error("private transfer claim failed")]
    ClaimFailed,

    /// Stored encrypted balance could not be decrypted with this wallet's key.
    #[error("encrypted balance could not be decrypted")]
    BalanceDecryptionFailed,

    /// Vault already holds the configured maximum number of wallets.
    #[error("wallet limit exceeded: at most {max} wallets")]
    WalletLimitExceeded {
        /// Configured maximum.
        max: usize,
    },

    /// Another wallet already uses this name.
    #[error("duplicate wallet name: {0}")]
    DuplicateWalletName(String),

    /// Another wallet already holds this address.
    #[error("duplicate address: {0}")]
    DuplicateAddress(String),

    /// No wallet with the given id.
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    /// Wallet name is empty or too long.
    #[error("invalid wallet name")]
    InvalidWalletName,

    /// Operation requires an unlocked session.
    #[error("session is locked")]
    Locked,

    /// A persisted session is past its expiry.
    #[error("session expired")]
    SessionExpired,

    /// Password shorter than the configured minimum.
    #[error("password too short: minimum {min} characters")]
    WeakPassword {
        /// Configured minimum length.
        min: usize,
    },

    /// Decrypted vault declares a schema newer than this build understands.
    #[error("unsupported vault schema version: {0}")]
    UnsupportedSchemaVersion(u32),

    /// Encrypted blob is too short or badly encoded to be an envelope.
    #[error("malformed encrypted envelope")]
    InvalidEnvelope,

    /// Network response missing a field or not parseable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Well-formed reply in which the service refused the submission.
    #[error("rejected by network: {0}")]
    Rejected(String),

    /// Key-value store failure.
    #[error("storage: {0}")]
    Storage(String),

    /// Configuration value could not be parsed.
    #[error("config: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Key, address or signing error from oct-core.
    #[error(transparent)]
    Core(#[from] CoreError),
}
