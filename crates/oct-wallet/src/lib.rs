//! # oct-wallet: keys, encrypted vault and private transfers for Octra.
//!
//! Turns a password, a recovery phrase or a raw private key into wallet
//! keypairs, keeps those keypairs encrypted at rest, and implements the
//! ephemeral-key scheme for private balances and transfers.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`config`]: `WalletConfig` (wallet limit, auto-lock timeout)
//! - [`mnemonic`]: BIP-39 generation, validation and seed stretching
//! - [`keys`]: seed → master key → Ed25519 keypair
//! - [`encryption`]: PBKDF2 vault key, AES-256-GCM envelopes, sealed vault
//! - [`vault`]: wallet collection and its invariants
//! - [`session`]: lock/unlock state machine with inactivity timeout
//! - [`private_transfer`]: encrypted balances and ephemeral-key transfers
//! - [`store`]: key-value store adapter for the sealed vault
//! - [`transport`]: parsing of network responses
//!
//! Nothing in this crate performs I/O. Values that must survive a restart
//! are returned to the caller to persist.

pub mod config;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod private_transfer;
pub mod session;
pub mod store;
pub mod transport;
pub mod vault;

// Re-exports for convenient access
pub use config::WalletConfig;
pub use encryption::{EncryptedEnvelope, Salt, SealedVault, SessionKey, VaultKey};
pub use error::WalletError;
pub use keys::{MasterKey, Seed};
pub use mnemonic::Mnemonic;
pub use private_transfer::{BalanceKey, EphemeralPublicKey, PrivateTransfer};
pub use session::{Clock, LockState, ManualClock, PersistedSession, SessionManager, SystemClock};
pub use store::{KeyValueStore, MemoryStore};
pub use transport::{BalanceResponse, PendingTransfer, SubmitResponse};
pub use vault::{Vault, WalletId, WalletRecord, WalletSource};
