//! # oct-core
//! Foundation types for the Octra wallet: keys, addresses, amounts and
//! canonical transaction signing.
//!
//! Everything here is a pure function of its inputs plus the OS random
//! source. Nothing keeps secret state between calls.

pub mod address;
pub mod constants;
pub mod crypto;
pub mod entropy;
pub mod error;
pub mod transaction;
pub mod types;

pub use address::Address;
pub use crypto::{KeyPair, PublicKey, SecretKeyBytes, TxSignature};
pub use error::CoreError;
pub use transaction::{SignedTransaction, TransactionDraft};
pub use types::{Amount, FeeTier};
