//! Seed handling and deterministic key derivation.
//!
//! ```text
//! mnemonic ──PBKDF2-SHA512──▶ Seed (64 B)
//!          ──HMAC-SHA512(key = "Octra seed")──▶ MasterKey (first 32 B)
//!          ──Ed25519 expansion──▶ KeyPair
//! ```
//!
//! The HMAC label fixes the address space. A different label yields a
//! different, incompatible set of keys for the same phrase, so it must never
//! change.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use oct_core::KeyPair;

use crate::error::WalletError;
use crate::mnemonic::Mnemonic;

/// Domain-separation key for master key derivation.
pub const MASTER_KEY_LABEL: &[u8] = b"Octra seed";

type HmacSha512 = Hmac<Sha512>;

/// A 64-byte BIP-39 seed. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 64],
}

impl Seed {
    /// Create a seed from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// 32-byte Ed25519 signing seed derived from a [`Seed`]. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; 32],
}

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the raw key bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// HMAC-SHA512 of the seed under [`MASTER_KEY_LABEL`]; the first 32 bytes.
pub fn derive_master_key(seed: &Seed) -> MasterKey {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(MASTER_KEY_LABEL)
        .expect("HMAC accepts keys of any length");
    mac.update(seed.as_bytes());
    let mut output = Zeroizing::new([0u8; 64]);
    output.copy_from_slice(&mac.finalize().into_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&output[..32]);
    MasterKey { bytes }
}

/// Deterministic Ed25519 expansion of a master key.
pub fn keypair_from_seed(master: &MasterKey) -> KeyPair {
    KeyPair::from_secret_bytes(*master.as_bytes())
}

/// Import a raw private key (32-byte seed or 64-byte seed || public key).
pub fn keypair_from_raw_private_key(bytes: &[u8]) -> Result<KeyPair, WalletError> {
    Ok(KeyPair::from_private_key_bytes(bytes)?)
}

/// Phrase → seed → master key → keypair.
pub fn keypair_from_mnemonic(mnemonic: &Mnemonic, passphrase: &str) -> KeyPair {
    let seed = mnemonic.to_seed(passphrase);
    let master = derive_master_key(&seed);
    keypair_from_seed(&master)
}
