//! Encrypted balances and ephemeral-key private transfers.
//!
//! Two independent schemes share the AES-256-GCM envelope from
//! [`crate::encryption`]:
//!
//! - **Own balance.** A wallet encrypts its private balance under a key
//!   derived from its own secret ([`balance_key`]). The derivation is stable,
//!   so the wallet can always decrypt what it stored earlier.
//! - **Private transfer.** The sender draws a fresh X25519 ephemeral key for
//!   every transfer and agrees a secret with the recipient's key:
//!
//! ```text
//! shared   = X25519(ephemeral_secret, montgomery(recipient_pk))
//! key      = HKDF-SHA256(salt, shared, info = ephemeral_pk || montgomery(recipient_pk))
//! envelope = AES-256-GCM(key, amount, aad = label || sender_address || recipient_pk)
//! ```
//!
//! The recipient recomputes `shared` from its own secret scalar and the
//! ephemeral public key that travels with the transfer. Reusing an ephemeral
//! key would give two transfers the same symmetric key, so none is ever
//! reused: the ephemeral secret lives only inside [`create_private_transfer`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hkdf::Hkdf;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use oct_core::{Address, Amount, CoreError, KeyPair, PublicKey, entropy};

use crate::encryption::{self, EncryptedEnvelope, KEY_LEN};
use crate::error::WalletError;

/// Label hashed with the wallet seed to form the balance key.
pub const BALANCE_KEY_LABEL: &[u8] = b"octra_encrypted_balance_v2";

/// Prefix of the encrypted-balance wire string.
pub const ENCRYPTED_BALANCE_PREFIX: &str = "v2|";

const BALANCE_AAD: &[u8] = b"oct-wallet/balance/v2";
const TRANSFER_HKDF_SALT: &[u8] = b"oct-wallet/private-transfer/v1";
const TRANSFER_AAD_LABEL: &[u8] = b"oct-wallet/private-transfer/aad/v1";

// --- Own balance ---

/// Symmetric key for a wallet's own encrypted balance. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BalanceKey([u8; KEY_LEN]);

impl BalanceKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BalanceKey([REDACTED])")
    }
}

/// SHA-256 over [`BALANCE_KEY_LABEL`] and the wallet's 32-byte seed.
pub fn balance_key(keypair: &KeyPair) -> BalanceKey {
    let secret = keypair.secret_bytes();
    let mut hasher = Sha256::new();
    hasher.update(BALANCE_KEY_LABEL);
    hasher.update(secret.as_bytes());
    BalanceKey(hasher.finalize().into())
}

/// Encrypt a balance under the wallet's own key.
pub fn encrypt_balance(amount: Amount, key: &BalanceKey) -> Result<EncryptedEnvelope, WalletError> {
    let plaintext = Zeroizing::new(amount.micro().to_string());
    encryption::seal(key.as_bytes(), plaintext.as_bytes(), BALANCE_AAD)
}

/// Decrypt a balance stored with [`encrypt_balance`].
pub fn decrypt_balance(envelope: &EncryptedEnvelope, key: &BalanceKey) -> Result<Amount, WalletError> {
    let plaintext = encryption::open(key.as_bytes(), envelope, BALANCE_AAD)
        .map_err(|_| WalletError::BalanceDecryptionFailed)?;
    parse_micro(&plaintext).ok_or(WalletError::BalanceDecryptionFailed)
}

/// `"v2|" + base64(iv || ciphertext+tag)`.
pub fn encode_encrypted_balance(envelope: &EncryptedEnvelope) -> String {
    format!("{ENCRYPTED_BALANCE_PREFIX}{}", STANDARD.encode(envelope.to_bytes()))
}

/// Parse the encrypted-balance wire string.
pub fn decode_encrypted_balance(encoded: &str) -> Result<EncryptedEnvelope, WalletError> {
    let body = encoded
        .trim()
        .strip_prefix(ENCRYPTED_BALANCE_PREFIX)
        .ok_or(WalletError::InvalidEnvelope)?;
    let bytes = STANDARD.decode(body).map_err(|_| WalletError::InvalidEnvelope)?;
    EncryptedEnvelope::from_bytes(&bytes)
}

// --- Private transfers ---

/// X25519 public key of a transfer's one-time keypair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EphemeralPublicKey([u8; 32]);

impl EphemeralPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, WalletError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| WalletError::Core(CoreError::InvalidKeyFormat))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::Core(CoreError::InvalidKeyFormat))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for EphemeralPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EphemeralPublicKey({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for EphemeralPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for EphemeralPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// A private transfer as produced by the sender and consumed by the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateTransfer {
    /// Address of the sending wallet. Bound into the envelope's associated data.
    pub sender: Address,
    /// One-time key the recipient combines with its own secret.
    pub ephemeral_public_key: EphemeralPublicKey,
    /// Amount encrypted under the agreed key.
    pub encrypted_amount: EncryptedEnvelope,
    /// Hex SHA-256 over the ephemeral key and envelope bytes.
    pub transfer_id: String,
}

impl PrivateTransfer {
    /// Recompute the id from the ephemeral key and envelope.
    pub fn compute_id(ephemeral: &EphemeralPublicKey, envelope: &EncryptedEnvelope) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ephemeral.as_bytes());
        hasher.update(envelope.to_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Encrypt `amount` for `recipient` with a fresh ephemeral key.
///
/// Fails with `InvalidAmount` for zero, with `InvalidKeyFormat` when the
/// recipient key yields a non-contributory shared secret, and with
/// `InsufficientEntropySource` when no secure randomness is available.
pub fn create_private_transfer(
    sender: &KeyPair,
    recipient: &PublicKey,
    amount: Amount,
) -> Result<PrivateTransfer, WalletError> {
    if amount.is_zero() {
        return Err(CoreError::InvalidAmount("private transfer amount must be positive".into()).into());
    }

    let ephemeral_bytes = entropy::random_secret::<32>()?;
    let ephemeral_secret = StaticSecret::from(*ephemeral_bytes);
    let ephemeral_public = EphemeralPublicKey(X25519PublicKey::from(&ephemeral_secret).to_bytes());

    let recipient_x = recipient.to_montgomery_bytes();
    let shared = ephemeral_secret.diffie_hellman(&X25519PublicKey::from(recipient_x));
    if !shared.was_contributory() {
        return Err(CoreError::InvalidKeyFormat.into());
    }

    let key = transfer_key(shared.as_bytes(), &ephemeral_public, &recipient_x);
    let sender_address = sender.address();
    let plaintext = Zeroizing::new(amount.micro().to_string());
    let encrypted_amount = encryption::seal(
        &key,
        plaintext.as_bytes(),
        &transfer_aad(&sender_address, recipient),
    )?;
    let transfer_id = PrivateTransfer::compute_id(&ephemeral_public, &encrypted_amount);

    debug!(transfer_id = %transfer_id, sender = %sender_address, "private transfer created");
    Ok(PrivateTransfer {
        sender: sender_address,
        ephemeral_public_key: ephemeral_public,
        encrypted_amount,
        transfer_id,
    })
}

/// Decrypt a transfer addressed to `recipient`.
///
/// Every failure (wrong recipient, edited sender, tampered envelope or id)
/// is reported as [`WalletError::ClaimFailed`].
pub fn claim_private_transfer(
    recipient: &KeyPair,
    transfer: &PrivateTransfer,
) -> Result<Amount, WalletError> {
    let expected_id =
        PrivateTransfer::compute_id(&transfer.ephemeral_public_key, &transfer.encrypted_amount);
    if expected_id != transfer.transfer_id {
        return Err(WalletError::ClaimFailed);
    }

    let secret = StaticSecret::from(*recipient.dh_secret_bytes());
    let shared = secret.diffie_hellman(&X25519PublicKey::from(*transfer.ephemeral_public_key.as_bytes()));
    if !shared.was_contributory() {
        return Err(WalletError::ClaimFailed);
    }

    let recipient_pk = recipient.public_key();
    let key = transfer_key(
        shared.as_bytes(),
        &transfer.ephemeral_public_key,
        &recipient_pk.to_montgomery_bytes(),
    );
    let plaintext = encryption::open(
        &key,
        &transfer.encrypted_amount,
        &transfer_aad(&transfer.sender, &recipient_pk),
    )
    .map_err(|_| WalletError::ClaimFailed)?;

    let amount = parse_micro(&plaintext).ok_or(WalletError::ClaimFailed)?;
    if amount.is_zero() {
        return Err(WalletError::ClaimFailed);
    }
    debug!(transfer_id = %transfer.transfer_id, "private transfer claimed");
    Ok(amount)
}

fn transfer_key(
    shared: &[u8; 32],
    ephemeral: &EphemeralPublicKey,
    recipient_x: &[u8; 32],
) -> Zeroizing<[u8; KEY_LEN]> {
    let mut info = [0u8; 64];
    info[..32].copy_from_slice(ephemeral.as_bytes());
    info[32..].copy_from_slice(recipient_x);
    let hk = Hkdf::<Sha256>::new(Some(TRANSFER_HKDF_SALT), shared);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(&info, &mut key[..])
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    key
}

fn transfer_aad(sender: &Address, recipient: &PublicKey) -> Vec<u8> {
    let mut aad = Vec::with_capacity(TRANSFER_AAD_LABEL.len() + 40 + 32);
    aad.extend_from_slice(TRANSFER_AAD_LABEL);
    aad.extend_from_slice(sender.as_str().as_bytes());
    aad.extend_from_slice(&recipient.to_bytes());
    aad
}

fn parse_micro(plaintext: &[u8]) -> Option<Amount> {
    let s = std::str::from_utf8(plaintext).ok()?;
    Amount::from_micro_str(s).ok()
}
