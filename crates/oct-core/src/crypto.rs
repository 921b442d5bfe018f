//! Ed25519 key material for the Octra wallet.
//!
//! Wraps ed25519-dalek for keypairs, public keys and detached signatures.
//! At the wallet boundary every key and signature is rendered as standard
//! base64.
//!
//! Keys double as X25519 Diffie-Hellman keys for private transfers: the
//! secret maps to its expanded scalar and the public key to its Montgomery
//! form, so a single keypair serves both signing and key agreement.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::Signer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::address::Address;
use crate::constants::{PUBLIC_KEY_LEN, SECRET_KEY_LEN, SIGNATURE_LEN};
use crate::entropy;
use crate::error::CoreError;

/// Raw 32-byte Ed25519 secret seed.
///
/// Zeroized on drop. Serializes as base64 so it can live inside the
/// encrypted vault plaintext.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyBytes([u8; SECRET_KEY_LEN]);

impl SecretKeyBytes {
    /// Wrap raw seed bytes.
    pub fn from_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.0
    }

    /// Base64 rendering for export.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.0))
    }
}

impl PartialEq for SecretKeyBytes {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SecretKeyBytes {}

impl fmt::Debug for SecretKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKeyBytes([REDACTED])")
    }
}

impl Serialize for SecretKeyBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for SecretKeyBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        let bytes = Zeroizing::new(
            STANDARD
                .decode(s.as_bytes())
                .map_err(|_| serde::de::Error::custom("invalid secret key encoding"))?,
        );
        let arr: [u8; SECRET_KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid secret key length"))?;
        Ok(Self(arr))
    }
}

/// Ed25519 keypair.
///
/// Wraps [`ed25519_dalek::SigningKey`], which zeroizes its secret on drop.
/// The address is not stored; it is a pure function of the public key and
/// is recomputed by [`KeyPair::address`].
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair from the OS cryptographic RNG.
    pub fn generate() -> Result<Self, CoreError> {
        let seed = entropy::random_secret::<SECRET_KEY_LEN>()?;
        Ok(Self::from_secret_bytes(*seed))
    }

    /// Deterministic expansion of a 32-byte seed. No randomness involved.
    pub fn from_secret_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        let mut bytes = bytes;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&bytes);
        bytes.zeroize();
        Self { signing_key }
    }

    /// Import a raw private key.
    ///
    /// Accepts a 32-byte seed, or the 64-byte `seed || public_key` layout
    /// produced by NaCl-style tooling. In the 64-byte case the trailing
    /// public key must be a valid curve point and must equal the key the
    /// seed expands to.
    pub fn from_private_key_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        match bytes.len() {
            SECRET_KEY_LEN => {
                let mut seed = Zeroizing::new([0u8; SECRET_KEY_LEN]);
                seed.copy_from_slice(bytes);
                Ok(Self::from_secret_bytes(*seed))
            }
            64 => {
                let mut seed = Zeroizing::new([0u8; SECRET_KEY_LEN]);
                seed.copy_from_slice(&bytes[..SECRET_KEY_LEN]);
                let mut claimed = [0u8; PUBLIC_KEY_LEN];
                claimed.copy_from_slice(&bytes[SECRET_KEY_LEN..]);
                let claimed = PublicKey::from_bytes(&claimed)?;
                let kp = Self::from_secret_bytes(*seed);
                if kp.public_key() != claimed {
                    return Err(CoreError::InvalidKeyFormat);
                }
                Ok(kp)
            }
            _ => Err(CoreError::InvalidKeyFormat),
        }
    }

    /// Import a base64-encoded private key (32 or 64 bytes decoded).
    pub fn from_private_key_base64(encoded: &str) -> Result<Self, CoreError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| CoreError::InvalidKeyFormat)?,
        );
        Self::from_private_key_bytes(&bytes)
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// The address derived from the public key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    /// Copy of the 32-byte secret seed. Zeroized on drop.
    pub fn secret_bytes(&self) -> SecretKeyBytes {
        SecretKeyBytes(self.signing_key.to_bytes())
    }

    /// Deterministic Ed25519 detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> TxSignature {
        TxSignature(self.signing_key.sign(message).to_bytes())
    }

    /// The X25519 secret scalar corresponding to this Ed25519 key.
    pub fn dh_secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_scalar_bytes())
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key for verifying signatures and deriving addresses.
#[derive(Clone, Copy)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    /// Create a public key from raw bytes.
    ///
    /// Fails unless the bytes decompress to a curve point outside the
    /// small-order subgroup.
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> Result<Self, CoreError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CoreError::InvalidKeyFormat)?;
        if vk.is_weak() {
            return Err(CoreError::InvalidKeyFormat);
        }
        Ok(Self { verifying_key: vk })
    }

    /// Parse a base64-encoded 32-byte public key.
    pub fn from_base64(encoded: &str) -> Result<Self, CoreError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CoreError::InvalidKeyFormat)?;
        let arr: [u8; PUBLIC_KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidKeyFormat)?;
        Self::from_bytes(&arr)
    }

    /// Raw public key bytes.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.verifying_key.to_bytes()
    }

    /// Base64 rendering.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// The X25519 (Montgomery u-coordinate) form of this key.
    pub fn to_montgomery_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_montgomery().to_bytes()
    }

    /// Verify a detached signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &TxSignature) -> Result<(), CoreError> {
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// 64-byte Ed25519 detached signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TxSignature([u8; SIGNATURE_LEN]);

impl TxSignature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a base64-encoded 64-byte signature.
    pub fn from_base64(encoded: &str) -> Result<Self, CoreError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CoreError::InvalidSignature)?;
        let arr: [u8; SIGNATURE_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidSignature)?;
        Ok(Self(arr))
    }

    /// Raw signature bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0
    }

    /// Base64 rendering.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxSignature({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for TxSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for TxSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
