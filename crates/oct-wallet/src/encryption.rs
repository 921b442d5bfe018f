//! Password → vault key → session key → vault encryption chain.
//!
//! ```text
//! password ──PBKDF2-HMAC-SHA256(salt, 100 000)──▶ VaultKey
//! VaultKey ──AES-256-GCM──▶ wrapped SessionKey
//! SessionKey ──AES-256-GCM──▶ encrypted Vault
//! ```
//!
//! The password-derived key only ever wraps the session key, so re-encrypting
//! the vault after every wallet mutation costs one AES pass, not a PBKDF2
//! run. The salt must be stored next to the envelopes; without it the vault
//! cannot be recovered.
//!
//! # Envelope byte format
//! ```text
//! iv (12 bytes) || ciphertext + auth_tag (16 bytes)
//! ```
//!
//! Every envelope is bound to its purpose through AES-GCM associated data,
//! so a wrapped session key cannot be replayed into the vault slot or the
//! other way round.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use oct_core::entropy;

use crate::error::WalletError;
use crate::vault::{VAULT_SCHEMA_VERSION, Vault};

/// PBKDF2-HMAC-SHA256 rounds for password → vault key. Fixed; changing it
/// makes every existing vault undecryptable.
pub const VAULT_KDF_ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Symmetric key length in bytes.
pub const KEY_LEN: usize = 32;

/// Associated data for the wrapped session key envelope.
const SESSION_KEY_AAD: &[u8] = b"oct-wallet/session-key/v1";

/// Associated data for the vault envelope.
const VAULT_AAD: &[u8] = b"oct-wallet/vault/v1";

/// Associated data for a session key wrapped under a caller's resume key.
pub(crate) const RESUME_AAD: &[u8] = b"oct-wallet/resume/v1";

// --- Key material ---

/// Random 16-byte PBKDF2 salt. Not secret.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draw a fresh salt from the OS RNG.
    pub fn generate() -> Result<Self, WalletError> {
        Ok(Self(entropy::random_bytes()?))
    }

    /// Wrap raw salt bytes.
    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse stored salt bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WalletError> {
        let arr: [u8; SALT_LEN] = bytes.try_into().map_err(|_| WalletError::InvalidEnvelope)?;
        Ok(Self(arr))
    }

    /// Raw salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Key derived from the user's password. Only ever wraps a [`SessionKey`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    /// Get the raw key bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// Ephemeral key that encrypts the vault while a session is unlocked.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    /// Draw a fresh session key from the OS RNG.
    pub fn generate() -> Result<Self, WalletError> {
        let bytes = entropy::random_secret::<KEY_LEN>()?;
        Ok(Self(*bytes))
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

// --- Envelope ---

/// AES-256-GCM ciphertext with its nonce.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// The 12-byte nonce.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Ciphertext with the trailing 16-byte tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// `iv || ciphertext+tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse `iv || ciphertext+tag`. Rejects blobs shorter than nonce + tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() < IV_LEN + TAG_LEN {
            return Err(WalletError::InvalidEnvelope);
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);
        Ok(Self {
            iv,
            ciphertext: bytes[IV_LEN..].to_vec(),
        })
    }
}

impl fmt::Debug for EncryptedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedEnvelope")
            .field("iv", &hex::encode(self.iv))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct EnvelopeRepr {
    iv: String,
    ciphertext: String,
}

impl Serialize for EncryptedEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EnvelopeRepr {
            iv: STANDARD.encode(self.iv),
            ciphertext: STANDARD.encode(&self.ciphertext),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EncryptedEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = EnvelopeRepr::deserialize(deserializer)?;
        let iv = STANDARD.decode(repr.iv).map_err(serde::de::Error::custom)?;
        let ciphertext = STANDARD
            .decode(repr.ciphertext)
            .map_err(serde::de::Error::custom)?;
        let iv: [u8; IV_LEN] = iv
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("iv must be 12 bytes"))?;
        if ciphertext.len() < TAG_LEN {
            return Err(serde::de::Error::custom("ciphertext shorter than tag"));
        }
        Ok(Self { iv, ciphertext })
    }
}

/// AEAD open failure. Deliberately carries no detail.
#[derive(Debug)]
pub(crate) struct OpenError;

/// Encrypt under `key` with a fresh random nonce.
pub(crate) fn seal(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<EncryptedEnvelope, WalletError> {
    let iv: [u8; IV_LEN] = entropy::random_bytes()?;
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| WalletError::Serialization(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
        .map_err(|_| WalletError::Serialization("AES-GCM encryption failed".into()))?;
    Ok(EncryptedEnvelope { iv, ciphertext })
}

/// Decrypt and authenticate. No plaintext is returned unless the tag verifies.
pub(crate) fn open(
    key: &[u8; KEY_LEN],
    envelope: &EncryptedEnvelope,
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, OpenError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| OpenError)?;
    cipher
        .decrypt(
            Nonce::from_slice(&envelope.iv),
            Payload {
                msg: &envelope.ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| OpenError)
}

// --- Vault key chain ---

/// PBKDF2-HMAC-SHA256 with [`VAULT_KDF_ITERATIONS`] rounds.
pub fn derive_vault_key(password: &[u8], salt: &Salt) -> VaultKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt.as_bytes(), VAULT_KDF_ITERATIONS, &mut key);
    VaultKey(key)
}

/// Encrypt the session key under the password-derived key.
pub fn wrap_session_key(
    session_key: &SessionKey,
    vault_key: &VaultKey,
) -> Result<EncryptedEnvelope, WalletError> {
    seal(vault_key.as_bytes(), session_key.as_bytes(), SESSION_KEY_AAD)
}

/// Recover the session key. A wrong password and a damaged envelope are
/// indistinguishable.
pub fn unwrap_session_key(
    envelope: &EncryptedEnvelope,
    vault_key: &VaultKey,
) -> Result<SessionKey, WalletError> {
    unwrap_key_with(vault_key.as_bytes(), envelope, SESSION_KEY_AAD)
}

pub(crate) fn unwrap_key_with(
    key: &[u8; KEY_LEN],
    envelope: &EncryptedEnvelope,
    aad: &[u8],
) -> Result<SessionKey, WalletError> {
    let plain = open(key, envelope, aad).map_err(|_| WalletError::VaultCorruptOrWrongPassword)?;
    let bytes: [u8; KEY_LEN] = plain
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::VaultCorruptOrWrongPassword)?;
    Ok(SessionKey(bytes))
}

/// Serialize and encrypt the vault under the session key.
pub fn encrypt_vault(vault: &Vault, session_key: &SessionKey) -> Result<EncryptedEnvelope, WalletError> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(vault).map_err(|e| WalletError::Serialization(e.to_string()))?,
    );
    seal(session_key.as_bytes(), &plaintext, VAULT_AAD)
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema_version: u32,
}

/// Decrypt and validate the vault.
///
/// Tag failures, undecodable plaintext and structurally invalid vaults all
/// surface as [`WalletError::VaultCorruptOrWrongPassword`]. A vault written
/// by a newer schema surfaces as [`WalletError::UnsupportedSchemaVersion`].
pub fn decrypt_vault(envelope: &EncryptedEnvelope, session_key: &SessionKey) -> Result<Vault, WalletError> {
    let plaintext = open(session_key.as_bytes(), envelope, VAULT_AAD)
        .map_err(|_| WalletError::VaultCorruptOrWrongPassword)?;

    let probe: SchemaProbe = serde_json::from_slice(&plaintext)
        .map_err(|_| WalletError::VaultCorruptOrWrongPassword)?;
    if probe.schema_version > VAULT_SCHEMA_VERSION {
        return Err(WalletError::UnsupportedSchemaVersion(probe.schema_version));
    }

    let vault: Vault = serde_json::from_slice(&plaintext)
        .map_err(|_| WalletError::VaultCorruptOrWrongPassword)?;
    if !vault.is_consistent() {
        return Err(WalletError::VaultCorruptOrWrongPassword);
    }
    Ok(vault)
}

// --- Sealed vault ---

/// Everything a caller persists to reopen the vault later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedVault {
    /// PBKDF2 salt for the password-derived key.
    pub salt: Salt,
    /// Session key encrypted under the password-derived key.
    pub wrapped_session_key: EncryptedEnvelope,
    /// Vault encrypted under the session key.
    pub vault: EncryptedEnvelope,
}

impl SealedVault {
    /// Seal a vault under a new password with a fresh salt and session key.
    ///
    /// Returns the session key as well so the caller can stay unlocked.
    pub fn create(password: &str, vault: &Vault) -> Result<(Self, SessionKey), WalletError> {
        let session_key = SessionKey::generate()?;
        let (salt, wrapped_session_key) = rewrap_session_key(&session_key, password)?;
        let vault = encrypt_vault(vault, &session_key)?;
        Ok((
            Self {
                salt,
                wrapped_session_key,
                vault,
            },
            session_key,
        ))
    }

    /// Derive the vault key from `password` and unwrap the session key.
    pub fn unwrap_session_key(&self, password: &str) -> Result<SessionKey, WalletError> {
        let vault_key = derive_vault_key(password.as_bytes(), &self.salt);
        unwrap_session_key(&self.wrapped_session_key, &vault_key)
    }
}

/// Wrap an existing session key under a new password and fresh salt.
///
/// Used on password change; the vault envelope stays as it is.
pub fn rewrap_session_key(
    session_key: &SessionKey,
    password: &str,
) -> Result<(Salt, EncryptedEnvelope), WalletError> {
    let salt = Salt::generate()?;
    let vault_key = derive_vault_key(password.as_bytes(), &salt);
    let wrapped = wrap_session_key(session_key, &vault_key)?;
    Ok((salt, wrapped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::WalletSource;
    use oct_core::KeyPair;

    fn sample_vault() -> Vault {
        let mut v = Vault::new();
        v.add_wallet("Main", &KeyPair::from_secret_bytes([1u8; 32]), WalletSource::Generated, 5)
            .unwrap();
        v
    }

    // --- Primitive seal/open ---

    #[test]
    fn seal_open_roundtrip() {
        let key = [7u8; KEY_LEN];
        let env = seal(&key, b"secret data", b"aad").unwrap();
        assert_eq!(open(&key, &env, b"aad").unwrap().as_slice(), b"secret data");
    }

    #[test]
    fn seal_uses_fresh_iv() {
        let key = [7u8; KEY_LEN];
        let a = seal(&key, b"same", b"").unwrap();
        let b = seal(&key, b"same", b"").unwrap();
        assert_ne!(a.iv(), b.iv());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn open_wrong_aad_fails() {
        let key = [7u8; KEY_LEN];
        let env = seal(&key, b"x", b"one").unwrap();
        assert!(open(&key, &env, b"two").is_err());
    }

    #[test]
    fn envelope_overhead() {
        let env = seal(&[1u8; KEY_LEN], b"hello", b"").unwrap();
        assert_eq!(env.to_bytes().len(), IV_LEN + 5 + TAG_LEN);
    }

    #[test]
    fn envelope_bytes_roundtrip() {
        let env = seal(&[1u8; KEY_LEN], b"payload", b"").unwrap();
        let parsed = EncryptedEnvelope::from_bytes(&env.to_bytes()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn envelope_too_short_rejected() {
        assert_eq!(
            EncryptedEnvelope::from_bytes(&[0u8; IV_LEN + TAG_LEN - 1]).unwrap_err(),
            WalletError::InvalidEnvelope
        );
    }

    #[test]
    fn envelope_serde_base64_fields() {
        let env = seal(&[1u8; KEY_LEN], b"payload", b"").unwrap();
        let value = serde_json::to_value(&env).unwrap();
        assert!(value["iv"].is_string());
        assert!(value["ciphertext"].is_string());
        let back: EncryptedEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn envelope_serde_rejects_short_iv() {
        let json = format!(
            r#"{{"iv":"{}","ciphertext":"{}"}}"#,
            STANDARD.encode([0u8; 8]),
            STANDARD.encode([0u8; 32])
        );
        assert!(serde_json::from_str::<EncryptedEnvelope>(&json).is_err());
    }

    // --- Vault key ---

    #[test]
    fn derive_vault_key_deterministic() {
        let salt = Salt::from_bytes([3u8; SALT_LEN]);
        let a = derive_vault_key(b"password", &salt);
        let b = derive_vault_key(b"password", &salt);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn derive_vault_key_depends_on_password_and_salt() {
        let s1 = Salt::from_bytes([1u8; SALT_LEN]);
        let s2 = Salt::from_bytes([2u8; SALT_LEN]);
        let base = derive_vault_key(b"password", &s1);
        assert_ne!(base.as_bytes(), derive_vault_key(b"passwore", &s1).as_bytes());
        assert_ne!(base.as_bytes(), derive_vault_key(b"password", &s2).as_bytes());
    }

    #[test]
    fn derive_vault_key_matches_reference_pbkdf2() {
        let salt = Salt::from_bytes([9u8; SALT_LEN]);
        let mut expected = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(b"pw", &[9u8; SALT_LEN], 100_000, &mut expected);
        assert_eq!(derive_vault_key(b"pw", &salt).as_bytes(), &expected);
    }

    #[test]
    fn salt_generate_unique() {
        assert_ne!(Salt::generate().unwrap(), Salt::generate().unwrap());
    }

    #[test]
    fn salt_from_slice_checks_length() {
        assert!(Salt::from_slice(&[0u8; 15]).is_err());
        assert!(Salt::from_slice(&[0u8; 16]).is_ok());
    }

    // --- Session key wrapping ---

    #[test]
    fn wrap_unwrap_session_key() {
        let sk = SessionKey::generate().unwrap();
        let vk = derive_vault_key(b"pw", &Salt::from_bytes([4u8; SALT_LEN]));
        let env = wrap_session_key(&sk, &vk).unwrap();
        let back = unwrap_session_key(&env, &vk).unwrap();
        assert_eq!(back.as_bytes(), sk.as_bytes());
    }

    #[test]
    fn unwrap_with_wrong_key_fails() {
        let sk = SessionKey::generate().unwrap();
        let salt = Salt::from_bytes([4u8; SALT_LEN]);
        let env = wrap_session_key(&sk, &derive_vault_key(b"right", &salt)).unwrap();
        let err = unwrap_session_key(&env, &derive_vault_key(b"wrong", &salt)).unwrap_err();
        assert_eq!(err, WalletError::VaultCorruptOrWrongPassword);
    }

    #[test]
    fn session_key_debug_redacted() {
        let sk = SessionKey::from_bytes([0xEE; KEY_LEN]);
        let debug = format!("{sk:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ee"));
    }

    // --- Vault encryption ---

    #[test]
    fn vault_roundtrip() {
        let v = sample_vault();
        let sk = SessionKey::generate().unwrap();
        let env = encrypt_vault(&v, &sk).unwrap();
        assert_eq!(decrypt_vault(&env, &sk).unwrap(), v);
    }

    #[test]
    fn vault_wrong_key_fails() {
        let env = encrypt_vault(&sample_vault(), &SessionKey::generate().unwrap()).unwrap();
        let err = decrypt_vault(&env, &SessionKey::generate().unwrap()).unwrap_err();
        assert_eq!(err, WalletError::VaultCorruptOrWrongPassword);
    }

    #[test]
    fn vault_flipped_bit_fails() {
        let sk = SessionKey::generate().unwrap();
        let env = encrypt_vault(&sample_vault(), &sk).unwrap();
        let mut bytes = env.to_bytes();
        for i in [0, IV_LEN, bytes.len() / 2, bytes.len() - 1] {
            bytes[i] ^= 0x01;
            let tampered = EncryptedEnvelope::from_bytes(&bytes).unwrap();
            assert_eq!(
                decrypt_vault(&tampered, &sk).unwrap_err(),
                WalletError::VaultCorruptOrWrongPassword,
                "flip at byte {i} was accepted"
            );
            bytes[i] ^= 0x01;
        }
    }

    #[test]
    fn wrapped_session_key_not_accepted_as_vault() {
        let sk = SessionKey::generate().unwrap();
        let env = seal(sk.as_bytes(), br#"{"schema_version":1,"wallets":[]}"#, SESSION_KEY_AAD)
            .unwrap();
        assert_eq!(
            decrypt_vault(&env, &sk).unwrap_err(),
            WalletError::VaultCorruptOrWrongPassword
        );
    }

    #[test]
    fn newer_schema_rejected() {
        let sk = SessionKey::generate().unwrap();
        let plaintext = format!(
            r#"{{"schema_version":{},"wallets":[],"active_wallet_id":null}}"#,
            VAULT_SCHEMA_VERSION + 1
        );
        let env = seal(sk.as_bytes(), plaintext.as_bytes(), VAULT_AAD).unwrap();
        assert_eq!(
            decrypt_vault(&env, &sk).unwrap_err(),
            WalletError::UnsupportedSchemaVersion(VAULT_SCHEMA_VERSION + 1)
        );
    }

    #[test]
    fn inconsistent_vault_reported_as_corrupt() {
        let sk = SessionKey::generate().unwrap();
        let plaintext = r#"{"schema_version":1,"wallets":[],"active_wallet_id":"00ff"}"#;
        let env = seal(sk.as_bytes(), plaintext.as_bytes(), VAULT_AAD).unwrap();
        assert_eq!(
            decrypt_vault(&env, &sk).unwrap_err(),
            WalletError::VaultCorruptOrWrongPassword
        );
    }

    #[test]
    fn garbage_plaintext_reported_as_corrupt() {
        let sk = SessionKey::generate().unwrap();
        let env = seal(sk.as_bytes(), b"not json", VAULT_AAD).unwrap();
        assert_eq!(
            decrypt_vault(&env, &sk).unwrap_err(),
            WalletError::VaultCorruptOrWrongPassword
        );
    }

    // --- Sealed vault ---

    #[test]
    fn sealed_vault_create_and_reopen() {
        let v = sample_vault();
        let (sealed, sk) = SealedVault::create("correct-horse", &v).unwrap();
        let unwrapped = sealed.unwrap_session_key("correct-horse").unwrap();
        assert_eq!(unwrapped.as_bytes(), sk.as_bytes());
        assert_eq!(decrypt_vault(&sealed.vault, &unwrapped).unwrap(), v);
    }

    #[test]
    fn sealed_vault_wrong_password() {
        let (sealed, _) = SealedVault::create("correct-horse", &sample_vault()).unwrap();
        assert_eq!(
            sealed.unwrap_session_key("wrong").unwrap_err(),
            WalletError::VaultCorruptOrWrongPassword
        );
    }

    #[test]
    fn rewrap_keeps_vault_envelope_valid() {
        let v = sample_vault();
        let (mut sealed, sk) = SealedVault::create("old-password", &v).unwrap();
        let (salt, wrapped) = rewrap_session_key(&sk, "new-password").unwrap();
        sealed.salt = salt;
        sealed.wrapped_session_key = wrapped;

        assert!(sealed.unwrap_session_key("old-password").is_err());
        let sk2 = sealed.unwrap_session_key("new-password").unwrap();
        assert_eq!(decrypt_vault(&sealed.vault, &sk2).unwrap(), v);
    }

    #[test]
    fn sealed_vault_serde_roundtrip() {
        let (sealed, _) = SealedVault::create("correct-horse", &sample_vault()).unwrap();
        let json = serde_json::to_string(&sealed).unwrap();
        let back: SealedVault = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sealed);
    }
}
