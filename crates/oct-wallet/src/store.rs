//! Persistence adapter for the sealed vault.
//!
//! The wallet never touches disk itself. Callers hand it a [`KeyValueStore`]
//! (browser storage, a JSON file, a keychain) and the sealed vault is
//! written as whole opaque values under fixed keys:
//!
//! | key                 | value                                    |
//! |---------------------|------------------------------------------|
//! | `vault`             | vault envelope, `iv \|\| ciphertext+tag` |
//! | `vault_salt`        | 16-byte PBKDF2 salt                      |
//! | `vault_session_key` | wrapped session key envelope             |
//! | `wallet_count`      | decimal wallet count, readable locked    |
//! | `vault_rekey`       | staged `salt \|\| wrapped session key`   |
//!
//! The salt and the wrapped session key only work as a pair, but a store
//! writes one key at a time. [`SealedVault::save_to`] therefore stages the
//! new pair as a single `vault_rekey` value before touching the live keys,
//! and removes it last. While it is present, [`SealedVault::load_from`]
//! reads the pair from it, so a crash at any point of a password change
//! leaves either the old or the new password working.

use std::collections::BTreeMap;
use tracing::debug;

use crate::encryption::{EncryptedEnvelope, SALT_LEN, Salt, SealedVault};
use crate::error::WalletError;

pub const VAULT_KEY: &str = "vault";
pub const VAULT_SALT_KEY: &str = "vault_salt";
pub const VAULT_SESSION_KEY_KEY: &str = "vault_session_key";
pub const WALLET_COUNT_KEY: &str = "wallet_count";
pub const VAULT_REKEY_KEY: &str = "vault_rekey";

/// Opaque byte store keyed by string.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), WalletError>;
    fn remove(&mut self, key: &str) -> Result<(), WalletError>;

    /// Write several values. Stores that can persist them in one step
    /// should override this; the default writes them in order.
    fn set_many(&mut self, entries: &[(&str, &[u8])]) -> Result<(), WalletError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), WalletError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), WalletError> {
        self.entries.remove(key);
        Ok(())
    }
}

impl SealedVault {
    /// Write every part of the sealed vault plus the plaintext wallet count.
    ///
    /// Used for the first save and after a password change. The vault
    /// envelope must be sealed under the same session key as whatever is
    /// already stored, which holds for both.
    pub fn save_to<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        wallet_count: usize,
    ) -> Result<(), WalletError> {
        let wrapped = self.wrapped_session_key.to_bytes();
        store.set(VAULT_REKEY_KEY, &key_record(&self.salt, &wrapped))?;
        let count = wallet_count.to_string();
        let vault = self.vault.to_bytes();
        store.set_many(&[
            (VAULT_SALT_KEY, &self.salt.as_bytes()[..]),
            (VAULT_SESSION_KEY_KEY, wrapped.as_slice()),
            (VAULT_KEY, vault.as_slice()),
            (WALLET_COUNT_KEY, count.as_bytes()),
        ])?;
        store.remove(VAULT_REKEY_KEY)?;
        debug!(wallet_count, "sealed vault saved");
        Ok(())
    }

    /// Read the sealed vault back.
    ///
    /// `Ok(None)` when no vault was ever saved. A partially present record
    /// is a storage error, not an empty store. A staged key record left by
    /// an interrupted [`Self::save_to`] takes precedence over the live salt
    /// and wrapped key.
    pub fn load_from<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>, WalletError> {
        let vault = store.get(VAULT_KEY)?;
        let keys = match store.get(VAULT_REKEY_KEY)? {
            Some(record) => Some(split_key_record(&record)?),
            None => match (store.get(VAULT_SALT_KEY)?, store.get(VAULT_SESSION_KEY_KEY)?) {
                (None, None) => None,
                (Some(salt), Some(wrapped)) => Some((
                    Salt::from_slice(&salt)?,
                    EncryptedEnvelope::from_bytes(&wrapped)?,
                )),
                _ => return Err(incomplete()),
            },
        };
        match (keys, vault) {
            (None, None) => Ok(None),
            (Some((salt, wrapped_session_key)), Some(vault)) => Ok(Some(Self {
                salt,
                wrapped_session_key,
                vault: EncryptedEnvelope::from_bytes(&vault)?,
            })),
            _ => Err(incomplete()),
        }
    }

    /// Replace only the vault envelope after a mutation.
    pub fn save_vault_envelope<S: KeyValueStore + ?Sized>(
        store: &mut S,
        vault: &EncryptedEnvelope,
        wallet_count: usize,
    ) -> Result<(), WalletError> {
        store.set(VAULT_KEY, &vault.to_bytes())?;
        store.set(WALLET_COUNT_KEY, wallet_count.to_string().as_bytes())
    }

    /// Delete every stored part of the vault.
    pub fn clear<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<(), WalletError> {
        for key in [
            VAULT_REKEY_KEY,
            VAULT_KEY,
            VAULT_SALT_KEY,
            VAULT_SESSION_KEY_KEY,
            WALLET_COUNT_KEY,
        ] {
            store.remove(key)?;
        }
        Ok(())
    }
}

fn key_record(salt: &Salt, wrapped: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(SALT_LEN + wrapped.len());
    record.extend_from_slice(salt.as_bytes());
    record.extend_from_slice(wrapped);
    record
}

fn split_key_record(record: &[u8]) -> Result<(Salt, EncryptedEnvelope), WalletError> {
    if record.len() < SALT_LEN {
        return Err(WalletError::InvalidEnvelope);
    }
    let (salt, wrapped) = record.split_at(SALT_LEN);
    Ok((Salt::from_slice(salt)?, EncryptedEnvelope::from_bytes(wrapped)?))
}

fn incomplete() -> WalletError {
    WalletError::Storage("incomplete vault record".into())
}

/// Wallet count as last saved; readable without unlocking.
pub fn stored_wallet_count<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<usize>, WalletError> {
    let Some(raw) = store.get(WALLET_COUNT_KEY)? else {
        return Ok(None);
    };
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| WalletError::Storage("wallet_count is not a number".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{decrypt_vault, rewrap_session_key};
    use crate::vault::{Vault, WalletSource};
    use oct_core::KeyPair;

    fn sealed() -> (SealedVault, Vault) {
        let mut v = Vault::new();
        v.add_wallet("Main", &KeyPair::from_secret_bytes([3u8; 32]), WalletSource::Generated, 5)
            .unwrap();
        let (sealed, _) = SealedVault::create("correct-horse", &v).unwrap();
        (sealed, v)
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>, WalletError> {
            Err(WalletError::Storage("disk on fire".into()))
        }
        fn set(&mut self, _: &str, _: &[u8]) -> Result<(), WalletError> {
            Err(WalletError::Storage("disk on fire".into()))
        }
        fn remove(&mut self, _: &str) -> Result<(), WalletError> {
            Ok(())
        }
    }

    /// Accepts `budget` writes, then fails every later one as a dead process would.
    struct CrashAfter {
        inner: MemoryStore,
        budget: usize,
    }

    impl CrashAfter {
        fn spend(&mut self) -> Result<(), WalletError> {
            if self.budget == 0 {
                return Err(WalletError::Storage("process died".into()));
            }
            self.budget -= 1;
            Ok(())
        }
    }

    impl KeyValueStore for CrashAfter {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &[u8]) -> Result<(), WalletError> {
            self.spend()?;
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<(), WalletError> {
            self.spend()?;
            self.inner.remove(key)
        }
    }

    #[test]
    fn interrupted_password_change_keeps_one_password() {
        let mut v = Vault::new();
        v.add_wallet("Main", &KeyPair::from_secret_bytes([3u8; 32]), WalletSource::Generated, 5)
            .unwrap();
        let (old, session_key) = SealedVault::create("old-password", &v).unwrap();
        let (salt, wrapped_session_key) = rewrap_session_key(&session_key, "new-password").unwrap();
        let new = SealedVault {
            salt,
            wrapped_session_key,
            vault: old.vault.clone(),
        };

        // Six writes in a full save: staged record, four live keys, cleanup.
        for budget in 0..=6 {
            let mut base = MemoryStore::new();
            old.save_to(&mut base, 1).unwrap();
            let mut crashing = CrashAfter { inner: base, budget };
            let finished = new.save_to(&mut crashing, 1).is_ok();
            assert_eq!(finished, budget == 6);

            let loaded = SealedVault::load_from(&crashing.inner).unwrap().unwrap();
            let sk = ["old-password", "new-password"]
                .iter()
                .find_map(|pw| loaded.unwrap_session_key(pw).ok())
                .unwrap_or_else(|| panic!("no password unlocks after {budget} writes"));
            assert_eq!(decrypt_vault(&loaded.vault, &sk).unwrap(), v);
        }
    }

    #[test]
    fn staged_key_record_wins_over_live_keys() {
        let (old, _) = sealed();
        let (other, _) = SealedVault::create("correct-horse", &Vault::new()).unwrap();
        let mut store = MemoryStore::new();
        old.save_to(&mut store, 1).unwrap();
        store
            .set(
                VAULT_REKEY_KEY,
                &key_record(&other.salt, &other.wrapped_session_key.to_bytes()),
            )
            .unwrap();

        let loaded = SealedVault::load_from(&store).unwrap().unwrap();
        assert_eq!(loaded.salt, other.salt);
        assert_eq!(loaded.wrapped_session_key, other.wrapped_session_key);
        assert_eq!(loaded.vault, old.vault);
    }

    #[test]
    fn short_key_record_rejected() {
        let (sealed, _) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, 1).unwrap();
        store.set(VAULT_REKEY_KEY, &[0u8; 4]).unwrap();
        assert_eq!(
            SealedVault::load_from(&store).unwrap_err(),
            WalletError::InvalidEnvelope
        );
    }

    #[test]
    fn empty_store_has_no_vault() {
        let store = MemoryStore::new();
        assert!(SealedVault::load_from(&store).unwrap().is_none());
        assert!(stored_wallet_count(&store).unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (sealed, v) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, v.len()).unwrap();
        assert_eq!(store.len(), 4);

        let loaded = SealedVault::load_from(&store).unwrap().unwrap();
        assert_eq!(loaded, sealed);
        let sk = loaded.unwrap_session_key("correct-horse").unwrap();
        assert_eq!(decrypt_vault(&loaded.vault, &sk).unwrap(), v);
        assert_eq!(stored_wallet_count(&store).unwrap(), Some(1));
    }

    #[test]
    fn salt_stored_raw() {
        let (sealed, _) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, 1).unwrap();
        assert_eq!(store.get(VAULT_SALT_KEY).unwrap().unwrap(), sealed.salt.as_bytes());
    }

    #[test]
    fn partial_record_is_an_error() {
        let (sealed, _) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, 1).unwrap();
        store.remove(VAULT_SALT_KEY).unwrap();
        assert!(matches!(
            SealedVault::load_from(&store).unwrap_err(),
            WalletError::Storage(_)
        ));
    }

    #[test]
    fn truncated_envelope_rejected() {
        let (sealed, _) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, 1).unwrap();
        store.set(VAULT_KEY, &[0u8; 10]).unwrap();
        assert_eq!(
            SealedVault::load_from(&store).unwrap_err(),
            WalletError::InvalidEnvelope
        );
    }

    #[test]
    fn replace_vault_envelope_only() {
        let (sealed, _) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, 1).unwrap();
        let (other, _) = SealedVault::create("correct-horse", &Vault::new()).unwrap();
        SealedVault::save_vault_envelope(&mut store, &other.vault, 0).unwrap();

        let loaded = SealedVault::load_from(&store).unwrap().unwrap();
        assert_eq!(loaded.salt, sealed.salt);
        assert_eq!(loaded.vault, other.vault);
        assert_eq!(stored_wallet_count(&store).unwrap(), Some(0));
    }

    #[test]
    fn clear_removes_everything() {
        let (sealed, _) = sealed();
        let mut store = MemoryStore::new();
        sealed.save_to(&mut store, 1).unwrap();
        SealedVault::clear(&mut store).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn garbage_wallet_count_is_error() {
        let mut store = MemoryStore::new();
        store.set(WALLET_COUNT_KEY, b"five").unwrap();
        assert!(stored_wallet_count(&store).is_err());
    }

    #[test]
    fn store_errors_propagate() {
        let (sealed, _) = sealed();
        assert!(sealed.save_to(&mut FailingStore, 1).is_err());
        assert!(SealedVault::load_from(&FailingStore).is_err());
    }
}
