//! The wallet collection kept inside the encrypted vault.
//!
//! A [`Vault`] is plain data: it holds private keys in the clear and must
//! only ever be persisted through [`crate::encryption::encrypt_vault`].
//! Mutations go through the methods here so the structural invariants hold:
//! unique ids, names and addresses, a bounded size, and an active id that
//! always points at an existing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use oct_core::{Address, KeyPair, PublicKey, SecretKeyBytes, entropy};

use crate::error::WalletError;

/// Vault layout version written by this build.
pub const VAULT_SCHEMA_VERSION: u32 = 1;

/// Longest accepted wallet name, in characters, after trimming.
pub const MAX_WALLET_NAME_LEN: usize = 32;

/// Random bytes behind a [`WalletId`].
const WALLET_ID_BYTES: usize = 16;

/// Opaque wallet identifier: 16 random bytes as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(String);

impl WalletId {
    /// Draw a fresh random id.
    pub fn generate() -> Result<Self, WalletError> {
        let bytes: [u8; WALLET_ID_BYTES] = entropy::random_bytes()?;
        Ok(Self(hex::encode(bytes)))
    }

    /// The id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WalletId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletId({})", self.0)
    }
}

/// How a wallet's key entered the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletSource {
    /// Fresh mnemonic generated on this device.
    Generated,
    /// Raw private key pasted in.
    ImportedKey,
    /// Existing recovery phrase entered.
    ImportedMnemonic,
}

/// One wallet inside the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: WalletId,
    pub name: String,
    pub address: Address,
    pub public_key: PublicKey,
    pub private_key: SecretKeyBytes,
    pub created_at: DateTime<Utc>,
    pub source: WalletSource,
    pub backup_verified: bool,
}

impl WalletRecord {
    /// Rebuild the keypair. The caller owns the returned secret.
    pub fn keypair(&self) -> KeyPair {
        KeyPair::from_secret_bytes(*self.private_key.as_bytes())
    }

    /// True when the stored public key and address follow from the secret.
    fn keys_consistent(&self) -> bool {
        let kp = self.keypair();
        kp.public_key() == self.public_key && kp.address() == self.address
    }
}

/// Ordered wallet collection with an optional active wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub schema_version: u32,
    wallets: Vec<WalletRecord>,
    active_wallet_id: Option<WalletId>,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl Vault {
    /// Empty vault at the current schema version.
    pub fn new() -> Self {
        Self {
            schema_version: VAULT_SCHEMA_VERSION,
            wallets: Vec::new(),
            active_wallet_id: None,
        }
    }

    /// All wallets in insertion order.
    pub fn wallets(&self) -> &[WalletRecord] {
        &self.wallets
    }

    /// Number of wallets.
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    /// True when the vault holds no wallets.
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Id of the active wallet, if any.
    pub fn active_wallet_id(&self) -> Option<&WalletId> {
        self.active_wallet_id.as_ref()
    }

    /// The active wallet record, if any.
    pub fn active_wallet(&self) -> Option<&WalletRecord> {
        self.active_wallet_id.as_ref().and_then(|id| self.get(id))
    }

    /// Look up a wallet by id.
    pub fn get(&self, id: &WalletId) -> Option<&WalletRecord> {
        self.wallets.iter().find(|w| &w.id == id)
    }

    /// Look up a wallet by (case-insensitive) name.
    pub fn find_by_name(&self, name: &str) -> Option<&WalletRecord> {
        let wanted = name.trim().to_lowercase();
        self.wallets.iter().find(|w| w.name.to_lowercase() == wanted)
    }

    /// Rebuild the keypair of wallet `id`.
    pub fn keypair_for(&self, id: &WalletId) -> Result<KeyPair, WalletError> {
        self.get(id)
            .map(WalletRecord::keypair)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))
    }

    /// Add a wallet for `keypair`.
    ///
    /// The first wallet added becomes active. Fails when the vault already
    /// holds `max_wallets`, when the trimmed name is invalid or taken
    /// (case-insensitively), or when the address is already present.
    pub fn add_wallet(
        &mut self,
        name: &str,
        keypair: &KeyPair,
        source: WalletSource,
        max_wallets: usize,
    ) -> Result<WalletId, WalletError> {
        if self.wallets.len() >= max_wallets {
            return Err(WalletError::WalletLimitExceeded { max: max_wallets });
        }
        let name = normalize_name(name)?;
        self.ensure_name_free(&name, None)?;

        let address = keypair.address();
        if self.wallets.iter().any(|w| w.address == address) {
            return Err(WalletError::DuplicateAddress(address.to_string()));
        }

        let id = WalletId::generate()?;
        let record = WalletRecord {
            id: id.clone(),
            name,
            address,
            public_key: keypair.public_key(),
            private_key: keypair.secret_bytes(),
            created_at: Utc::now(),
            source,
            backup_verified: false,
        };
        info!(id = %id, address = %record.address, ?source, "wallet added");
        self.wallets.push(record);

        if self.active_wallet_id.is_none() {
            self.active_wallet_id = Some(id.clone());
        }
        Ok(id)
    }

    /// Remove wallet `id` and return its record.
    ///
    /// Removing the active wallet moves the active id to the first
    /// remaining wallet, or clears it when none remain.
    pub fn remove_wallet(&mut self, id: &WalletId) -> Result<WalletRecord, WalletError> {
        let pos = self
            .wallets
            .iter()
            .position(|w| &w.id == id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let removed = self.wallets.remove(pos);

        if self.active_wallet_id.as_ref() == Some(id) {
            self.active_wallet_id = self.wallets.first().map(|w| w.id.clone());
        }
        info!(id = %id, address = %removed.address, "wallet removed");
        Ok(removed)
    }

    /// Rename wallet `id`. Renaming to its own name in a different case is allowed.
    pub fn rename_wallet(&mut self, id: &WalletId, name: &str) -> Result<(), WalletError> {
        let name = normalize_name(name)?;
        self.ensure_name_free(&name, Some(id))?;
        let record = self.get_mut(id)?;
        debug!(id = %id, "wallet renamed");
        record.name = name;
        Ok(())
    }

    /// Make wallet `id` the active one.
    pub fn set_active(&mut self, id: &WalletId) -> Result<(), WalletError> {
        if self.get(id).is_none() {
            return Err(WalletError::WalletNotFound(id.to_string()));
        }
        self.active_wallet_id = Some(id.clone());
        debug!(id = %id, "active wallet changed");
        Ok(())
    }

    /// Record that the user confirmed the recovery phrase backup.
    pub fn mark_backup_verified(&mut self, id: &WalletId) -> Result<(), WalletError> {
        self.get_mut(id)?.backup_verified = true;
        Ok(())
    }

    /// Check every structural invariant a decrypted vault must satisfy.
    ///
    /// Ids, case-folded names and addresses are unique, the active id
    /// references a record, and every record's public key and address
    /// follow from its private key.
    pub fn is_consistent(&self) -> bool {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for w in &self.wallets {
            if !ids.insert(&w.id)
                || !names.insert(w.name.to_lowercase())
                || !addresses.insert(w.address.as_str())
            {
                return false;
            }
            if !matches!(normalize_name(&w.name), Ok(n) if n == w.name) {
                return false;
            }
            if !w.keys_consistent() {
                return false;
            }
        }
        match &self.active_wallet_id {
            Some(id) => ids.contains(id),
            None => true,
        }
    }

    fn get_mut(&mut self, id: &WalletId) -> Result<&mut WalletRecord, WalletError> {
        self.wallets
            .iter_mut()
            .find(|w| &w.id == id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))
    }

    fn ensure_name_free(&self, name: &str, except: Option<&WalletId>) -> Result<(), WalletError> {
        let folded = name.to_lowercase();
        let taken = self
            .wallets
            .iter()
            .filter(|w| Some(&w.id) != except)
            .any(|w| w.name.to_lowercase() == folded);
        if taken {
            return Err(WalletError::DuplicateWalletName(name.to_string()));
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> Result<String, WalletError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_WALLET_NAME_LEN {
        return Err(WalletError::InvalidWalletName);
    }
    Ok(trimmed.to_string())
}
