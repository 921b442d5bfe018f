//! Wallet configuration.
//!
//! Tunables only. The KDF iteration counts are protocol constants and live
//! in [`crate::encryption`] and [`crate::mnemonic`].

use std::time::Duration;

use crate::error::WalletError;

/// Default maximum number of wallets in one vault.
pub const DEFAULT_MAX_WALLETS: usize = 5;

/// Default inactivity period after which an unlocked session locks.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default minimum password length for new vaults.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

/// Configuration for vault and session behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    /// Upper bound on wallets held by the vault.
    pub max_wallets: usize,
    /// Unlocked sessions lock once idle for longer than this.
    pub inactivity_timeout: Duration,
    /// Minimum password length accepted when creating or re-keying a vault.
    pub min_password_len: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            max_wallets: DEFAULT_MAX_WALLETS,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl WalletConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `OCT_MAX_WALLETS`, `OCT_LOCK_TIMEOUT_SECS` and
    /// `OCT_MIN_PASSWORD_LEN`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("OCT_MAX_WALLETS") {
            cfg.max_wallets = parse_positive(&v, "OCT_MAX_WALLETS")? as usize;
        }
        if let Some(v) = lookup("OCT_LOCK_TIMEOUT_SECS") {
            cfg.inactivity_timeout =
                Duration::from_secs(parse_positive(&v, "OCT_LOCK_TIMEOUT_SECS")?);
        }
        if let Some(v) = lookup("OCT_MIN_PASSWORD_LEN") {
            cfg.min_password_len = parse_positive(&v, "OCT_MIN_PASSWORD_LEN")? as usize;
        }

        Ok(cfg)
    }
}

fn parse_positive(value: &str, name: &str) -> Result<u64, WalletError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(WalletError::Config(format!(
            "{name} must be a positive integer, got {value:?}"
        ))),
    }
}
