//! Lock/unlock state machine for the vault.
//!
//! ```text
//!            unlock(password) / create_vault / resume
//!   Locked ─────────────────────────────────────────▶ Unlocked
//!     ▲                                                  │
//!     └──────── lock() / idle > inactivity_timeout ──────┘
//! ```
//!
//! The session key and the decrypted vault exist only in the `Unlocked`
//! state and are dropped (and zeroized) the moment the manager locks. A new
//! manager always starts `Locked`. Resuming across restarts is possible only
//! through [`SessionManager::export_session`], which hands out the session key
//! wrapped under a caller-held key with an expiry, never the key itself.
//!
//! The inactivity timeout is evaluated lazily: every query looks at the
//! clock first, so there is no timer thread. Callers serialize transitions;
//! the manager takes `&mut self` for all of them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::config::WalletConfig;
use crate::encryption::{
    self, EncryptedEnvelope, KEY_LEN, RESUME_AAD, SealedVault, SessionKey,
};
use crate::error::WalletError;
use crate::vault::Vault;

/// Source of the current time, as a [`Duration`] since an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Hand-driven clock with millisecond resolution. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at `start`.
    pub fn new(start: Duration) -> Self {
        let clock = Self::default();
        clock.set(start);
        clock
    }

    /// Move time forward, saturating at the largest representable reading.
    pub fn advance(&self, by: Duration) {
        let by = millis_saturating(by);
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ms| {
                Some(ms.saturating_add(by))
            });
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Duration) {
        self.millis.store(millis_saturating(to), Ordering::SeqCst);
    }
}

fn millis_saturating(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Session key wrapped for a later [`SessionManager::resume`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Session key encrypted under the caller's resume key.
    pub wrapped_session_key: EncryptedEnvelope,
    /// Clock reading, in milliseconds, after which the session cannot resume.
    pub expires_at_ms: u64,
}

/// Secrets held while unlocked.
struct UnlockedSession {
    session_key: SessionKey,
    vault: Vault,
    last_activity: Duration,
}

/// Owns the session key and decrypted vault while unlocked.
pub struct SessionManager<C: Clock = SystemClock> {
    config: WalletConfig,
    clock: C,
    session: Option<UnlockedSession>,
}

impl SessionManager<SystemClock> {
    /// Manager on the system clock.
    pub fn with_system_clock(config: WalletConfig) -> Self {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> SessionManager<C> {
    /// New manager. Always starts locked.
    pub fn new(config: WalletConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            session: None,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Seal `vault` under a new password and enter the unlocked state.
    ///
    /// Returns the [`SealedVault`] the caller must persist.
    pub fn create_vault(&mut self, password: &str, vault: Vault) -> Result<SealedVault, WalletError> {
        self.check_password_strength(password)?;
        self.lock();
        let (sealed, session_key) = SealedVault::create(password, &vault)?;
        info!(wallets = vault.len(), "vault created");
        self.enter_unlocked(session_key, vault);
        Ok(sealed)
    }

    /// Unlock with `password` against the persisted vault.
    ///
    /// Any previous session is locked first. A wrong password reports
    /// [`WalletError::AuthenticationFailed`] and the manager stays locked.
    pub fn unlock(&mut self, password: &str, sealed: &SealedVault) -> Result<&Vault, WalletError> {
        self.lock();
        let session_key = sealed.unwrap_session_key(password).map_err(|e| match e {
            WalletError::VaultCorruptOrWrongPassword => {
                warn!("unlock rejected");
                WalletError::AuthenticationFailed
            }
            other => other,
        })?;
        let vault = encryption::decrypt_vault(&sealed.vault, &session_key)?;
        info!(wallets = vault.len(), "session unlocked");
        Ok(&self.enter_unlocked(session_key, vault).vault)
    }

    /// Drop the session key and decrypted vault. No-op when already locked.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            info!("session locked");
        }
    }

    /// Current state, after applying the inactivity timeout.
    pub fn lock_state(&mut self) -> LockState {
        self.expire_if_idle();
        if self.session.is_some() {
            LockState::Unlocked
        } else {
            LockState::Locked
        }
    }

    /// True when the session is unlocked and not yet idle-expired.
    pub fn is_unlocked(&mut self) -> bool {
        self.lock_state() == LockState::Unlocked
    }

    /// Reset the inactivity timer. No-op while locked.
    pub fn record_activity(&mut self) {
        self.expire_if_idle();
        let now = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            session.last_activity = now;
        }
    }

    /// The decrypted vault.
    pub fn vault(&mut self) -> Result<&Vault, WalletError> {
        Ok(&self.active()?.vault)
    }

    /// Mutate the vault and re-encrypt it under the session key.
    ///
    /// `f` runs against a copy. When it fails, or encryption fails, the
    /// held vault is unchanged. On success the copy replaces it, activity is
    /// recorded, and the new vault envelope is returned for the caller to
    /// persist.
    pub fn update_vault<T, F>(&mut self, f: F) -> Result<(T, EncryptedEnvelope), WalletError>
    where
        F: FnOnce(&mut Vault) -> Result<T, WalletError>,
    {
        let now = self.clock.now();
        let session = self.active()?;
        let mut draft = session.vault.clone();
        let out = f(&mut draft)?;
        let envelope = encryption::encrypt_vault(&draft, &session.session_key)?;
        session.vault = draft;
        session.last_activity = now;
        debug!(wallets = session.vault.len(), "vault re-encrypted");
        Ok((out, envelope))
    }

    /// Re-key the vault under `new_password`.
    ///
    /// Requires an unlocked session and the current password. Only the
    /// session key is re-wrapped; the vault envelope in `sealed` carries over.
    pub fn change_password(
        &mut self,
        current_password: &str,
        new_password: &str,
        sealed: &SealedVault,
    ) -> Result<SealedVault, WalletError> {
        self.check_password_strength(new_password)?;
        let now = self.clock.now();
        let session = self.active()?;
        let unwrapped = sealed
            .unwrap_session_key(current_password)
            .map_err(|_| WalletError::AuthenticationFailed)?;
        if !bool::from(unwrapped.as_bytes().ct_eq(session.session_key.as_bytes())) {
            // Sealed vault belongs to a different session.
            return Err(WalletError::VaultCorruptOrWrongPassword);
        }
        let (salt, wrapped_session_key) =
            encryption::rewrap_session_key(&session.session_key, new_password)?;
        session.last_activity = now;
        info!("vault password changed");
        Ok(SealedVault {
            salt,
            wrapped_session_key,
            vault: sealed.vault.clone(),
        })
    }

    /// Wrap the session key under `resume_key` for a later [`Self::resume`].
    ///
    /// The expiry is bound into the envelope's associated data, so editing
    /// `expires_at_ms` makes the resume fail. A `ttl` whose expiry does not
    /// fit in `u64` milliseconds is a [`WalletError::Config`] error.
    pub fn export_session(
        &mut self,
        resume_key: &[u8; KEY_LEN],
        ttl: Duration,
    ) -> Result<PersistedSession, WalletError> {
        let now = self.clock.now();
        let session = self.active()?;
        let expires_at_ms = now
            .checked_add(ttl)
            .and_then(|at| u64::try_from(at.as_millis()).ok())
            .ok_or_else(|| WalletError::Config(format!("session ttl out of range: {ttl:?}")))?;
        let wrapped_session_key = encryption::seal(
            resume_key,
            session.session_key.as_bytes(),
            &resume_aad(expires_at_ms),
        )?;
        debug!(expires_at_ms, "session exported");
        Ok(PersistedSession {
            wrapped_session_key,
            expires_at_ms,
        })
    }

    /// Re-enter the unlocked state from an exported session.
    ///
    /// Fails with [`WalletError::SessionExpired`] past the expiry and with
    /// [`WalletError::VaultCorruptOrWrongPassword`] when the resume key, the
    /// persisted session or the vault envelope does not check out. The
    /// manager stays locked on every failure.
    pub fn resume(
        &mut self,
        persisted: &PersistedSession,
        resume_key: &[u8; KEY_LEN],
        sealed: &SealedVault,
    ) -> Result<&Vault, WalletError> {
        self.lock();
        let now_ms = millis_saturating(self.clock.now());
        if now_ms >= persisted.expires_at_ms {
            debug!(now_ms, expires_at_ms = persisted.expires_at_ms, "persisted session expired");
            return Err(WalletError::SessionExpired);
        }
        let session_key = encryption::unwrap_key_with(
            resume_key,
            &persisted.wrapped_session_key,
            &resume_aad(persisted.expires_at_ms),
        )?;
        let vault = encryption::decrypt_vault(&sealed.vault, &session_key)?;
        info!(wallets = vault.len(), "session resumed");
        Ok(&self.enter_unlocked(session_key, vault).vault)
    }

    fn enter_unlocked(&mut self, session_key: SessionKey, vault: Vault) -> &UnlockedSession {
        let last_activity = self.clock.now();
        self.session.insert(UnlockedSession {
            session_key,
            vault,
            last_activity,
        })
    }

    fn active(&mut self) -> Result<&mut UnlockedSession, WalletError> {
        self.expire_if_idle();
        self.session.as_mut().ok_or(WalletError::Locked)
    }

    fn expire_if_idle(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let idle = self.clock.now().saturating_sub(session.last_activity);
        if idle > self.config.inactivity_timeout {
            info!(idle_secs = idle.as_secs(), "session locked after inactivity");
            self.session = None;
        }
    }

    fn check_password_strength(&self, password: &str) -> Result<(), WalletError> {
        let min = self.config.min_password_len;
        if password.chars().count() < min {
            return Err(WalletError::WeakPassword { min });
        }
        Ok(())
    }
}

fn resume_aad(expires_at_ms: u64) -> Vec<u8> {
    let mut aad = RESUME_AAD.to_vec();
    aad.extend_from_slice(&expires_at_ms.to_be_bytes());
    aad
}
