//! Shared fixtures for the integration tests.

use std::time::Duration;

use oct_core::{Amount, FeeTier, KeyPair, TransactionDraft};
use oct_wallet::{ManualClock, SessionManager, Vault, WalletConfig, WalletId, WalletSource};

/// Password used by every session fixture.
pub const PASSWORD: &str = "correct-horse";

/// Deterministic keypair from a single seed byte.
pub fn keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// Deterministic keypair from a counter, for bulk generation.
pub fn keypair_from_index(i: u64) -> KeyPair {
    let mut secret = [0u8; 32];
    secret[..8].copy_from_slice(&i.to_le_bytes());
    secret[31] = 0x5a;
    KeyPair::from_secret_bytes(secret)
}

/// Vault holding `n` generated wallets named `w0`, `w1`, ...
pub fn sample_vault(n: u8) -> Vault {
    let mut vault = Vault::new();
    for i in 0..n {
        vault
            .add_wallet(&format!("w{i}"), &keypair(i + 1), WalletSource::Generated, usize::from(n))
            .unwrap();
    }
    vault
}

/// Single-wallet vault named `Main`, returning its id too.
pub fn main_vault(kp: &KeyPair) -> (Vault, WalletId) {
    let mut vault = Vault::new();
    let id = vault.add_wallet("Main", kp, WalletSource::Generated, 5).unwrap();
    (vault, id)
}

/// Session manager on a hand-driven clock with the given idle timeout.
pub fn manual_session(timeout: Duration) -> (SessionManager<ManualClock>, ManualClock) {
    let clock = ManualClock::new(Duration::from_secs(1_000));
    let config = WalletConfig {
        inactivity_timeout: timeout,
        ..WalletConfig::default()
    };
    (SessionManager::new(config, clock.clone()), clock)
}

/// Complete draft from `from` to `to`.
pub fn draft(from: &KeyPair, to: &KeyPair, micro: u64, nonce: u64) -> TransactionDraft {
    let amount = Amount::from_micro(micro);
    TransactionDraft::new()
        .from(from.address())
        .to(to.address())
        .amount(amount)
        .nonce(nonce)
        .fee_tier(FeeTier::for_amount(amount))
        .timestamp(1_700_000_000.25)
}
