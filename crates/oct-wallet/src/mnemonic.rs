//! BIP-39 recovery phrases.
//!
//! Generation draws entropy from the OS RNG and appends the standard
//! SHA-256 checksum; validation recomputes it. Stretching a phrase into a
//! seed is PBKDF2-HMAC-SHA512 with 2048 rounds and salt
//! `"mnemonic" || passphrase`, exactly as BIP-39 defines it. That round
//! count belongs to BIP-39 and is unrelated to the vault's own PBKDF2
//! setting in [`crate::encryption`].

use bip39::Language;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use oct_core::entropy;

use crate::error::WalletError;
use crate::keys::Seed;

/// PBKDF2 rounds fixed by BIP-39 for phrase → seed stretching.
pub const MNEMONIC_PBKDF2_ROUNDS: u32 = 2048;

/// Entropy sizes accepted by [`generate_mnemonic`], in bits.
pub const SUPPORTED_ENTROPY_BITS: [usize; 5] = [128, 160, 192, 224, 256];

/// Entropy size used when the caller has no preference (12 words).
pub const DEFAULT_ENTROPY_BITS: usize = 128;

/// A checksummed BIP-39 English recovery phrase.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    inner: bip39::Mnemonic,
}

impl Mnemonic {
    /// The phrase as a single space-separated string. Zeroized on drop.
    pub fn phrase(&self) -> Zeroizing<String> {
        Zeroizing::new(self.inner.to_string())
    }

    /// The individual words, in order.
    pub fn words(&self) -> Vec<String> {
        self.phrase().split(' ').map(str::to_string).collect()
    }

    /// Number of words (12, 15, 18, 21 or 24).
    pub fn word_count(&self) -> usize {
        self.inner.word_count()
    }

    /// Stretch the phrase into a 64-byte seed.
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        let mut raw = self.inner.to_seed(passphrase);
        let seed = Seed::from_bytes(raw);
        raw.zeroize();
        seed
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic")
            .field("words", &self.word_count())
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh phrase carrying `entropy_bits` of OS randomness.
///
/// Fails with [`WalletError::InvalidEntropyLength`] for unsupported sizes and
/// with the core `InsufficientEntropySource` error if the OS RNG is
/// unavailable. There is no weaker fallback.
pub fn generate_mnemonic(entropy_bits: usize) -> Result<Mnemonic, WalletError> {
    if !SUPPORTED_ENTROPY_BITS.contains(&entropy_bits) {
        return Err(WalletError::InvalidEntropyLength(entropy_bits));
    }
    let buf = entropy::random_secret::<32>()?;
    let inner = bip39::Mnemonic::from_entropy_in(Language::English, &buf[..entropy_bits / 8])
        .map_err(|_| WalletError::InvalidEntropyLength(entropy_bits))?;
    Ok(Mnemonic { inner })
}

/// Parse a user-entered phrase.
///
/// Runs of whitespace collapse and case is folded before parsing. Unknown
/// words, wrong word counts and checksum mismatches all yield the same
/// [`WalletError::InvalidMnemonic`].
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    );
    let inner = bip39::Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|_| WalletError::InvalidMnemonic)?;
    Ok(Mnemonic { inner })
}

/// True when `phrase` is a well-formed phrase with a matching checksum.
pub fn validate_mnemonic(phrase: &str) -> bool {
    parse_mnemonic(phrase).is_ok()
}

/// Stretch a phrase into a 64-byte seed. See [`Mnemonic::to_seed`].
pub fn mnemonic_to_seed(mnemonic: &Mnemonic, passphrase: &str) -> Seed {
    mnemonic.to_seed(passphrase)
}
