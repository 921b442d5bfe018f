//! Access to the OS cryptographic random source.
//!
//! Every secret the wallet creates (mnemonic entropy, salts, IVs, session
//! keys, ephemeral keys) is drawn through here. A failing source is reported
//! as [`CoreError::InsufficientEntropySource`]; there is no fallback.

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::CoreError;

/// Fill `buf` with bytes from the OS RNG.
pub fn fill_secure(buf: &mut [u8]) -> Result<(), CoreError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|_| CoreError::InsufficientEntropySource)
}

/// Draw `N` random bytes for a public value (nonce, salt, identifier).
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CoreError> {
    let mut out = [0u8; N];
    fill_secure(&mut out)?;
    Ok(out)
}

/// Draw `N` random bytes for a secret value. Zeroized on drop.
pub fn random_secret<const N: usize>() -> Result<Zeroizing<[u8; N]>, CoreError> {
    let mut out = Zeroizing::new([0u8; N]);
    fill_secure(&mut out[..])?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_differ() {
        let a: [u8; 16] = random_bytes().unwrap();
        let b: [u8; 16] = random_bytes().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn random_secret_is_filled() {
        let s = random_secret::<32>().unwrap();
        assert_ne!(*s, [0u8; 32]);
    }
}
