//! Address encoding for the Octra network.
//!
//! An address is the literal prefix `oct` followed by the Base58 (Bitcoin
//! alphabet) encoding of the first 25 bytes of `SHA-256(public_key)`.
//!
//! The format carries no checksum of its own. A mistyped address can still
//! decode to a syntactically valid 25-byte payload, so validation here is
//! purely syntactic and callers rely on the network to reject unknown
//! recipients.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::constants::{ADDRESS_PAYLOAD_LEN, ADDRESS_PREFIX};
use crate::crypto::PublicKey;
use crate::error::CoreError;

/// Longest Base58 rendering of a 25-byte payload.
const MAX_ENCODED_LEN: usize = 35;

/// A syntactically valid Octra address.
///
/// Constructed only by derivation from a public key or by parsing a string
/// that passes [`validate_address_format`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Derive the address for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(derive_address(&public_key.to_bytes()))
    }

    /// Parse and validate an address string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if validate_address_format(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidAddress(s.to_string()))
        }
    }

    /// The address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 25-byte payload encoded in this address.
    pub fn payload(&self) -> [u8; ADDRESS_PAYLOAD_LEN] {
        let mut out = [0u8; ADDRESS_PAYLOAD_LEN];
        // Construction guarantees the decode succeeds with the right length.
        if let Ok(bytes) = bs58::decode(&self.0[ADDRESS_PREFIX.len()..]).into_vec() {
            if bytes.len() == ADDRESS_PAYLOAD_LEN {
                out.copy_from_slice(&bytes);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive the address string for raw public key bytes.
pub fn derive_address(public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(public_key);
    let encoded = bs58::encode(&digest[..ADDRESS_PAYLOAD_LEN]).into_string();
    let mut out = String::with_capacity(ADDRESS_PREFIX.len() + encoded.len());
    out.push_str(ADDRESS_PREFIX);
    out.push_str(&encoded);
    out
}

/// Syntactic address check: prefix, Base58 alphabet, 25-byte payload.
///
/// Says nothing about whether a key for this address exists.
pub fn validate_address_format(s: &str) -> bool {
    let Some(body) = s.strip_prefix(ADDRESS_PREFIX) else {
        return false;
    };
    if body.is_empty() || body.len() > MAX_ENCODED_LEN {
        return false;
    }
    match bs58::decode(body).into_vec() {
        Ok(bytes) => bytes.len() == ADDRESS_PAYLOAD_LEN,
        Err(_) => false,
    }
}
