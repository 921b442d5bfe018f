//! Protocol constants. All monetary values in micro-OCT (1 OCT = 10^6 micro).

/// Micro-units per OCT.
pub const MICRO_PER_OCT: u64 = 1_000_000;

/// Number of fractional decimal digits in an OCT amount.
pub const OCT_DECIMALS: usize = 6;

/// Prefix carried by every address string.
pub const ADDRESS_PREFIX: &str = "oct";

/// Number of SHA-256 digest bytes encoded into an address.
pub const ADDRESS_PAYLOAD_LEN: usize = 25;

/// Ed25519 secret seed length.
pub const SECRET_KEY_LEN: usize = 32;

/// Ed25519 public key length.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Ed25519 detached signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Transfers at or above this amount use the large-transfer fee tier.
pub const LARGE_TRANSFER_THRESHOLD: u64 = 1_000 * MICRO_PER_OCT;
