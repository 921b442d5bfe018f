//! Monetary amounts and fee tiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{LARGE_TRANSFER_THRESHOLD, MICRO_PER_OCT, OCT_DECIMALS};
use crate::error::CoreError;

/// An amount in micro-OCT.
///
/// Serialized as a decimal-string integer (`"1500000"`) so the value never
/// passes through a floating-point type on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Amount from micro-units.
    pub const fn from_micro(micro: u64) -> Self {
        Self(micro)
    }

    /// Amount from whole OCT. `None` on overflow.
    pub fn from_oct(oct: u64) -> Option<Self> {
        oct.checked_mul(MICRO_PER_OCT).map(Self)
    }

    /// Value in micro-units.
    pub const fn micro(&self) -> u64 {
        self.0
    }

    /// True for the zero amount.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal-string integer of micro-units (`"1500000"`).
    pub fn from_micro_str(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidAmount(s.to_string()));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidAmount(s.to_string()))
    }

    /// Parse a decimal OCT string (`"1.5"`) with at most six fractional digits.
    pub fn from_oct_str(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        let invalid = || CoreError::InvalidAmount(s.to_string());

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.contains('.') && (frac.is_empty() || frac.len() > OCT_DECIMALS) {
            return Err(invalid());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let mut frac_micro: u64 = 0;
        if !frac.is_empty() {
            let padded = format!("{frac:0<width$}", width = OCT_DECIMALS);
            frac_micro = padded.parse().map_err(|_| invalid())?;
        }
        whole
            .checked_mul(MICRO_PER_OCT)
            .and_then(|w| w.checked_add(frac_micro))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Decimal OCT rendering with trailing zeros trimmed (`"1.5"`, `"12"`).
    pub fn to_oct_string(&self) -> String {
        let whole = self.0 / MICRO_PER_OCT;
        let frac = self.0 % MICRO_PER_OCT;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{frac:0>width$}", width = OCT_DECIMALS);
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} OCT", self.to_oct_string())
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_oct_str(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_micro_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Operation units paid for a transaction, chosen by the caller.
///
/// Rendered on the wire as a decimal string (`"ou": "1"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeeTier(u32);

impl FeeTier {
    /// Default tier for ordinary transfers.
    pub const STANDARD: FeeTier = FeeTier(1);

    /// Tier for transfers at or above [`LARGE_TRANSFER_THRESHOLD`].
    pub const LARGE_TRANSFER: FeeTier = FeeTier(3);

    /// Explicit operation-unit count. Zero is not a valid tier.
    pub fn new(units: u32) -> Result<Self, CoreError> {
        if units == 0 {
            return Err(CoreError::InvalidAmount("fee tier must be positive".into()));
        }
        Ok(Self(units))
    }

    /// The tier the network expects for a transfer of `amount`.
    pub fn for_amount(amount: Amount) -> Self {
        if amount.micro() >= LARGE_TRANSFER_THRESHOLD {
            Self::LARGE_TRANSFER
        } else {
            Self::STANDARD
        }
    }

    /// Operation-unit count.
    pub fn units(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FeeTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for FeeTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let units: u32 = s.parse().map_err(serde::de::Error::custom)?;
        Self::new(units).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_oct() {
        assert_eq!(Amount::from_oct_str("12").unwrap().micro(), 12_000_000);
    }

    #[test]
    fn parse_fractional_oct() {
        assert_eq!(Amount::from_oct_str("1.5").unwrap().micro(), 1_500_000);
        assert_eq!(Amount::from_oct_str("0.000001").unwrap().micro(), 1);
        assert_eq!(Amount::from_oct_str(" 2.25 ").unwrap().micro(), 2_250_000);
    }

    #[test]
    fn reject_malformed_oct_strings() {
        for bad in ["", ".", "1.", ".5", "-1", "1.2.3", "abc", "1.0000001", "1e6", "+1"] {
            assert!(Amount::from_oct_str(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn reject_overflow() {
        assert!(Amount::from_oct_str("18446744073709551615").is_err());
        assert!(Amount::from_oct(u64::MAX).is_none());
    }

    #[test]
    fn oct_string_trims_zeros() {
        assert_eq!(Amount::from_micro(1_500_000).to_oct_string(), "1.5");
        assert_eq!(Amount::from_micro(12_000_000).to_oct_string(), "12");
        assert_eq!(Amount::from_micro(1).to_oct_string(), "0.000001");
        assert_eq!(Amount::ZERO.to_oct_string(), "0");
    }

    #[test]
    fn display_includes_unit() {
        assert_eq!(Amount::from_micro(2_500_000).to_string(), "2.5 OCT");
    }

    #[test]
    fn serde_as_micro_string() {
        let a = Amount::from_micro(1_500_000);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"1500000\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn serde_rejects_numbers_and_signs() {
        assert!(serde_json::from_str::<Amount>("1500000").is_err());
        assert!(serde_json::from_str::<Amount>("\"-5\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"1.5\"").is_err());
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount::from_micro(10);
        let b = Amount::from_micro(3);
        assert_eq!(a.checked_sub(b), Some(Amount::from_micro(7)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::from_micro(u64::MAX).checked_add(b), None);
    }

    #[test]
    fn fee_tier_for_amount() {
        assert_eq!(FeeTier::for_amount(Amount::from_oct(999).unwrap()), FeeTier::STANDARD);
        assert_eq!(
            FeeTier::for_amount(Amount::from_oct(1000).unwrap()),
            FeeTier::LARGE_TRANSFER
        );
    }

    #[test]
    fn fee_tier_rejects_zero() {
        assert!(FeeTier::new(0).is_err());
        assert_eq!(FeeTier::new(5).unwrap().units(), 5);
    }

    #[test]
    fn fee_tier_serde_as_string() {
        let json = serde_json::to_string(&FeeTier::LARGE_TRANSFER).unwrap();
        assert_eq!(json, "\"3\"");
        let back: FeeTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FeeTier::LARGE_TRANSFER);
        assert!(serde_json::from_str::<FeeTier>("\"0\"").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn oct_string_parses_back(micro in any::<u64>()) {
            let a = Amount::from_micro(micro);
            prop_assert_eq!(Amount::from_oct_str(&a.to_oct_string()).unwrap(), a);
        }

        #[test]
        fn parser_never_panics(s in "[0-9. a-z-]{0,30}") {
            let _ = Amount::from_oct_str(&s);
            let _ = Amount::from_micro_str(&s);
        }

        #[test]
        fn fee_tier_monotonic(a in any::<u64>(), b in any::<u64>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo = FeeTier::for_amount(Amount::from_micro(lo)).units();
            let hi = FeeTier::for_amount(Amount::from_micro(hi)).units();
            prop_assert!(lo <= hi);
        }
    }
}
