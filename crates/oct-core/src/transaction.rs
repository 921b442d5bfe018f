//! Canonical transaction serialization and Ed25519 signing.
//!
//! # Signing scheme
//!
//! The signed payload is the compact JSON object
//!
//! ```text
//! {"from":…,"to_":…,"amount":"<micro>","nonce":N,"ou":"<tier>","timestamp":T}
//! ```
//!
//! with exactly these keys in exactly this order, regardless of how the draft
//! was assembled. The free-text `message` and the signature itself are not
//! part of the payload: a relay can rewrite `message` without invalidating
//! the signature, so consumers must treat it as unauthenticated metadata.
//!
//! Nonce and fee tier come from the caller (usually from the network's
//! balance query). The signer never fetches or caches them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::crypto::{KeyPair, PublicKey, TxSignature};
use crate::error::CoreError;
use crate::types::{Amount, FeeTier};

/// A transaction as assembled by the application, before signing.
///
/// Every field is optional so that an incomplete draft is representable;
/// [`canonicalize`] rejects drafts missing any signed field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionDraft {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub amount: Option<Amount>,
    pub nonce: Option<u64>,
    pub fee_tier: Option<FeeTier>,
    /// Seconds since the Unix epoch.
    pub timestamp: Option<f64>,
    /// Unsigned free-text memo.
    pub message: Option<String>,
}

impl TransactionDraft {
    /// Start an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, address: Address) -> Self {
        self.from = Some(address);
        self
    }

    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn fee_tier(mut self, tier: FeeTier) -> Self {
        self.fee_tier = Some(tier);
        self
    }

    pub fn timestamp(mut self, secs: f64) -> Self {
        self.timestamp = Some(secs);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Fixed-order view of the signed fields. Serde emits struct fields in
/// declaration order, which is what pins the canonical key order.
#[derive(Serialize)]
struct CanonicalFields<'a> {
    from: &'a str,
    to_: &'a str,
    amount: Amount,
    nonce: u64,
    ou: FeeTier,
    timestamp: f64,
}

fn canonical_fields(draft: &TransactionDraft) -> Result<CanonicalFields<'_>, CoreError> {
    let from = draft.from.as_ref().ok_or(CoreError::MissingField("from"))?;
    let to = draft.to.as_ref().ok_or(CoreError::MissingField("to"))?;
    let amount = draft.amount.ok_or(CoreError::MissingField("amount"))?;
    let nonce = draft.nonce.ok_or(CoreError::MissingField("nonce"))?;
    let ou = draft.fee_tier.ok_or(CoreError::MissingField("fee_tier"))?;
    let timestamp = draft.timestamp.ok_or(CoreError::MissingField("timestamp"))?;
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(CoreError::Serialization(
            "timestamp must be a finite non-negative number".into(),
        ));
    }
    Ok(CanonicalFields {
        from: from.as_str(),
        to_: to.as_str(),
        amount,
        nonce,
        ou,
        timestamp,
    })
}

/// Byte-exact canonical form of the draft's signed fields.
pub fn canonicalize(draft: &TransactionDraft) -> Result<Vec<u8>, CoreError> {
    let fields = canonical_fields(draft)?;
    serde_json::to_vec(&fields).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Sign the canonical form of `draft`.
///
/// Refuses drafts whose sender is not `keypair`'s address, and checks the
/// produced signature before returning it.
pub fn sign(keypair: &KeyPair, draft: &TransactionDraft) -> Result<TxSignature, CoreError> {
    let payload = canonicalize(draft)?;
    if draft.from.as_ref() != Some(&keypair.address()) {
        return Err(CoreError::SenderMismatch);
    }
    let signature = keypair.sign(&payload);
    keypair.public_key().verify(&payload, &signature)?;
    Ok(signature)
}

/// Check `signature` against the canonical form of `draft`.
///
/// Returns `false` for incomplete drafts as well as for bad signatures.
pub fn verify(public_key: &PublicKey, draft: &TransactionDraft, signature: &TxSignature) -> bool {
    match canonicalize(draft) {
        Ok(payload) => public_key.verify(&payload, signature).is_ok(),
        Err(_) => false,
    }
}

/// A signed transaction in the shape the network accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub from: Address,
    #[serde(rename = "to_")]
    pub to: Address,
    pub amount: Amount,
    pub nonce: u64,
    #[serde(rename = "ou")]
    pub fee_tier: FeeTier,
    pub timestamp: f64,
    pub signature: TxSignature,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SignedTransaction {
    /// Canonicalize, sign and bundle `draft` with the signer's public key.
    pub fn sign(keypair: &KeyPair, draft: &TransactionDraft) -> Result<Self, CoreError> {
        let signature = sign(keypair, draft)?;
        // sign() already proved every required field is present.
        let fields = canonical_fields(draft)?;
        Ok(Self {
            from: keypair.address(),
            to: Address::parse(fields.to_)?,
            amount: fields.amount,
            nonce: fields.nonce,
            fee_tier: fields.ou,
            timestamp: fields.timestamp,
            signature,
            public_key: keypair.public_key(),
            message: draft.message.clone(),
        })
    }

    /// The draft this transaction was signed from.
    pub fn draft(&self) -> TransactionDraft {
        TransactionDraft {
            from: Some(self.from.clone()),
            to: Some(self.to.clone()),
            amount: Some(self.amount),
            nonce: Some(self.nonce),
            fee_tier: Some(self.fee_tier),
            timestamp: Some(self.timestamp),
            message: self.message.clone(),
        }
    }

    /// Canonical signed bytes.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        canonicalize(&self.draft())
    }

    /// Lowercase hex SHA-256 of the canonical bytes.
    pub fn hash(&self) -> Result<String, CoreError> {
        Ok(hex::encode(Sha256::digest(self.canonical_bytes()?)))
    }

    /// Self-check before submission: the embedded key owns `from` and the
    /// signature verifies.
    pub fn verify(&self) -> bool {
        Address::from_public_key(&self.public_key) == self.from
            && verify(&self.public_key, &self.draft(), &self.signature)
    }
}
