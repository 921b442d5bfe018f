//! Parsing of ledger service responses.
//!
//! The HTTP client lives elsewhere; these types only pull the fields the
//! wallet needs out of the JSON it gets back. Unknown fields are ignored.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use oct_core::{Address, Amount};

use crate::encryption::EncryptedEnvelope;
use crate::error::WalletError;
use crate::private_transfer::{
    ENCRYPTED_BALANCE_PREFIX, EphemeralPublicKey, PrivateTransfer, decode_encrypted_balance,
    encode_encrypted_balance,
};

fn malformed(msg: impl Into<String>) -> WalletError {
    WalletError::MalformedResponse(msg.into())
}

/// `{balance, nonce}` for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceResponse {
    pub balance: Amount,
    pub nonce: u64,
    /// Private balance, when the service reports one.
    pub encrypted_balance: Option<EncryptedEnvelope>,
}

#[derive(Deserialize)]
struct BalanceRepr {
    balance: Option<Value>,
    nonce: Option<Value>,
    #[serde(default)]
    encrypted_balance: Option<String>,
}

impl BalanceResponse {
    /// Parse a balance response.
    ///
    /// `balance` is either a decimal OCT string (`"12.5"`) or an integer in
    /// micro-units. `nonce` is an integer or a decimal string. An
    /// `encrypted_balance` of `"0"` or empty means none.
    pub fn from_json(body: &[u8]) -> Result<Self, WalletError> {
        let repr: BalanceRepr =
            serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;

        let balance = match repr.balance.ok_or_else(|| malformed("missing balance"))? {
            Value::String(s) => Amount::from_oct_str(&s)?,
            Value::Number(n) => n
                .as_u64()
                .map(Amount::from_micro)
                .ok_or_else(|| malformed("balance must be a non-negative integer"))?,
            _ => return Err(malformed("balance has unexpected type")),
        };

        let nonce = match repr.nonce.ok_or_else(|| malformed("missing nonce"))? {
            Value::Number(n) => n.as_u64().ok_or_else(|| malformed("nonce out of range"))?,
            Value::String(s) => s.trim().parse().map_err(|_| malformed("nonce is not a number"))?,
            _ => return Err(malformed("nonce has unexpected type")),
        };

        let encrypted_balance = match repr.encrypted_balance.as_deref().map(str::trim) {
            None | Some("") | Some("0") => None,
            Some(s) => Some(decode_encrypted_balance(s)?),
        };

        Ok(Self {
            balance,
            nonce,
            encrypted_balance,
        })
    }

    /// Nonce to sign the next transaction with.
    pub fn next_nonce(&self) -> u64 {
        self.nonce.saturating_add(1)
    }
}

/// Result of submitting a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "txHash")]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn from_json(body: &[u8]) -> Result<Self, WalletError> {
        serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))
    }

    /// Transaction hash on success.
    ///
    /// A refusal reports [`WalletError::Rejected`] with the service's reason;
    /// a reply claiming success without a hash is a
    /// [`WalletError::MalformedResponse`].
    pub fn into_result(self) -> Result<String, WalletError> {
        match (self.success, self.tx_hash, self.error) {
            (true, Some(hash), _) if !hash.is_empty() => Ok(hash),
            (true, _, _) => Err(malformed("success without tx_hash")),
            (false, _, Some(err)) => Err(WalletError::Rejected(err)),
            (false, _, None) => Err(WalletError::Rejected("no reason given".into())),
        }
    }
}

/// A private transfer waiting to be claimed, as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PendingTransfer {
    /// Service-assigned identifier used when submitting the claim.
    pub id: Value,
    pub sender: Address,
    pub ephemeral_key: String,
    pub encrypted_data: String,
}

impl PendingTransfer {
    /// Service id rendered as a string.
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuild the [`PrivateTransfer`] for claiming.
    ///
    /// `encrypted_data` may carry the `v2|` prefix or be bare base64. The
    /// transfer id is recomputed from the content; the service id is kept
    /// on `self`.
    pub fn to_private_transfer(&self) -> Result<PrivateTransfer, WalletError> {
        let ephemeral_public_key = EphemeralPublicKey::from_base64(&self.ephemeral_key)?;
        let data = self.encrypted_data.trim();
        let encrypted_amount = if data.starts_with(ENCRYPTED_BALANCE_PREFIX) {
            decode_encrypted_balance(data)?
        } else {
            let bytes = STANDARD.decode(data).map_err(|_| WalletError::InvalidEnvelope)?;
            EncryptedEnvelope::from_bytes(&bytes)?
        };
        let transfer_id = PrivateTransfer::compute_id(&ephemeral_public_key, &encrypted_amount);
        Ok(PrivateTransfer {
            sender: self.sender.clone(),
            ephemeral_public_key,
            encrypted_amount,
            transfer_id,
        })
    }

    /// Wire form of a freshly created transfer, for submission.
    pub fn from_private_transfer(transfer: &PrivateTransfer) -> Self {
        Self {
            id: Value::String(transfer.transfer_id.clone()),
            sender: transfer.sender.clone(),
            ephemeral_key: transfer.ephemeral_public_key.to_base64(),
            encrypted_data: encode_encrypted_balance(&transfer.encrypted_amount),
        }
    }
}

#[derive(Deserialize)]
struct PendingRepr {
    #[serde(default, alias = "transfers")]
    pending_transfers: Vec<PendingTransfer>,
}

/// Parse `{"pending_transfers": [...]}` (or `{"transfers": [...]}`).
pub fn parse_pending_transfers(body: &[u8]) -> Result<Vec<PendingTransfer>, WalletError> {
    let repr: PendingRepr = serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
    Ok(repr.pending_transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::private_transfer::{
        balance_key, claim_private_transfer, create_private_transfer, encrypt_balance,
    };
    use oct_core::KeyPair;

    #[test]
    fn balance_as_decimal_string() {
        let r = BalanceResponse::from_json(br#"{"balance":"12.5","nonce":7}"#).unwrap();
        assert_eq!(r.balance, Amount::from_micro(12_500_000));
        assert_eq!(r.nonce, 7);
        assert_eq!(r.next_nonce(), 8);
        assert!(r.encrypted_balance.is_none());
    }

    #[test]
    fn balance_as_micro_integer() {
        let r = BalanceResponse::from_json(br#"{"balance":1500000,"nonce":"3","extra":true}"#)
            .unwrap();
        assert_eq!(r.balance, Amount::from_micro(1_500_000));
        assert_eq!(r.nonce, 3);
    }

    #[test]
    fn balance_missing_fields() {
        assert!(matches!(
            BalanceResponse::from_json(br#"{"nonce":1}"#).unwrap_err(),
            WalletError::MalformedResponse(_)
        ));
        assert!(matches!(
            BalanceResponse::from_json(br#"{"balance":"1"}"#).unwrap_err(),
            WalletError::MalformedResponse(_)
        ));
        assert!(BalanceResponse::from_json(b"not json").is_err());
    }

    #[test]
    fn balance_rejects_negative_or_float_micro() {
        assert!(BalanceResponse::from_json(br#"{"balance":-5,"nonce":1}"#).is_err());
        assert!(BalanceResponse::from_json(br#"{"balance":1.5,"nonce":1}"#).is_err());
    }

    #[test]
    fn balance_with_encrypted_part() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let key = balance_key(&kp);
        let env = encrypt_balance(Amount::from_micro(99), &key).unwrap();
        let body = serde_json::json!({
            "balance": "0",
            "nonce": 0,
            "encrypted_balance": encode_encrypted_balance(&env),
        });
        let r = BalanceResponse::from_json(body.to_string().as_bytes()).unwrap();
        assert_eq!(r.encrypted_balance, Some(env));

        let zero = BalanceResponse::from_json(br#"{"balance":"0","nonce":0,"encrypted_balance":"0"}"#)
            .unwrap();
        assert!(zero.encrypted_balance.is_none());
    }

    #[test]
    fn submit_success() {
        let r = SubmitResponse::from_json(br#"{"success":true,"txHash":"abc123"}"#).unwrap();
        assert_eq!(r.into_result().unwrap(), "abc123");
    }

    #[test]
    fn submit_error_carried() {
        let r = SubmitResponse::from_json(br#"{"success":false,"error":"nonce too low"}"#).unwrap();
        assert_eq!(
            r.into_result().unwrap_err(),
            WalletError::Rejected("nonce too low".into())
        );
    }

    #[test]
    fn submit_refusal_without_reason() {
        let r = SubmitResponse::from_json(br#"{"success":false}"#).unwrap();
        assert!(matches!(r.into_result(), Err(WalletError::Rejected(_))));
    }

    #[test]
    fn submit_success_without_hash() {
        let r = SubmitResponse::from_json(br#"{"success":true}"#).unwrap();
        assert!(matches!(
            r.into_result(),
            Err(WalletError::MalformedResponse(_))
        ));
    }

    #[test]
    fn pending_transfer_claim_flow() {
        let alice = KeyPair::from_secret_bytes([0xA1; 32]);
        let bob = KeyPair::from_secret_bytes([0xB0; 32]);
        let t = create_private_transfer(&alice, &bob.public_key(), Amount::from_micro(5_000))
            .unwrap();

        let wire = PendingTransfer::from_private_transfer(&t);
        let body = serde_json::json!({
            "pending_transfers": [{
                "id": 17,
                "sender": wire.sender,
                "ephemeral_key": wire.ephemeral_key,
                "encrypted_data": wire.encrypted_data,
                "epoch_id": 4,
            }]
        });
        let pending = parse_pending_transfers(body.to_string().as_bytes()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id_string(), "17");

        let rebuilt = pending[0].to_private_transfer().unwrap();
        assert_eq!(rebuilt.transfer_id, t.transfer_id);
        assert_eq!(claim_private_transfer(&bob, &rebuilt).unwrap(), Amount::from_micro(5_000));
    }

    #[test]
    fn pending_transfer_bare_base64() {
        let alice = KeyPair::from_secret_bytes([0xA1; 32]);
        let bob = KeyPair::from_secret_bytes([0xB0; 32]);
        let t = create_private_transfer(&alice, &bob.public_key(), Amount::from_micro(1)).unwrap();
        let mut wire = PendingTransfer::from_private_transfer(&t);
        wire.encrypted_data = wire.encrypted_data.trim_start_matches("v2|").to_string();
        let rebuilt = wire.to_private_transfer().unwrap();
        assert_eq!(claim_private_transfer(&bob, &rebuilt).unwrap(), Amount::from_micro(1));
    }

    #[test]
    fn pending_transfer_bad_key() {
        let body = serde_json::json!({
            "transfers": [{
                "id": "x",
                "sender": KeyPair::from_secret_bytes([1u8; 32]).address(),
                "ephemeral_key": "AAAA",
                "encrypted_data": "v2|AAAA",
            }]
        });
        let pending = parse_pending_transfers(body.to_string().as_bytes()).unwrap();
        assert!(pending[0].to_private_transfer().is_err());
    }

    #[test]
    fn empty_pending_list() {
        assert!(parse_pending_transfers(b"{}").unwrap().is_empty());
    }
}
