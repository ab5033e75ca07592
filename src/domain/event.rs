//! Events observed on the watched contract.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::amount::amount_from_json;
use super::error::DomainError;
use super::id::{CorrelationId, EventId, TokenId};
use super::quote::SwapQuoteRequest;

/// Event kind emitted by the AMM contract when a swap needs a quote.
pub const SWAP_REQUEST_EVENT: &str = "run_agent";

/// An immutable record observed on the ledger.
///
/// `cursor` increases strictly with every event the contract emits and is
/// the only basis for deciding what is new since the last poll.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainEvent {
    #[serde(deserialize_with = "de_flexible_string")]
    pub id: EventId,
    #[serde(rename = "type")]
    pub kind: String,
    pub contract: String,
    #[serde(default)]
    pub payload: Value,
    pub cursor: u64,
}

impl ChainEvent {
    /// Decode the payload of a swap-request event.
    pub fn swap_request(&self) -> Result<SwapRequest, PayloadError> {
        let payload: SwapRequestPayload = serde_json::from_value(self.payload.clone())
            .map_err(|e| PayloadError::Schema(e.to_string()))?;
        payload.into_request()
    }
}

/// A decoded `run_agent` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub correlation_id: CorrelationId,
    pub quote: SwapQuoteRequest,
}

/// Why a payload could not be turned into a [`SwapRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload does not match the swap request schema: {0}")]
    Schema(String),

    #[error(transparent)]
    Amount(#[from] DomainError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequestPayload {
    token_in: String,
    token_out: String,
    amount_in: Value,
    #[serde(deserialize_with = "de_flexible_string")]
    correlation_id: CorrelationId,
}

impl SwapRequestPayload {
    fn into_request(self) -> Result<SwapRequest, PayloadError> {
        if self.token_in.is_empty() || self.token_out.is_empty() {
            return Err(PayloadError::Schema("token ids must not be empty".into()));
        }
        let amount_in = amount_from_json(&self.amount_in)?;
        Ok(SwapRequest {
            correlation_id: self.correlation_id,
            quote: SwapQuoteRequest {
                token_in: TokenId::new(self.token_in),
                token_out: TokenId::new(self.token_out),
                amount_in,
            },
        })
    }
}

/// Contracts emit ids as either JSON strings or integers.
fn de_flexible_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => T::from(s),
        Raw::Number(n) => T::from(n.to_string()),
    })
}
