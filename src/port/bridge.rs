//! Quote bridge port and its message envelopes.
//!
//! The envelope is the only thing that crosses the bridge. Requests are
//! validated against a strict schema (unknown fields rejected) before any
//! field reaches the quote engine.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{parse_amount, DomainError, SwapQuoteRequest, SwapQuoteResult, TokenId};

/// A quote request as sent over the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteRequestEnvelope {
    pub id: String,
    pub token_in: String,
    pub token_out: String,
    /// Base units as a decimal string. JSON integers are accepted on input.
    #[serde(deserialize_with = "de_amount_text")]
    pub amount_in: String,
}

impl QuoteRequestEnvelope {
    pub fn new(id: impl Into<String>, request: &SwapQuoteRequest) -> Self {
        Self {
            id: id.into(),
            token_in: request.token_in.to_string(),
            token_out: request.token_out.to_string(),
            amount_in: request.amount_in.to_string(),
        }
    }

    /// Validate the envelope and build the typed request.
    pub fn to_request(&self) -> Result<SwapQuoteRequest, BridgeRejection> {
        if self.token_in.trim().is_empty() || self.token_out.trim().is_empty() {
            return Err(BridgeRejection::InvalidRequest(
                "tokenIn and tokenOut are required".into(),
            ));
        }
        if self.token_in == self.token_out {
            return Err(BridgeRejection::InvalidRequest(
                "tokenIn and tokenOut must differ".into(),
            ));
        }
        let amount_in = parse_amount(&self.amount_in)?;
        if amount_in.is_zero() {
            return Err(DomainError::illegal("amount in must be positive").into());
        }
        Ok(SwapQuoteRequest {
            token_in: TokenId::new(self.token_in.trim()),
            token_out: TokenId::new(self.token_out.trim()),
            amount_in,
        })
    }
}

/// Machine-readable failure category carried by error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteErrorKind {
    IllegalAmount,
    ArithmeticOverflow,
    ReadError,
    InvalidRequest,
    Unavailable,
}

impl QuoteErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IllegalAmount => "illegal_amount",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::ReadError => "read_error",
            Self::InvalidRequest => "invalid_request",
            Self::Unavailable => "unavailable",
        }
    }
}

/// A quote response. Always well-formed, even when the quote failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuoteResponseEnvelope {
    Ok {
        id: String,
        amount_out: String,
        token_in: String,
        token_out: String,
        amount_in: String,
    },
    Error {
        id: String,
        kind: QuoteErrorKind,
        message: String,
    },
}

impl QuoteResponseEnvelope {
    #[must_use]
    pub fn quoted(id: impl Into<String>, result: &SwapQuoteResult) -> Self {
        Self::Ok {
            id: id.into(),
            amount_out: result.amount_out.to_string(),
            token_in: result.token_in.to_string(),
            token_out: result.token_out.to_string(),
            amount_in: result.amount_in.to_string(),
        }
    }

    #[must_use]
    pub fn error(id: impl Into<String>, kind: QuoteErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            id: id.into(),
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Ok { id, .. } | Self::Error { id, .. } => id,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Reasons the quote side refuses a request before or while pricing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeRejection {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl BridgeRejection {
    #[must_use]
    pub const fn kind(&self) -> QuoteErrorKind {
        match self {
            Self::InvalidRequest(_) => QuoteErrorKind::InvalidRequest,
            Self::Domain(DomainError::IllegalAmount { .. }) => QuoteErrorKind::IllegalAmount,
            Self::Domain(DomainError::ArithmeticOverflow { .. }) => {
                QuoteErrorKind::ArithmeticOverflow
            }
        }
    }
}

/// Sends a quote request to whichever process computes quotes.
///
/// Never fails at the transport level: an unreachable or broken peer is
/// reported as an error envelope so the caller always gets a response.
#[async_trait]
pub trait QuoteChannel: Send + Sync {
    async fn request(&self, request: QuoteRequestEnvelope) -> QuoteResponseEnvelope;

    /// Transport name for logging.
    fn transport_name(&self) -> &'static str;
}

fn de_amount_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_accepts_numeric_amounts() {
        let env: QuoteRequestEnvelope = serde_json::from_value(json!({
            "id": "q-1",
            "tokenIn": "wrap.near",
            "tokenOut": "usdt.tether-token.near",
            "amountIn": 10000,
        }))
        .unwrap();
        assert_eq!(env.amount_in, "10000");
        assert!(env.to_request().is_ok());
    }

    #[test]
    fn request_rejects_unknown_fields() {
        let parsed = serde_json::from_value::<QuoteRequestEnvelope>(json!({
            "id": "q-1",
            "tokenIn": "a.near",
            "tokenOut": "b.near",
            "amountIn": "1",
            "prompt": "please quote",
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn negative_amount_maps_to_illegal_amount() {
        let env: QuoteRequestEnvelope = serde_json::from_value(json!({
            "id": "q-2",
            "tokenIn": "a.near",
            "tokenOut": "b.near",
            "amountIn": -1,
        }))
        .unwrap();
        let rejection = env.to_request().unwrap_err();
        assert_eq!(rejection.kind(), QuoteErrorKind::IllegalAmount);
    }

    #[test]
    fn zero_amount_is_illegal() {
        let env = QuoteRequestEnvelope {
            id: "q-0".into(),
            token_in: "a.near".into(),
            token_out: "b.near".into(),
            amount_in: "0".into(),
        };
        assert_eq!(
            env.to_request().unwrap_err().kind(),
            QuoteErrorKind::IllegalAmount
        );
    }

    #[test]
    fn identical_tokens_are_invalid() {
        let env = QuoteRequestEnvelope {
            id: "q-3".into(),
            token_in: "a.near".into(),
            token_out: "a.near".into(),
            amount_in: "5".into(),
        };
        assert_eq!(
            env.to_request().unwrap_err().kind(),
            QuoteErrorKind::InvalidRequest
        );
    }

    #[test]
    fn response_wire_format() {
        let ok = QuoteResponseEnvelope::Ok {
            id: "q-1".into(),
            amount_out: "19802".into(),
            token_in: "a.near".into(),
            token_out: "b.near".into(),
            amount_in: "10000".into(),
        };
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["amountOut"], "19802");

        let err = QuoteResponseEnvelope::error("q-2", QuoteErrorKind::ReadError, "timeout");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["kind"], "read_error");
        assert_eq!(err.id(), "q-2");
    }
}
