//! The quote service: the side of the bridge that computes quotes.

use serde_json::Value;
use tracing::{info, warn};

use super::reserve::ReserveReader;
use super::retry::RetryPolicy;
use crate::domain::quote_request;
use crate::port::{BridgeRejection, QuoteErrorKind, QuoteRequestEnvelope, QuoteResponseEnvelope};

/// Answers bridge envelopes by reading fresh reserves and running the
/// constant-product formula. Every outcome is a response envelope.
pub struct QuoteService {
    reader: ReserveReader,
    retry: RetryPolicy,
}

impl QuoteService {
    #[must_use]
    pub fn new(reader: ReserveReader) -> Self {
        Self {
            reader,
            retry: RetryPolicy::none(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Handle one validated envelope.
    pub async fn handle(&self, envelope: QuoteRequestEnvelope) -> QuoteResponseEnvelope {
        let request = match envelope.to_request() {
            Ok(request) => request,
            Err(rejection) => {
                warn!(
                    request_id = %envelope.id,
                    kind = rejection.kind().as_str(),
                    error = %rejection,
                    "Quote request rejected"
                );
                let kind = rejection.kind();
                return QuoteResponseEnvelope::error(envelope.id, kind, rejection.to_string());
            }
        };

        let reserves = match self
            .retry
            .run("read_reserves", || {
                self.reader.get_reserves(&request.token_in, &request.token_out)
            })
            .await
        {
            Ok(reserves) => reserves,
            Err(err) => {
                warn!(
                    request_id = %envelope.id,
                    token_in = %request.token_in,
                    token_out = %request.token_out,
                    error = %err,
                    "Reserve read failed"
                );
                return QuoteResponseEnvelope::error(
                    envelope.id,
                    QuoteErrorKind::ReadError,
                    err.to_string(),
                );
            }
        };

        match quote_request(&reserves, &request) {
            Ok(result) => {
                info!(
                    request_id = %envelope.id,
                    token_in = %result.token_in,
                    token_out = %result.token_out,
                    amount_in = %result.amount_in,
                    amount_out = %result.amount_out,
                    "Quote computed"
                );
                QuoteResponseEnvelope::quoted(envelope.id, &result)
            }
            Err(err) => {
                warn!(
                    request_id = %envelope.id,
                    token_in = %request.token_in,
                    token_out = %request.token_out,
                    kind = err.kind(),
                    error = %err,
                    "Quote failed"
                );
                let kind = BridgeRejection::from(err.clone()).kind();
                QuoteResponseEnvelope::error(envelope.id, kind, err.to_string())
            }
        }
    }

    /// Handle an untyped message, rejecting anything that does not match
    /// the request schema before it reaches the quote engine.
    pub async fn handle_raw(&self, raw: &str) -> QuoteResponseEnvelope {
        match serde_json::from_str::<QuoteRequestEnvelope>(raw) {
            Ok(envelope) => self.handle(envelope).await,
            Err(err) => {
                let id = serde_json::from_str::<Value>(raw)
                    .ok()
                    .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_default();
                warn!(request_id = %id, error = %err, "Malformed quote request");
                QuoteResponseEnvelope::error(id, QuoteErrorKind::InvalidRequest, err.to_string())
            }
        }
    }
}
