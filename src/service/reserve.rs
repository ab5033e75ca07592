//! Reads pool reserves for a trading pair.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{parse_amount, Reserves, TokenId};
use crate::error::ReadError;
use crate::port::Ledger;

/// Fetches `(reserve_in, reserve_out)` from the pool contract.
///
/// Every call goes to the ledger; reserves are never cached because a stale
/// snapshot prices the swap against the wrong pool state.
pub struct ReserveReader {
    ledger: Arc<dyn Ledger>,
    contract: String,
    method: String,
}

impl ReserveReader {
    pub fn new(ledger: Arc<dyn Ledger>, contract: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            ledger,
            contract: contract.into(),
            method: method.into(),
        }
    }

    /// Read the current reserves for `token_in -> token_out`.
    ///
    /// # Errors
    ///
    /// Provider failures, a `null` result, and anything other than a pair of
    /// decimal strings are reported as [`ReadError`]; zero is never
    /// substituted.
    pub async fn get_reserves(
        &self,
        token_in: &TokenId,
        token_out: &TokenId,
    ) -> Result<Reserves, ReadError> {
        let args = json!({
            "token_in": token_in.as_str(),
            "token_out": token_out.as_str(),
        });
        let value = self.ledger.view(&self.contract, &self.method, args).await?;
        let reserves = self.decode(token_in, token_out, &value)?;

        debug!(
            token_in = %token_in,
            token_out = %token_out,
            reserve_in = %reserves.reserve_in,
            reserve_out = %reserves.reserve_out,
            "Reserves read"
        );
        Ok(reserves)
    }

    fn decode(
        &self,
        token_in: &TokenId,
        token_out: &TokenId,
        value: &Value,
    ) -> Result<Reserves, ReadError> {
        let malformed = |reason: String| ReadError::Malformed {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            reason,
        };

        if value.is_null() {
            return Err(ReadError::UnknownPair {
                token_in: token_in.to_string(),
                token_out: token_out.to_string(),
            });
        }
        let pair = value
            .as_array()
            .filter(|items| items.len() == 2)
            .ok_or_else(|| malformed(format!("expected a two-element array, got {value}")))?;

        let side = |item: &Value| -> Result<_, ReadError> {
            let text = item
                .as_str()
                .ok_or_else(|| malformed(format!("expected a decimal string, got {item}")))?;
            parse_amount(text).map_err(|e| malformed(e.to_string()))
        };

        Ok(Reserves {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            reserve_in: side(&pair[0])?,
            reserve_out: side(&pair[1])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::error::LedgerError;
    use crate::testkit::ledger::ScriptedLedger;

    fn reader(ledger: ScriptedLedger) -> ReserveReader {
        ReserveReader::new(Arc::new(ledger), "amm-iqai.near", "get_swap_balances")
    }

    #[tokio::test]
    async fn reads_string_pair() {
        let ledger = ScriptedLedger::new().with_view("get_swap_balances", json!(["1000000", "2000000"]));
        let calls = ledger.view_log();
        let reserves = reader(ledger)
            .get_reserves(&TokenId::from("a.near"), &TokenId::from("b.near"))
            .await
            .unwrap();

        assert_eq!(reserves.reserve_in, U256::from(1_000_000u64));
        assert_eq!(reserves.reserve_out, U256::from(2_000_000u64));

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].contract, "amm-iqai.near");
        assert_eq!(calls[0].args["token_in"], "a.near");
    }

    #[tokio::test]
    async fn provider_failure_is_not_zero() {
        let ledger = ScriptedLedger::new().with_view_error("get_swap_balances", LedgerError::Timeout);
        let result = reader(ledger)
            .get_reserves(&TokenId::from("a.near"), &TokenId::from("b.near"))
            .await;

        assert_eq!(result, Err(ReadError::Ledger(LedgerError::Timeout)));
    }

    #[tokio::test]
    async fn malformed_payloads_are_rejected() {
        for bad in [json!(["1"]), json!([1, 2]), json!(["x", "2"]), json!({"a": 1})] {
            let ledger = ScriptedLedger::new().with_view("get_swap_balances", bad.clone());
            let result = reader(ledger)
                .get_reserves(&TokenId::from("a.near"), &TokenId::from("b.near"))
                .await;
            assert!(
                matches!(result, Err(ReadError::Malformed { .. })),
                "expected malformed for {bad}, got {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn null_means_unknown_pair() {
        let ledger = ScriptedLedger::new().with_view("get_swap_balances", Value::Null);
        let result = reader(ledger)
            .get_reserves(&TokenId::from("a.near"), &TokenId::from("z.near"))
            .await;
        assert!(matches!(result, Err(ReadError::UnknownPair { .. })));
    }
}
