//! Submits quote responses back to the watched contract.

use std::sync::Arc;

use alloy_primitives::U256;
use serde_json::json;
use tracing::info;

use crate::domain::{CorrelationId, EventId, TxHash};
use crate::error::SubmitError;
use crate::port::{FunctionCall, Ledger};

/// Performs exactly one ledger-mutating call per [`submit`](Self::submit).
///
/// No internal retry: whether a duplicate submission is accepted depends on
/// the contract, so repeating is left to the caller.
pub struct ResponseSubmitter {
    ledger: Arc<dyn Ledger>,
    contract: String,
    method: String,
    gas: u64,
    deposit: u128,
}

impl ResponseSubmitter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        contract: impl Into<String>,
        method: impl Into<String>,
        gas: u64,
        deposit: u128,
    ) -> Self {
        Self {
            ledger,
            contract: contract.into(),
            method: method.into(),
            gas,
            deposit,
        }
    }

    pub async fn submit(
        &self,
        event_id: &EventId,
        correlation_id: &CorrelationId,
        amount_out: U256,
    ) -> Result<TxHash, SubmitError> {
        let call = FunctionCall {
            contract: self.contract.clone(),
            method: self.method.clone(),
            args: json!({
                "correlation_id": correlation_id.as_str(),
                "amount_out": amount_out.to_string(),
            }),
            gas: self.gas,
            deposit: self.deposit,
        };

        let tx = self.ledger.call(call).await?;
        info!(
            event_id = %event_id,
            correlation_id = %correlation_id,
            amount_out = %amount_out,
            tx = %tx,
            "Response submitted"
        );
        Ok(tx)
    }
}
