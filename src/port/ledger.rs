//! Ledger port for contract reads and writes.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::TxHash;
use crate::error::LedgerError;

/// A state-changing contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Contract that receives the call.
    pub contract: String,
    /// Method name on the contract.
    pub method: String,
    /// JSON arguments.
    pub args: Value,
    /// Gas attached to the call.
    pub gas: u64,
    /// Deposit attached to the call, in the chain's smallest unit.
    pub deposit: u128,
}

/// Chain provider used by every ledger-facing component.
///
/// Implementations convert every failure into a [`LedgerError`]; callers
/// further map those into read, watch or submit errors.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Call a read-only contract method and return its JSON result.
    async fn view(&self, contract: &str, method: &str, args: Value) -> Result<Value, LedgerError>;

    /// Submit one state-changing call. Never retried by the implementation.
    async fn call(&self, call: FunctionCall) -> Result<TxHash, LedgerError>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}
