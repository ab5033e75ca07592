//! NEAR JSON-RPC and signer relay wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub cause: Option<Value>,
}

impl RpcErrorBody {
    /// One-line description combining the fields NEAR nodes fill in.
    pub fn describe(&self) -> String {
        let mut text = format!("{} ({})", self.message, self.code);
        if let Some(name) = &self.name {
            text.push_str(&format!(" {name}"));
        }
        if let Some(cause) = self.cause.as_ref().and_then(|c| c.get("name")) {
            text.push_str(&format!(": {cause}"));
        } else if let Some(data) = &self.data {
            text.push_str(&format!(": {data}"));
        }
        text
    }
}

/// Result of a `query` with `request_type = call_function`.
///
/// Contract panics come back as a successful RPC response whose `error`
/// field is set.
#[derive(Debug, Deserialize)]
pub struct CallFunctionResult {
    #[serde(default)]
    pub result: Vec<u8>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a `query` with `request_type = view_account`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountView {
    /// Liquid balance in yoctoNEAR as a decimal string.
    pub amount: String,
    #[serde(default)]
    pub locked: String,
    #[serde(default)]
    pub storage_usage: u64,
}

/// Result of the `status` method.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub chain_id: String,
    #[serde(default)]
    pub sync_info: SyncInfo,
    #[serde(default)]
    pub version: Option<NodeVersion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_height: u64,
    #[serde(default)]
    pub syncing: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeVersion {
    #[serde(default)]
    pub version: String,
}

/// Body of `POST {signer_url}/call`.
#[derive(Debug, Serialize)]
pub struct SignerCallRequest<'a> {
    pub signer_id: &'a str,
    pub receiver_id: &'a str,
    pub method_name: &'a str,
    pub args: &'a Value,
    pub gas: u64,
    /// yoctoNEAR as a decimal string; u128 does not fit a JSON number.
    pub deposit: String,
}

#[derive(Debug, Deserialize)]
pub struct SignerCallResponse {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
