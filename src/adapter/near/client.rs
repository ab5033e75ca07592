//! NEAR ledger client.
//!
//! Reads go to a NEAR JSON-RPC node (`query` / `call_function`). Writes are
//! handed to a signer relay that holds the agent's keys and broadcasts the
//! transaction; this process never sees a private key.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::dto::{
    AccountView, CallFunctionResult, NodeStatus, RpcRequest, RpcResponse, SignerCallRequest,
    SignerCallResponse,
};
use crate::app::NetworkConfig;
use crate::domain::TxHash;
use crate::error::LedgerError;
use crate::port::{FunctionCall, Ledger};

pub struct RpcLedger {
    http: HttpClient,
    rpc_url: String,
    signer_url: String,
    finality: String,
    signer_id: Option<String>,
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Build a client with the configured timeouts.
    ///
    /// `signer_id` is the account the relay signs as; without one, `call`
    /// fails and only reads are available.
    #[must_use]
    pub fn from_config(config: &NetworkConfig, signer_id: Option<String>) -> Self {
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            rpc_url: config.rpc_url.clone(),
            signer_url: config.signer_url.trim_end_matches('/').to_string(),
            finality: config.finality.clone(),
            signer_id,
            next_id: AtomicU64::new(1),
        }
    }

    /// Query node status. Used at startup to check the node is reachable
    /// and serves the expected network.
    pub async fn status(&self) -> Result<NodeStatus, LedgerError> {
        self.rpc("status", json!([])).await
    }

    /// Native NEAR balance and storage of `account_id`.
    pub async fn view_account(&self, account_id: &str) -> Result<AccountView, LedgerError> {
        let params = json!({
            "request_type": "view_account",
            "finality": self.finality,
            "account_id": account_id,
        });
        self.rpc("query", params).await
    }

    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(LedgerError::Transport(format!("node returned {status}")));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(LedgerError::Rpc {
                message: error.describe(),
            });
        }
        body.result
            .ok_or_else(|| LedgerError::Malformed(format!("{method} response has no result")))
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn view(&self, contract: &str, method: &str, args: Value) -> Result<Value, LedgerError> {
        let args = serde_json::to_vec(&args).map_err(|e| LedgerError::Malformed(e.to_string()))?;
        let params = json!({
            "request_type": "call_function",
            "finality": self.finality,
            "account_id": contract,
            "method_name": method,
            "args_base64": BASE64.encode(args),
        });

        let result: CallFunctionResult = self.rpc("query", params).await?;
        if let Some(message) = result.error {
            return Err(LedgerError::Rpc { message });
        }
        for line in &result.logs {
            debug!(contract, method, log = %line, "Contract log");
        }
        if result.result.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&result.result).map_err(|e| {
            LedgerError::Malformed(format!("{contract}.{method} returned non-JSON: {e}"))
        })
    }

    async fn call(&self, call: FunctionCall) -> Result<TxHash, LedgerError> {
        let Some(signer_id) = self.signer_id.as_deref() else {
            return Err(LedgerError::Rpc {
                message: "no signer account configured".into(),
            });
        };

        let body = SignerCallRequest {
            signer_id,
            receiver_id: &call.contract,
            method_name: &call.method,
            args: &call.args,
            gas: call.gas,
            deposit: call.deposit.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/call", self.signer_url))
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(LedgerError::Transport(format!("signer returned {status}")));
        }

        let parsed: SignerCallResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        match (parsed.transaction_hash, parsed.error) {
            (_, Some(message)) => Err(LedgerError::Rpc { message }),
            (Some(hash), None) if status.is_success() => Ok(TxHash::new(hash)),
            _ => Err(LedgerError::Rpc {
                message: format!("signer returned {status} without a transaction hash"),
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "near-rpc"
    }
}

fn map_http_error(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout
    } else {
        LedgerError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    /// Serve one HTTP request with `body`, handing back the request body.
    async fn serve_once(status: u16, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let request_body = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some((head, rest)) = text.split_once("\r\n\r\n") {
                    let length = head
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if rest.len() >= length || n == 0 {
                        break rest.to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };
            let _ = tx.send(request_body);

            let response = format!(
                "HTTP/1.1 {status} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });

        (url, rx)
    }

    fn ledger(url: &str) -> RpcLedger {
        let config = NetworkConfig {
            rpc_url: url.to_string(),
            signer_url: url.to_string(),
            ..NetworkConfig::default()
        };
        RpcLedger::from_config(&config, Some("agent.near".into()))
    }

    #[tokio::test]
    async fn view_decodes_result_bytes() {
        let bytes: Vec<u8> = br#"["1000000","2000000"]"#.to_vec();
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "result": bytes, "logs": [], "block_height": 10 },
        })
        .to_string();
        let (url, request) = serve_once(200, body).await;

        let value = ledger(&url)
            .view("amm-iqai.near", "get_swap_balances", json!({"token_in": "a"}))
            .await
            .unwrap();
        assert_eq!(value, json!(["1000000", "2000000"]));

        let sent: Value = serde_json::from_str(&request.await.unwrap()).unwrap();
        assert_eq!(sent["method"], "query");
        assert_eq!(sent["params"]["request_type"], "call_function");
        assert_eq!(sent["params"]["method_name"], "get_swap_balances");
        let args = BASE64
            .decode(sent["params"]["args_base64"].as_str().unwrap())
            .unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&args).unwrap()["token_in"], "a");
    }

    #[tokio::test]
    async fn contract_error_is_rpc_error() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "error": "wasm execution failed", "logs": [], "block_height": 10 },
        })
        .to_string();
        let (url, _request) = serve_once(200, body).await;

        let err = ledger(&url)
            .view("amm-iqai.near", "get_swap_balances", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { .. }));
    }

    #[tokio::test]
    async fn server_error_is_transport() {
        let (url, _request) = serve_once(503, "{}".into()).await;
        let err = ledger(&url).status().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }

    #[tokio::test]
    async fn call_goes_through_signer_relay() {
        let (url, request) = serve_once(200, json!({"transaction_hash": "abc"}).to_string()).await;

        let tx = ledger(&url)
            .call(FunctionCall {
                contract: "amm.iqai.near".into(),
                method: "agent_response".into(),
                args: json!({"correlation_id": "c-1"}),
                gas: 30_000_000_000_000,
                deposit: 0,
            })
            .await
            .unwrap();
        assert_eq!(tx.as_str(), "abc");

        let sent: Value = serde_json::from_str(&request.await.unwrap()).unwrap();
        assert_eq!(sent["signer_id"], "agent.near");
        assert_eq!(sent["receiver_id"], "amm.iqai.near");
        assert_eq!(sent["deposit"], "0");
    }

    #[tokio::test]
    async fn unreachable_node_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = ledger(&url).status().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
