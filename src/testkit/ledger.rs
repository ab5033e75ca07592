//! Mock [`Ledger`] with scripted results and call recording.
//!
//! Each `view` pops the next scripted result for its method; the last one
//! is sticky so a single scripted value answers every subsequent call.
//! `call` pops from its own queue and defaults to a generated tx hash.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::domain::TxHash;
use crate::error::LedgerError;
use crate::port::{FunctionCall, Ledger};

/// A recorded `view` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    pub contract: String,
    pub method: String,
    pub args: Value,
}

type ViewQueue = VecDeque<Result<Value, LedgerError>>;

pub struct ScriptedLedger {
    views: Mutex<HashMap<String, ViewQueue>>,
    view_delays: HashMap<String, Duration>,
    calls: Mutex<VecDeque<Result<TxHash, LedgerError>>>,
    call_delay: Option<Duration>,
    view_log: Arc<Mutex<Vec<ViewRecord>>>,
    call_log: Arc<Mutex<Vec<FunctionCall>>>,
    call_counter: AtomicU32,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self {
            views: Mutex::new(HashMap::new()),
            view_delays: HashMap::new(),
            calls: Mutex::new(VecDeque::new()),
            call_delay: None,
            view_log: Arc::new(Mutex::new(Vec::new())),
            call_log: Arc::new(Mutex::new(Vec::new())),
            call_counter: AtomicU32::new(0),
        }
    }

    /// Queue a successful result for `method`.
    pub fn with_view(self, method: &str, value: Value) -> Self {
        self.push_view(method, Ok(value));
        self
    }

    /// Queue a failure for `method`.
    pub fn with_view_error(self, method: &str, err: LedgerError) -> Self {
        self.push_view(method, Err(err));
        self
    }

    /// Delay every `view` of `method` by `delay`.
    pub fn with_view_delay(mut self, method: &str, delay: Duration) -> Self {
        self.view_delays.insert(method.to_string(), delay);
        self
    }

    /// Queue the result of the next `call`.
    pub fn with_call_result(self, result: Result<TxHash, LedgerError>) -> Self {
        self.calls.lock().push_back(result);
        self
    }

    /// Delay every `call` by `delay`.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Queue a result for `method` after construction.
    pub fn push_view(&self, method: &str, result: Result<Value, LedgerError>) {
        self.views
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    /// Shared log of `view` invocations, in order.
    pub fn view_log(&self) -> Arc<Mutex<Vec<ViewRecord>>> {
        Arc::clone(&self.view_log)
    }

    /// Shared log of `call` invocations, in order.
    pub fn call_log(&self) -> Arc<Mutex<Vec<FunctionCall>>> {
        Arc::clone(&self.call_log)
    }
}

impl Default for ScriptedLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
    async fn view(&self, contract: &str, method: &str, args: Value) -> Result<Value, LedgerError> {
        self.view_log.lock().push(ViewRecord {
            contract: contract.to_string(),
            method: method.to_string(),
            args,
        });

        if let Some(delay) = self.view_delays.get(method) {
            tokio::time::sleep(*delay).await;
        }

        let mut views = self.views.lock();
        let Some(queue) = views.get_mut(method) else {
            return Err(LedgerError::Rpc {
                message: format!("no scripted result for {method}"),
            });
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Err(LedgerError::Timeout))
        } else {
            queue.front().cloned().unwrap_or(Err(LedgerError::Timeout))
        }
    }

    async fn call(&self, call: FunctionCall) -> Result<TxHash, LedgerError> {
        self.call_log.lock().push(call);

        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }

        let n = self.call_counter.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(TxHash::new(format!("tx-{n}"))))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
