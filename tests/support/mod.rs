#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use amm_quoter::app::{LoopStats, OrchestrationLoop};
use amm_quoter::port::{Ledger, QuoteChannel};
use amm_quoter::service::{
    EventWatcher, LocalBridge, QuoteService, ReserveReader, ResponseSubmitter,
};
use amm_quoter::testkit::ledger::ScriptedLedger;

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const WATCHED: &str = "amm.iqai.near";
pub const POOL: &str = "amm-iqai.near";
pub const EVENTS: &str = "get_events";
pub const BALANCES: &str = "get_swap_balances";
pub const RESPONSE: &str = "agent_response";

pub fn write_temp_config(contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let suffix = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.push(format!("amm-quoter-test-{nanos}-{suffix}.toml"));
    fs::write(&path, contents).expect("write temp config");
    path
}

pub fn quote_service(ledger: Arc<dyn Ledger>) -> Arc<QuoteService> {
    Arc::new(QuoteService::new(ReserveReader::new(ledger, POOL, BALANCES)))
}

/// A loop wired to `ledger` with an in-process bridge.
pub fn orchestrator(ledger: Arc<ScriptedLedger>) -> OrchestrationLoop {
    let ledger: Arc<dyn Ledger> = ledger;
    let (bridge, _task) =
        LocalBridge::spawn(quote_service(Arc::clone(&ledger)), 8, Duration::from_secs(5));
    let quotes: Arc<dyn QuoteChannel> = Arc::new(bridge);

    OrchestrationLoop::new(
        EventWatcher::new(Arc::clone(&ledger), WATCHED, EVENTS).with_paging(10, 5),
        quotes,
        ResponseSubmitter::new(ledger, WATCHED, RESPONSE, 30_000_000_000_000, 0),
        Arc::new(LoopStats::new(0)),
    )
}
