//! Builders for event payloads and event pages.

use serde_json::{json, Value};

/// JSON for a `run_agent` event as the watched contract reports it.
pub fn swap_event(cursor: u64, amount_in: Value, correlation_id: &str) -> Value {
    json!({
        "id": format!("evt-{cursor}"),
        "type": "run_agent",
        "contract": "amm.iqai.near",
        "cursor": cursor,
        "payload": {
            "tokenIn": "wrap.near",
            "tokenOut": "usdt.tether-token.near",
            "amountIn": amount_in,
            "correlationId": correlation_id,
        },
    })
}

/// JSON for an event of some other kind.
pub fn other_event(cursor: u64, kind: &str) -> Value {
    json!({
        "id": format!("evt-{cursor}"),
        "type": kind,
        "contract": "amm.iqai.near",
        "cursor": cursor,
        "payload": {},
    })
}

/// One page of the events view method.
pub fn page(events: Vec<Value>, next_cursor: Option<u64>, has_more: bool) -> Value {
    json!({
        "events": events,
        "next_cursor": next_cursor,
        "has_more": has_more,
    })
}
