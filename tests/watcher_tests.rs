use std::sync::Arc;

use amm_quoter::error::{LedgerError, WatchError};
use amm_quoter::service::EventWatcher;
use amm_quoter::testkit::domain::{other_event, page, swap_event};
use amm_quoter::testkit::ledger::ScriptedLedger;
use serde_json::json;

fn watcher(ledger: ScriptedLedger) -> EventWatcher {
    EventWatcher::new(Arc::new(ledger), "amm.iqai.near", "get_events").with_paging(2, 10)
}

#[tokio::test]
async fn events_strictly_increase_across_polls() {
    // The provider re-sends the boundary event of each page.
    let ledger = ScriptedLedger::new()
        .with_view(
            "get_events",
            page(vec![swap_event(1, json!("1"), "a"), swap_event(2, json!("1"), "b")], Some(2), true),
        )
        .with_view(
            "get_events",
            page(vec![swap_event(2, json!("1"), "b"), swap_event(3, json!("1"), "c")], Some(3), false),
        )
        .with_view(
            "get_events",
            page(vec![swap_event(3, json!("1"), "c"), other_event(4, "deposit")], Some(4), false),
        );
    let watcher = watcher(ledger);

    let first = watcher.poll_since(0).await.unwrap();
    let cursors: Vec<u64> = first.events.iter().map(|e| e.cursor).collect();
    assert_eq!(cursors, vec![1, 2, 3]);
    assert_eq!(first.cursor, 3);

    let second = watcher.poll_since(first.cursor).await.unwrap();
    let cursors: Vec<u64> = second.events.iter().map(|e| e.cursor).collect();
    assert_eq!(cursors, vec![4]);
    assert_eq!(second.cursor, 4);

    // Nothing new: the last page is sticky and only holds old events.
    let third = watcher.poll_since(second.cursor).await.unwrap();
    assert!(third.is_empty());
    assert_eq!(third.cursor, 4);
}

#[tokio::test]
async fn provider_failure_is_a_watch_error() {
    let ledger = ScriptedLedger::new().with_view_error("get_events", LedgerError::Timeout);
    let result = watcher(ledger).poll_since(9).await;
    assert!(matches!(result, Err(WatchError::Ledger(LedgerError::Timeout))));
}

#[tokio::test]
async fn page_that_is_not_an_event_list_is_malformed() {
    let ledger = ScriptedLedger::new().with_view("get_events", json!({ "events": "nope" }));
    let result = watcher(ledger).poll_since(0).await;
    assert!(matches!(result, Err(WatchError::Malformed(_))));
}

#[tokio::test]
async fn query_carries_cursor_and_limit() {
    let ledger = ScriptedLedger::new().with_view("get_events", page(vec![], None, false));
    let log = ledger.view_log();

    watcher(ledger).poll_since(42).await.unwrap();

    let log = log.lock();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].contract, "amm.iqai.near");
    assert_eq!(log[0].args, json!({ "from_cursor": 42, "limit": 2 }));
}
