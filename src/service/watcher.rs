//! Polls the watched contract for new events.
//!
//! The events view method is paginated: it takes `{from_cursor, limit}` and
//! returns events with a cursor strictly above `from_cursor`, plus the
//! cursor to continue from and whether more pages exist.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::retry::RetryPolicy;
use crate::domain::ChainEvent;
use crate::error::WatchError;
use crate::port::Ledger;

/// New events in ascending cursor order and the cursor they advance to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventBatch {
    pub events: Vec<ChainEvent>,
    /// Highest cursor covered by fully retrieved pages.
    pub cursor: u64,
    /// False when the page limit stopped pagination before the end.
    pub complete: bool,
}

impl EventBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct EventPage {
    #[serde(default)]
    events: Vec<ChainEvent>,
    #[serde(default)]
    next_cursor: Option<u64>,
    #[serde(default)]
    has_more: bool,
}

pub struct EventWatcher {
    ledger: Arc<dyn Ledger>,
    contract: String,
    method: String,
    page_size: u32,
    max_pages: u32,
    retry: RetryPolicy,
}

impl EventWatcher {
    pub fn new(ledger: Arc<dyn Ledger>, contract: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            ledger,
            contract: contract.into(),
            method: method.into(),
            page_size: 50,
            max_pages: 20,
            retry: RetryPolicy::none(),
        }
    }

    #[must_use]
    pub fn with_paging(mut self, page_size: u32, max_pages: u32) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch every event after `cursor`.
    ///
    /// # Errors
    ///
    /// Any page failure returns [`WatchError`]; the events of earlier pages
    /// are discarded so the caller retries the whole range next tick.
    pub async fn poll_since(&self, cursor: u64) -> Result<EventBatch, WatchError> {
        let mut collected: BTreeMap<u64, ChainEvent> = BTreeMap::new();
        let mut from = cursor;
        let mut pages = 0u32;

        let complete = loop {
            let page = self
                .retry
                .run("poll_events", || self.fetch_page(from))
                .await?;
            pages += 1;

            let page_max = page.events.iter().map(|e| e.cursor).max().unwrap_or(from);
            let next = page.next_cursor.unwrap_or(from).max(page_max);
            if next < from {
                return Err(WatchError::Malformed(format!(
                    "page cursor moved backwards from {from} to {next}"
                )));
            }

            for event in page.events {
                if event.cursor <= cursor {
                    continue;
                }
                if collected.contains_key(&event.cursor) {
                    debug!(cursor = event.cursor, "Duplicate event dropped");
                    continue;
                }
                collected.insert(event.cursor, event);
            }

            if !page.has_more {
                from = next;
                break true;
            }
            if next == from {
                return Err(WatchError::Malformed(format!(
                    "page reported more events but did not advance past {from}"
                )));
            }
            from = next;
            if pages >= self.max_pages {
                warn!(
                    pages,
                    cursor = from,
                    "Page limit reached, continuing next tick"
                );
                break false;
            }
        };

        Ok(EventBatch {
            events: collected.into_values().collect(),
            cursor: from.max(cursor),
            complete,
        })
    }

    async fn fetch_page(&self, from: u64) -> Result<EventPage, WatchError> {
        let args = json!({ "from_cursor": from, "limit": self.page_size });
        let value: Value = self.ledger.view(&self.contract, &self.method, args).await?;
        serde_json::from_value(value).map_err(|e| WatchError::Malformed(e.to_string()))
    }
}
