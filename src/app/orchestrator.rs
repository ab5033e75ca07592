//! The orchestration loop.
//!
//! Two triggers run in their own tasks:
//!
//! - **watch**: poll new events, quote each swap request over the bridge and
//!   submit the response;
//! - **status**: log the loop statistics and refresh the status file.
//!
//! Each trigger awaits its body before taking the next tick, so a trigger
//! never overlaps itself. The cursor lives in the watch task only.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::stats::{LoopStats, SkipReason};
use super::status_file::StatusWriter;
use crate::domain::{
    parse_amount, ChainEvent, CorrelationId, DomainError, PayloadError, SwapRequest, TxHash,
    SWAP_REQUEST_EVENT,
};
use crate::error::WatchError;
use crate::port::{QuoteChannel, QuoteErrorKind, QuoteRequestEnvelope, QuoteResponseEnvelope};
use crate::service::{EventWatcher, ResponseSubmitter};

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Submitted(TxHash),
    /// Quoted but not submitted because dry run is on.
    DryRun(U256),
    Skipped(SkipReason),
    /// Not a swap request.
    Ignored,
}

/// Per-tick tally, mostly for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub events: usize,
    pub submitted: usize,
    pub dry_run: usize,
    pub skipped: usize,
    pub ignored: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: &EventOutcome) {
        self.events += 1;
        match outcome {
            EventOutcome::Submitted(_) => self.submitted += 1,
            EventOutcome::DryRun(_) => self.dry_run += 1,
            EventOutcome::Skipped(_) => self.skipped += 1,
            EventOutcome::Ignored => self.ignored += 1,
        }
    }
}

impl From<QuoteErrorKind> for SkipReason {
    fn from(kind: QuoteErrorKind) -> Self {
        match kind {
            QuoteErrorKind::IllegalAmount => Self::IllegalAmount,
            QuoteErrorKind::ArithmeticOverflow => Self::ArithmeticOverflow,
            QuoteErrorKind::ReadError => Self::ReadError,
            QuoteErrorKind::InvalidRequest => Self::InvalidRequest,
            QuoteErrorKind::Unavailable => Self::Unavailable,
        }
    }
}

/// Correlation ids this process has already submitted a response for.
///
/// Bounded: the oldest ids are forgotten first.
#[derive(Debug)]
struct SubmittedIds {
    order: VecDeque<CorrelationId>,
    seen: HashSet<CorrelationId>,
    capacity: usize,
}

impl SubmittedIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            seen: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    fn contains(&self, id: &CorrelationId) -> bool {
        self.seen.contains(id)
    }

    fn insert(&mut self, id: CorrelationId) {
        if !self.seen.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }
}

pub struct OrchestrationLoop {
    watcher: EventWatcher,
    quotes: Arc<dyn QuoteChannel>,
    submitter: ResponseSubmitter,
    stats: Arc<LoopStats>,
    event_kind: String,
    event_timeout: Duration,
    dry_run: bool,
    submitted: SubmittedIds,
}

impl OrchestrationLoop {
    pub fn new(
        watcher: EventWatcher,
        quotes: Arc<dyn QuoteChannel>,
        submitter: ResponseSubmitter,
        stats: Arc<LoopStats>,
    ) -> Self {
        Self {
            watcher,
            quotes,
            submitter,
            stats,
            event_kind: SWAP_REQUEST_EVENT.to_string(),
            event_timeout: Duration::from_secs(15),
            dry_run: false,
            submitted: SubmittedIds::new(10_000),
        }
    }

    #[must_use]
    pub fn with_event_kind(mut self, kind: impl Into<String>) -> Self {
        self.event_kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.submitted = SubmittedIds::new(capacity);
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<LoopStats> {
        Arc::clone(&self.stats)
    }

    /// One watch tick.
    ///
    /// On [`WatchError`] `cursor` is left untouched so the same range is
    /// polled again next tick. Otherwise it advances past each event as that
    /// event's handling finishes, whatever the outcome, and then to the
    /// batch cursor.
    pub async fn tick(&mut self, cursor: &mut u64) -> Result<TickSummary, WatchError> {
        self.stats.record_watch_tick();

        let batch = match self.watcher.poll_since(*cursor).await {
            Ok(batch) => batch,
            Err(e) => {
                self.stats.record_watch_error(&e);
                warn!(cursor = *cursor, error = %e, "Event poll failed, cursor unchanged");
                return Err(e);
            }
        };

        let mut summary = TickSummary::default();
        for event in &batch.events {
            let outcome = self.handle_event(event).await;
            summary.record(&outcome);
            *cursor = (*cursor).max(event.cursor);
            self.stats.set_cursor(*cursor);
        }
        *cursor = (*cursor).max(batch.cursor);
        self.stats.set_cursor(*cursor);

        if summary.events > 0 {
            info!(
                cursor = *cursor,
                events = summary.events,
                submitted = summary.submitted,
                skipped = summary.skipped,
                ignored = summary.ignored,
                dry_run = summary.dry_run,
                complete = batch.complete,
                "Watch tick finished"
            );
        }
        Ok(summary)
    }

    /// Run the watch trigger forever.
    pub async fn run(mut self, mut cursor: u64, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(cursor, period_ms = period.as_millis() as u64, "Watch loop started");

        loop {
            ticker.tick().await;
            // Errors are logged and counted inside the tick.
            let _ = self.tick(&mut cursor).await;
        }
    }

    async fn handle_event(&mut self, event: &ChainEvent) -> EventOutcome {
        self.stats.record_event();

        if event.kind != self.event_kind {
            self.stats.record_ignored();
            debug!(event_id = %event.id, kind = %event.kind, cursor = event.cursor, "Ignoring event");
            return EventOutcome::Ignored;
        }

        let request = match event.swap_request() {
            Ok(request) => request,
            Err(PayloadError::Amount(e)) => {
                let reason = match e {
                    DomainError::IllegalAmount { .. } => SkipReason::IllegalAmount,
                    DomainError::ArithmeticOverflow { .. } => SkipReason::ArithmeticOverflow,
                };
                return self.skip(event, reason, &e.to_string());
            }
            Err(e) => return self.skip(event, SkipReason::InvalidPayload, &e.to_string()),
        };

        if self.submitted.contains(&request.correlation_id) {
            return self.skip(
                event,
                SkipReason::Duplicate,
                &format!("correlation id {} already answered", request.correlation_id),
            );
        }

        let timeout = self.event_timeout;
        let result = tokio::time::timeout(timeout, self.process(event, &request)).await;
        match result {
            Ok(outcome) => outcome,
            Err(_) => self.skip(
                event,
                SkipReason::Timeout,
                &format!("not finished within {timeout:?}"),
            ),
        }
    }

    async fn process(&mut self, event: &ChainEvent, request: &SwapRequest) -> EventOutcome {
        let envelope = QuoteRequestEnvelope::new(Uuid::new_v4().to_string(), &request.quote);
        let request_id = envelope.id.clone();

        let amount_out = match self.quotes.request(envelope).await {
            QuoteResponseEnvelope::Ok { amount_out, .. } => match parse_amount(&amount_out) {
                Ok(amount) => amount,
                Err(e) => {
                    return self.skip(
                        event,
                        SkipReason::Unavailable,
                        &format!("quote service returned a bad amountOut: {e}"),
                    );
                }
            },
            QuoteResponseEnvelope::Error { kind, message, .. } => {
                return self.skip(event, SkipReason::from(kind), &message);
            }
        };
        self.stats.record_quoted();

        if self.dry_run {
            self.stats.record_dry_run();
            info!(
                event_id = %event.id,
                request_id = %request_id,
                correlation_id = %request.correlation_id,
                token_in = %request.quote.token_in,
                token_out = %request.quote.token_out,
                amount_in = %request.quote.amount_in,
                amount_out = %amount_out,
                "Dry run, response not submitted"
            );
            return EventOutcome::DryRun(amount_out);
        }

        // Recorded before the call: a timed-out submission may still land.
        self.submitted.insert(request.correlation_id.clone());

        match self
            .submitter
            .submit(&event.id, &request.correlation_id, amount_out)
            .await
        {
            Ok(tx) => {
                self.stats.record_submitted();
                EventOutcome::Submitted(tx)
            }
            Err(e) => self.skip(event, SkipReason::SubmitFailed, &e.to_string()),
        }
    }

    fn skip(&self, event: &ChainEvent, reason: SkipReason, message: &str) -> EventOutcome {
        let pair = |field: &str| {
            event
                .payload
                .get(field)
                .and_then(serde_json::Value::as_str)
                .unwrap_or("?")
                .to_string()
        };
        self.stats.record_skip(reason, message);
        warn!(
            event_id = %event.id,
            cursor = event.cursor,
            token_in = %pair("tokenIn"),
            token_out = %pair("tokenOut"),
            kind = reason.as_str(),
            error = %message,
            "Event skipped"
        );
        EventOutcome::Skipped(reason)
    }
}

/// Run the status trigger forever.
pub async fn run_status(stats: Arc<LoopStats>, period: Duration, writer: Option<StatusWriter>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        report_status(&stats, writer.as_ref());
    }
}

/// One status tick: log the snapshot and refresh the status file.
pub fn report_status(stats: &LoopStats, writer: Option<&StatusWriter>) {
    stats.record_status_tick();
    let snapshot = stats.snapshot();

    info!(
        cursor = snapshot.cursor,
        uptime_secs = snapshot.uptime_secs,
        watch_ticks = snapshot.counters.watch_ticks,
        watch_errors = snapshot.counters.watch_errors,
        events = snapshot.counters.events_seen,
        quoted = snapshot.counters.quoted,
        submitted = snapshot.counters.submitted,
        skipped = snapshot.skipped.total(),
        "Status"
    );

    if let Some(writer) = writer {
        if let Err(e) = writer.write(snapshot) {
            error!(path = %writer.path().display(), error = %e, "Failed to write status file");
        }
    }
}
