//! Loop statistics shared between the watch task, the status task and the
//! health server.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Why an event was skipped. Used for counters and the `kind` log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidPayload,
    IllegalAmount,
    ArithmeticOverflow,
    ReadError,
    InvalidRequest,
    Unavailable,
    SubmitFailed,
    Timeout,
    Duplicate,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::IllegalAmount => "illegal_amount",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::ReadError => "read_error",
            Self::InvalidRequest => "invalid_request",
            Self::Unavailable => "unavailable",
            Self::SubmitFailed => "submit_failed",
            Self::Timeout => "timeout",
            Self::Duplicate => "duplicate",
        }
    }
}

#[derive(Debug)]
pub struct LoopStats {
    started_at: DateTime<Utc>,
    watch_ticks: AtomicU64,
    status_ticks: AtomicU64,
    watch_errors: AtomicU64,
    events_seen: AtomicU64,
    events_ignored: AtomicU64,
    quoted: AtomicU64,
    submitted: AtomicU64,
    dry_run: AtomicU64,
    skipped_invalid: AtomicU64,
    skipped_domain: AtomicU64,
    skipped_read: AtomicU64,
    skipped_unavailable: AtomicU64,
    skipped_submit: AtomicU64,
    skipped_timeout: AtomicU64,
    skipped_duplicate: AtomicU64,
    cursor: AtomicU64,
    last_tick_at: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

impl LoopStats {
    #[must_use]
    pub fn new(start_cursor: u64) -> Self {
        Self {
            started_at: Utc::now(),
            watch_ticks: AtomicU64::new(0),
            status_ticks: AtomicU64::new(0),
            watch_errors: AtomicU64::new(0),
            events_seen: AtomicU64::new(0),
            events_ignored: AtomicU64::new(0),
            quoted: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            dry_run: AtomicU64::new(0),
            skipped_invalid: AtomicU64::new(0),
            skipped_domain: AtomicU64::new(0),
            skipped_read: AtomicU64::new(0),
            skipped_unavailable: AtomicU64::new(0),
            skipped_submit: AtomicU64::new(0),
            skipped_timeout: AtomicU64::new(0),
            skipped_duplicate: AtomicU64::new(0),
            cursor: AtomicU64::new(start_cursor),
            last_tick_at: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    pub fn record_watch_tick(&self) {
        self.watch_ticks.fetch_add(1, Ordering::Relaxed);
        *self.last_tick_at.lock() = Some(Utc::now());
    }

    pub fn record_status_tick(&self) {
        self.status_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_watch_error(&self, error: &impl ToString) {
        self.watch_errors.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(error.to_string());
    }

    pub fn record_event(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quoted(&self) {
        self.quoted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dry_run(&self) {
        self.dry_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self, reason: SkipReason, message: &str) {
        let counter = match reason {
            SkipReason::InvalidPayload | SkipReason::InvalidRequest => &self.skipped_invalid,
            SkipReason::IllegalAmount | SkipReason::ArithmeticOverflow => &self.skipped_domain,
            SkipReason::ReadError => &self.skipped_read,
            SkipReason::Unavailable => &self.skipped_unavailable,
            SkipReason::SubmitFailed => &self.skipped_submit,
            SkipReason::Timeout => &self.skipped_timeout,
            SkipReason::Duplicate => &self.skipped_duplicate,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if reason != SkipReason::Duplicate {
            *self.last_error.lock() = Some(format!("{}: {message}", reason.as_str()));
        }
    }

    /// Only moves forward.
    pub fn set_cursor(&self, cursor: u64) {
        self.cursor.fetch_max(cursor, Ordering::Relaxed);
    }

    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let now = Utc::now();
        StatusSnapshot {
            started_at: self.started_at,
            uptime_secs: (now - self.started_at).num_seconds().max(0) as u64,
            cursor: self.cursor(),
            last_tick_at: *self.last_tick_at.lock(),
            counters: Counters {
                watch_ticks: load(&self.watch_ticks),
                status_ticks: load(&self.status_ticks),
                watch_errors: load(&self.watch_errors),
                events_seen: load(&self.events_seen),
                events_ignored: load(&self.events_ignored),
                quoted: load(&self.quoted),
                submitted: load(&self.submitted),
                dry_run: load(&self.dry_run),
            },
            skipped: Skipped {
                invalid: load(&self.skipped_invalid),
                domain: load(&self.skipped_domain),
                read: load(&self.skipped_read),
                unavailable: load(&self.skipped_unavailable),
                submit: load(&self.skipped_submit),
                timeout: load(&self.skipped_timeout),
                duplicate: load(&self.skipped_duplicate),
            },
            last_error: self.last_error.lock().clone(),
            updated_at: now,
        }
    }
}

/// Point-in-time view of [`LoopStats`], served on `/status` and written to
/// the status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub cursor: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub counters: Counters,
    pub skipped: Skipped,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub watch_ticks: u64,
    pub status_ticks: u64,
    pub watch_errors: u64,
    pub events_seen: u64,
    pub events_ignored: u64,
    pub quoted: u64,
    pub submitted: u64,
    pub dry_run: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub invalid: u64,
    pub domain: u64,
    pub read: u64,
    pub unavailable: u64,
    pub submit: u64,
    pub timeout: u64,
    pub duplicate: u64,
}

impl Skipped {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.invalid
            + self.domain
            + self.read
            + self.unavailable
            + self.submit
            + self.timeout
            + self.duplicate
    }
}
