//! Services built on the ports: reserve reads, event watching, quoting,
//! response submission and the quote bridge transports.

pub mod bridge;
pub mod quote;
pub mod reserve;
pub mod retry;
pub mod submitter;
pub mod watcher;

pub use bridge::{serve_tcp, LocalBridge, TcpBridge, MAX_REQUEST_LINE};
pub use quote::QuoteService;
pub use reserve::ReserveReader;
pub use retry::{RetryPolicy, RetryState, Transient};
pub use submitter::ResponseSubmitter;
pub use watcher::{EventBatch, EventWatcher};
