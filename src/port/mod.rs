//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!        ┌──────────────────────────────┐
//!        │  Orchestration + services    │
//!        └──────┬─────────────────┬─────┘
//!               ▼                 ▼
//!         ┌──────────┐     ┌──────────────┐
//!         │  Ledger  │     │ QuoteChannel │
//!         └──────────┘     └──────────────┘
//!          RpcLedger        LocalBridge / TcpBridge
//! ```
//!
//! - [`Ledger`] - read and write calls against the chain provider
//! - [`QuoteChannel`] - request/response bridge to the quote service

mod bridge;
mod ledger;

pub use bridge::{
    BridgeRejection, QuoteChannel, QuoteErrorKind, QuoteRequestEnvelope, QuoteResponseEnvelope,
};
pub use ledger::{FunctionCall, Ledger};
