//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`ledger`] - `ScriptedLedger`, a [`Ledger`](crate::port::Ledger) with
//!   scripted view/call results and call recording.
//! - [`domain`] - Builders for events and event pages.

pub mod domain;
pub mod ledger;
