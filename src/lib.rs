//! amm-quoter - constant-product quote agent for a NEAR AMM.
//!
//! Watches an AMM contract for swap-request events, prices each request
//! against the live pool reserves with the constant-product formula, and
//! submits the quote back to the contract.
//!
//! # Architecture
//!
//! - [`domain`] - Amounts, the quote formula, events and identifiers. Pure.
//! - [`port`] - The [`Ledger`](port::Ledger) and
//!   [`QuoteChannel`](port::QuoteChannel) traits and the bridge envelopes.
//! - [`service`] - Reserve reads, event watching, response submission,
//!   the quote service and bridge transports, read retries.
//! - [`adapter`] - NEAR JSON-RPC implementation of the ledger port.
//! - [`app`] - Configuration, the orchestration loop, statistics, health.
//! - [`cli`] - Operator commands.
//!
//! # Example
//!
//! ```
//! use alloy_primitives::U256;
//! use amm_quoter::domain::quote;
//!
//! let out = quote(U256::from(1_000_000u64), U256::from(2_000_000u64), U256::from(10_000u64));
//! assert_eq!(out.unwrap(), U256::from(19_802u64));
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod port;
pub mod service;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
