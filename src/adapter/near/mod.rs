//! NEAR Protocol ledger adapter.

pub mod client;
pub mod dto;

pub use client::RpcLedger;
pub use dto::{AccountView, NodeStatus};
