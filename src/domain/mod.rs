//! Exchange-agnostic domain logic: amounts, quotes, and events.

pub mod amount;
pub mod error;
pub mod event;
pub mod id;
pub mod quote;

pub use amount::{amount_from_json, format_units, parse_amount, parse_units};
pub use error::DomainError;
pub use event::{ChainEvent, PayloadError, SwapRequest, SWAP_REQUEST_EVENT};
pub use id::{CorrelationId, EventId, TokenId, TxHash};
pub use quote::{quote, quote_request, Reserves, SwapQuoteRequest, SwapQuoteResult};
