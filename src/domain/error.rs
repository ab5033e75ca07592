//! Domain errors for quote calculation and amount parsing.
//!
//! These are caused by malformed or adversarial input. They are never
//! retried: the orchestration loop logs them and skips the triggering event.
//!
//! # Examples
//!
//! ```
//! use amm_quoter::domain::error::DomainError;
//! use amm_quoter::domain::quote::quote;
//! use alloy_primitives::U256;
//!
//! let result = quote(U256::from(100u64), U256::from(100u64), U256::ZERO);
//! assert!(matches!(result, Err(DomainError::IllegalAmount { .. })));
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Non-positive or unparseable amount, or a degenerate pool.
    #[error("illegal amount: {reason}")]
    IllegalAmount {
        /// What made the amount unusable.
        reason: String,
    },

    /// An intermediate value does not fit in 256 bits.
    #[error("arithmetic overflow while {context}")]
    ArithmeticOverflow {
        /// The step that overflowed.
        context: &'static str,
    },
}

impl DomainError {
    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        Self::IllegalAmount {
            reason: reason.into(),
        }
    }

    /// Stable snake_case name used in logs and bridge envelopes.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IllegalAmount { .. } => "illegal_amount",
            Self::ArithmeticOverflow { .. } => "arithmetic_overflow",
        }
    }
}
