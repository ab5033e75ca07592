//! Constant-product quote calculation.
//!
//! The pool holds `reserve_in * reserve_out = k`. Selling `amount_in` moves
//! the input reserve to `reserve_in + amount_in`; the output reserve becomes
//! `floor(k / new_in)` and the difference is paid out. Flooring the new
//! output reserve rounds in the pool's favour, so
//! `new_in * new_out <= k` always holds.
//!
//! Integer arithmetic only, on 256-bit values with checked multiplication.

use alloy_primitives::U256;

use super::error::DomainError;
use super::id::TokenId;

/// Snapshot of a pool's two reserves for one trading direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserves {
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub reserve_in: U256,
    pub reserve_out: U256,
}

/// A request to price a swap of `amount_in` base units of `token_in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuoteRequest {
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: U256,
}

/// A computed quote. Produced once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuoteResult {
    pub amount_out: U256,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: U256,
}

/// Compute the output amount for selling `amount_in` into the pool.
///
/// # Errors
///
/// - [`DomainError::IllegalAmount`] when `amount_in` is zero, either reserve
///   is zero, or the trade would take the entire output reserve.
/// - [`DomainError::ArithmeticOverflow`] when `reserve_in * reserve_out` or
///   `reserve_in + amount_in` does not fit in 256 bits.
pub fn quote(reserve_in: U256, reserve_out: U256, amount_in: U256) -> Result<U256, DomainError> {
    if amount_in.is_zero() {
        return Err(DomainError::illegal("amount in must be positive"));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(DomainError::illegal("pool reserves must be positive"));
    }

    let k = reserve_in
        .checked_mul(reserve_out)
        .ok_or(DomainError::ArithmeticOverflow {
            context: "computing the pool invariant",
        })?;
    let new_reserve_in =
        reserve_in
            .checked_add(amount_in)
            .ok_or(DomainError::ArithmeticOverflow {
                context: "adding the input amount to the reserve",
            })?;

    // new_reserve_in > reserve_in, so new_reserve_out <= reserve_out.
    let new_reserve_out = k / new_reserve_in;
    if new_reserve_out.is_zero() {
        return Err(DomainError::illegal("swap would drain the output reserve"));
    }

    Ok(reserve_out - new_reserve_out)
}

/// Price `request` against `reserves`.
pub fn quote_request(
    reserves: &Reserves,
    request: &SwapQuoteRequest,
) -> Result<SwapQuoteResult, DomainError> {
    let amount_out = quote(reserves.reserve_in, reserves.reserve_out, request.amount_in)?;
    Ok(SwapQuoteResult {
        amount_out,
        token_in: request.token_in.clone(),
        token_out: request.token_out.clone(),
        amount_in: request.amount_in,
    })
}
