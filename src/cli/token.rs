//! Fungible-token (NEP-141) view helpers shared by the operator commands.

use alloy_primitives::U256;
use serde::Deserialize;
use serde_json::json;

use crate::domain::amount_from_json;
use crate::error::{LedgerError, Result};
use crate::port::Ledger;

/// Decimal places of native NEAR (yoctoNEAR).
pub const NEAR_DECIMALS: u8 = 24;

/// Subset of `ft_metadata` used for display and unit conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct FtMetadata {
    pub symbol: String,
    pub decimals: u8,
}

pub async fn metadata(ledger: &dyn Ledger, token: &str) -> Result<FtMetadata> {
    let value = ledger.view(token, "ft_metadata", json!({})).await?;
    serde_json::from_value(value)
        .map_err(|e| LedgerError::Malformed(format!("{token}.ft_metadata: {e}")).into())
}

pub async fn balance_of(ledger: &dyn Ledger, token: &str, account: &str) -> Result<U256> {
    let value = ledger
        .view(token, "ft_balance_of", json!({ "account_id": account }))
        .await?;
    Ok(amount_from_json(&value)?)
}
