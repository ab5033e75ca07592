//! Handler for the `swap` command.
//!
//! Sends the input token to the AMM contract with `ft_transfer_call`; the
//! attached message asks the AMM to swap into the output token with a
//! minimum accepted amount.

use std::sync::Arc;

use alloy_primitives::U256;
use dialoguer::{theme::ColorfulTheme, Confirm};
use serde_json::json;

use crate::adapter::near::RpcLedger;
use crate::app::Config;
use crate::cli::{output, token, SwapArgs};
use crate::domain::{format_units, parse_units, quote_request, SwapQuoteRequest, TokenId};
use crate::error::{ConfigError, Result};
use crate::port::{FunctionCall, Ledger};
use crate::service::ReserveReader;

/// `ft_transfer_call` requires exactly one yoctoNEAR attached.
const ONE_YOCTO: u128 = 1;

pub async fn execute(args: &SwapArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let account = config
        .account
        .user_account_id
        .clone()
        .ok_or(ConfigError::MissingField {
            field: "USER_ACCOUNT_ID",
        })?;
    if args.slippage_bps > 10_000 {
        return Err(ConfigError::InvalidValue {
            field: "slippage_bps",
            reason: "must be at most 10000".into(),
        }
        .into());
    }

    let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::from_config(
        &config.network,
        Some(account.clone()),
    ));

    let meta_in = token::metadata(ledger.as_ref(), &args.token_in).await?;
    let meta_out = token::metadata(ledger.as_ref(), &args.token_out).await?;
    let amount_in = parse_units(&args.amount, meta_in.decimals)?;

    let reader = ReserveReader::new(
        Arc::clone(&ledger),
        config.contracts.pool.clone(),
        config.contracts.balances_method.clone(),
    );
    let request = SwapQuoteRequest {
        token_in: TokenId::new(args.token_in.as_str()),
        token_out: TokenId::new(args.token_out.as_str()),
        amount_in,
    };
    let reserves = reader
        .get_reserves(&request.token_in, &request.token_out)
        .await?;
    let quoted = quote_request(&reserves, &request)?;

    let min_out = match &args.min_out {
        Some(text) => parse_units(text, meta_out.decimals)?,
        None => with_slippage(quoted.amount_out, args.slippage_bps),
    };

    output::section("Swap");
    output::key_value("Account", &account);
    output::key_value(
        "Sell",
        format!("{} {}", format_units(amount_in, meta_in.decimals), meta_in.symbol),
    );
    output::key_value(
        "Expected",
        format!(
            "{} {}",
            format_units(quoted.amount_out, meta_out.decimals),
            meta_out.symbol
        ),
    );
    output::key_value(
        "Minimum",
        format!("{} {}", format_units(min_out, meta_out.decimals), meta_out.symbol),
    );
    println!();

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Swap {} {} for at least {} {}?",
                args.amount,
                meta_in.symbol,
                format_units(min_out, meta_out.decimals),
                meta_out.symbol
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::note("Swap cancelled.");
            return Ok(());
        }
    }

    let msg = json!({
        "Execute": {
            "actions": [{
                "Swap": {
                    "token_out": args.token_out,
                    "min_amount_out": min_out.to_string(),
                }
            }]
        }
    });
    let call = FunctionCall {
        contract: args.token_in.clone(),
        method: "ft_transfer_call".into(),
        args: json!({
            "receiver_id": config.contracts.watched,
            "amount": amount_in.to_string(),
            "msg": msg.to_string(),
        }),
        gas: config.gas.limit(),
        deposit: ONE_YOCTO,
    };

    let pb = output::spinner("Submitting swap transaction");
    match ledger.call(call).await {
        Ok(tx) => {
            output::spinner_success(&pb, "Swap submitted");
            output::key_value("Transaction", output::highlight(&tx));
            output::note("The agent answers the swap request on its next watch tick.");
            Ok(())
        }
        Err(e) => {
            output::spinner_fail(&pb, "Swap failed");
            Err(e.into())
        }
    }
}

/// `amount * (10000 - bps) / 10000`, rounded down.
fn with_slippage(amount: U256, bps: u16) -> U256 {
    let keep = U256::from(10_000u16.saturating_sub(bps));
    amount.saturating_mul(keep) / U256::from(10_000u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_rounds_down() {
        assert_eq!(with_slippage(U256::from(19_802u64), 50), U256::from(19_702u64));
        assert_eq!(with_slippage(U256::from(7u64), 0), U256::from(7u64));
        assert_eq!(with_slippage(U256::from(7u64), 10_000), U256::ZERO);
    }
}
