//! Handler for the `quote` command.

use std::sync::Arc;

use crate::adapter::near::RpcLedger;
use crate::app::Config;
use crate::cli::{output, QuoteArgs};
use crate::domain::{parse_amount, quote_request, Reserves, SwapQuoteRequest, TokenId};
use crate::error::Result;
use crate::port::QuoteResponseEnvelope;
use crate::service::ReserveReader;

pub async fn execute(args: &QuoteArgs) -> Result<()> {
    let request = SwapQuoteRequest {
        token_in: TokenId::new(args.token_in.as_str()),
        token_out: TokenId::new(args.token_out.as_str()),
        amount_in: parse_amount(&args.amount_in)?,
    };

    let reserves = match (&args.reserve_in, &args.reserve_out) {
        (Some(reserve_in), Some(reserve_out)) => Reserves {
            token_in: request.token_in.clone(),
            token_out: request.token_out.clone(),
            reserve_in: parse_amount(reserve_in)?,
            reserve_out: parse_amount(reserve_out)?,
        },
        _ => read_live(args, &request).await?,
    };

    let result = quote_request(&reserves, &request)?;

    if args.json {
        let envelope = QuoteResponseEnvelope::quoted("cli", &result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    output::section("Quote");
    output::key_value("Pair", format!("{} -> {}", result.token_in, result.token_out));
    output::key_value("Reserve in", reserves.reserve_in);
    output::key_value("Reserve out", reserves.reserve_out);
    output::key_value("Amount in", result.amount_in);
    output::key_value("Amount out", output::highlight(result.amount_out));
    println!();
    Ok(())
}

async fn read_live(args: &QuoteArgs, request: &SwapQuoteRequest) -> Result<Reserves> {
    let config = Config::load(&args.config)?;
    let ledger = Arc::new(RpcLedger::from_config(&config.network, None));
    let reader = ReserveReader::new(
        ledger,
        config.contracts.pool.clone(),
        config.contracts.balances_method.clone(),
    );

    let pb = output::spinner(&format!("Reading reserves from {}", config.contracts.pool));
    match reader.get_reserves(&request.token_in, &request.token_out).await {
        Ok(reserves) => {
            output::spinner_success(&pb, "Reserves read");
            Ok(reserves)
        }
        Err(e) => {
            output::spinner_fail(&pb, "Reserve read failed");
            Err(e.into())
        }
    }
}
