//! Handler for the `balances` command.

use std::sync::Arc;

use tabled::{Table, Tabled};

use crate::adapter::near::RpcLedger;
use crate::app::Config;
use crate::cli::token::{self, NEAR_DECIMALS};
use crate::cli::{output, BalancesArgs};
use crate::domain::{format_units, parse_amount};
use crate::error::{ConfigError, Result};
use crate::port::Ledger;

#[derive(Tabled)]
struct BalanceRow {
    #[tabled(rename = "Token")]
    symbol: String,
    #[tabled(rename = "Contract")]
    contract: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Base units")]
    raw: String,
}

pub async fn execute(args: &BalancesArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let account = args
        .account
        .clone()
        .or_else(|| config.account.user_account_id.clone())
        .or_else(|| config.account.agent_account_id.clone())
        .ok_or(ConfigError::MissingField {
            field: "USER_ACCOUNT_ID",
        })?;

    let ledger = Arc::new(RpcLedger::from_config(&config.network, None));
    let pb = output::spinner("Fetching account balances");

    let mut rows = Vec::with_capacity(args.tokens.len() + 1);
    let mut failures = 0usize;

    match ledger.view_account(&account).await {
        Ok(view) => {
            let raw = parse_amount(&view.amount)?;
            rows.push(BalanceRow {
                symbol: "NEAR".into(),
                contract: "(native)".into(),
                balance: format_units(raw, NEAR_DECIMALS),
                raw: raw.to_string(),
            });
        }
        Err(e) => {
            failures += 1;
            rows.push(unavailable("NEAR", "(native)", &e.to_string()));
        }
    }

    for contract in &args.tokens {
        match token_row(ledger.as_ref(), contract, &account).await {
            Ok(row) => rows.push(row),
            Err(e) => {
                failures += 1;
                rows.push(unavailable("?", contract, &e.to_string()));
            }
        }
    }

    if failures == 0 {
        output::spinner_success(&pb, "Balances fetched");
    } else {
        output::spinner_fail(&pb, &format!("{failures} balance(s) unavailable"));
    }

    output::section(&format!("Balances of {account}"));
    let table = Table::new(rows).to_string();
    for line in table.lines() {
        println!("  {line}");
    }
    println!();

    Ok(())
}

async fn token_row(ledger: &dyn Ledger, contract: &str, account: &str) -> Result<BalanceRow> {
    let metadata = token::metadata(ledger, contract).await?;
    let raw = token::balance_of(ledger, contract, account).await?;
    Ok(BalanceRow {
        symbol: metadata.symbol,
        contract: contract.to_string(),
        balance: format_units(raw, metadata.decimals),
        raw: raw.to_string(),
    })
}

fn unavailable(symbol: &str, contract: &str, reason: &str) -> BalanceRow {
    output::warn(&format!("{contract}: {reason}"));
    BalanceRow {
        symbol: symbol.to_string(),
        contract: contract.to_string(),
        balance: "unavailable".into(),
        raw: "-".into(),
    }
}
