//! Command-line interface definitions.

pub mod balances;
pub mod check;
pub mod output;
pub mod quote;
pub mod run;
pub mod serve;
pub mod swap;
pub mod token;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;

/// amm-quoter - constant-product quote agent for a NEAR AMM.
#[derive(Parser, Debug)]
#[command(name = "amm-quoter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the AMM contract and answer swap requests (foreground)
    Run(RunArgs),

    /// Serve quotes to a remote orchestrator over TCP
    ServeQuotes(ServeArgs),

    /// Compute a quote, offline from given reserves or against the live pool
    Quote(QuoteArgs),

    /// Show NEAR and token balances of an account
    Balances(BalancesArgs),

    /// Swap tokens through the AMM contract
    Swap(SwapArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `amm-quoter check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Test the connection to the NEAR node
    Connection(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Quote events but don't submit responses
    #[arg(long)]
    pub dry_run: bool,

    /// Start watching after this event cursor
    #[arg(long)]
    pub start_cursor: Option<u64>,
}

/// Arguments for the `serve-quotes` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override the listen address (host:port)
    #[arg(long)]
    pub address: Option<String>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

/// Arguments for the `quote` subcommand.
///
/// With both reserves given the quote is computed offline; otherwise the
/// reserves are read from the pool contract.
#[derive(Parser, Debug)]
pub struct QuoteArgs {
    /// Path to configuration file (live mode only)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Input amount in base units
    #[arg(long)]
    pub amount_in: String,

    /// Pool reserve of the input token, in base units
    #[arg(long, requires = "reserve_out")]
    pub reserve_in: Option<String>,

    /// Pool reserve of the output token, in base units
    #[arg(long, requires = "reserve_in")]
    pub reserve_out: Option<String>,

    /// Input token contract (live mode)
    #[arg(long, default_value = "wrap.near")]
    pub token_in: String,

    /// Output token contract (live mode)
    #[arg(long, default_value = "usdt.tether-token.near")]
    pub token_out: String,

    /// Print the result as a bridge response envelope
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `balances` subcommand.
#[derive(Parser, Debug)]
pub struct BalancesArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Account to inspect (defaults to USER_ACCOUNT_ID, then AGENT_ACCOUNT_ID)
    #[arg(long)]
    pub account: Option<String>,

    /// Token contracts to list
    #[arg(long, value_delimiter = ',', default_value = "wrap.near,usdt.tether-token.near")]
    pub tokens: Vec<String>,
}

/// Arguments for the `swap` subcommand.
#[derive(Parser, Debug)]
pub struct SwapArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Input token contract
    #[arg(long, default_value = "wrap.near")]
    pub token_in: String,

    /// Output token contract
    #[arg(long, default_value = "usdt.tether-token.near")]
    pub token_out: String,

    /// Amount to swap, in whole tokens (e.g. 0.1)
    #[arg(long)]
    pub amount: String,

    /// Minimum accepted output in whole tokens; derived from the live quote if omitted
    #[arg(long)]
    pub min_out: Option<String>,

    /// Slippage allowance in basis points when deriving the minimum output
    #[arg(long, default_value = "50")]
    pub slippage_bps: u16,

    /// Skip confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

/// Dispatch a parsed command.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::execute(&args).await,
        Commands::ServeQuotes(args) => serve::execute(&args).await,
        Commands::Quote(args) => quote::execute(&args).await,
        Commands::Balances(args) => balances::execute(&args).await,
        Commands::Swap(args) => swap::execute(&args).await,
        Commands::Check(CheckCommand::Config(arg)) => check::execute_config(&arg.config),
        Commands::Check(CheckCommand::Connection(arg)) => {
            check::execute_connection(&arg.config).await
        }
    }
}
