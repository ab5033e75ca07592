//! Handler for the `serve-quotes` command.

use tokio::signal;
use tracing::{error, info};

use crate::app::{App, Config};
use crate::cli::ServeArgs;
use crate::error::Result;

/// Run the quote service alone, for an orchestrator in `tcp` bridge mode.
pub async fn execute(args: &ServeArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(ref address) = args.address {
        config.bridge.address = address.clone();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }

    config.init_logging();
    info!(address = %config.bridge.address, pool = %config.contracts.pool, "Quote service starting");

    tokio::select! {
        result = App::serve_quotes(config) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Quote service stopped");
    Ok(())
}
