//! Handler for the `run` command.

use tokio::signal;
use tracing::{error, info};

use crate::app::{App, Config};
use crate::cli::RunArgs;
use crate::error::Result;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(cursor) = args.start_cursor {
        config.polling.start_cursor = cursor;
    }

    config.init_logging();
    info!(
        network = %config.network.network_id,
        contract = %config.contracts.watched,
        "amm-quoter starting"
    );

    tokio::select! {
        result = App::run(config) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("amm-quoter stopped");
    Ok(())
}
