//! Configuration and connection validation commands.

use std::path::Path;

use crate::adapter::near::RpcLedger;
use crate::app::{probe, BridgeMode, Config};
use crate::cli::output;
use crate::error::Result;

/// Validate configuration file without starting the loop.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::note(&format!("Checking configuration: {}", path.display()));

    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("Configuration error: {e}"));
            return Err(e);
        }
    };

    output::ok("Configuration file is valid");
    output::section("Summary");
    output::key_value("Network", &config.network.network_id);
    output::key_value("RPC", &config.network.rpc_url);
    output::key_value("Watched", &config.contracts.watched);
    output::key_value("Pool", &config.contracts.pool);
    output::key_value("Gas limit", config.gas.limit());
    output::key_value(
        "Intervals",
        format!(
            "watch {}ms, status {}ms",
            config.polling.watch_interval_ms, config.polling.status_interval_ms
        ),
    );
    output::key_value(
        "Bridge",
        match config.bridge.mode {
            BridgeMode::Local => "local".to_string(),
            BridgeMode::Tcp => format!("tcp {}", config.bridge.address),
        },
    );
    output::key_value("Dry-run", config.dry_run);
    println!();

    match &config.account.agent_account_id {
        Some(account) => output::ok(&format!("Agent account: {account}")),
        None if config.dry_run => output::warn("No AGENT_ACCOUNT_ID set (fine for dry run)"),
        None => output::warn("No AGENT_ACCOUNT_ID set; `run` will refuse to start"),
    }
    match &config.account.user_account_id {
        Some(account) => output::ok(&format!("User account: {account}")),
        None => output::note("USER_ACCOUNT_ID not set; `swap` is unavailable"),
    }

    println!();
    output::note("Configuration is ready to use.");
    Ok(())
}

/// Check the NEAR node is reachable and serves the configured network.
pub async fn execute_connection<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    output::note(&format!(
        "Testing connection to {} ({})",
        config.network.rpc_url, config.network.network_id
    ));

    let ledger = RpcLedger::from_config(&config.network, None);
    let pb = output::spinner("Querying node status");
    match probe(&ledger, &config).await {
        Ok(()) => {
            output::spinner_success(&pb, "Node reachable");
            Ok(())
        }
        Err(e) => {
            output::spinner_fail(&pb, &e.to_string());
            Err(e)
        }
    }
}
