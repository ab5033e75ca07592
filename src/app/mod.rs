//! Application layer - configuration, wiring and the orchestration loop.

mod config;
pub mod health;
pub mod orchestrator;
pub mod stats;
pub mod status_file;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub use config::{
    is_valid_account_id, AccountConfig, BridgeConfig, BridgeMode, Config, ContractsConfig,
    GasConfig, HealthConfig, LoggingConfig, NetworkConfig, PollingConfig, RetryConfig, MAX_GAS,
};
pub use health::{HealthServer, HEALTH_READ_TIMEOUT};
pub use orchestrator::{EventOutcome, OrchestrationLoop, TickSummary};
pub use stats::{LoopStats, SkipReason, StatusSnapshot};
pub use status_file::{StatusHeader, StatusWriter};

use crate::adapter::near::RpcLedger;
use crate::error::{Error, Result};
use crate::port::{Ledger, QuoteChannel};
use crate::service::{
    serve_tcp, EventWatcher, LocalBridge, QuoteService, ReserveReader, ResponseSubmitter,
    RetryPolicy, TcpBridge,
};

/// Main application struct.
pub struct App;

impl App {
    /// Run the orchestration loop until one of its tasks stops.
    ///
    /// Everything that can fail at startup (provider probe, missing account,
    /// listener binds) fails here, before any trigger fires.
    pub async fn run(config: Config) -> Result<()> {
        let ledger = Arc::new(RpcLedger::from_config(
            &config.network,
            config.account.agent_account_id.clone(),
        ));
        probe(&ledger, &config).await?;
        if !config.dry_run {
            config.agent_account()?;
        }
        let ledger: Arc<dyn Ledger> = ledger;

        let stats = Arc::new(LoopStats::new(config.polling.start_cursor));
        let retry = RetryPolicy::new(&config.retry);

        let quotes: Arc<dyn QuoteChannel> = match config.bridge.mode {
            BridgeMode::Local => {
                let service = Arc::new(quote_service(&config, Arc::clone(&ledger)));
                let (bridge, _task) = LocalBridge::spawn(
                    service,
                    config.bridge.queue_capacity,
                    config.bridge.timeout(),
                );
                Arc::new(bridge)
            }
            BridgeMode::Tcp => Arc::new(TcpBridge::new(
                config.bridge.address.clone(),
                config.bridge.timeout(),
            )),
        };

        let health = if config.health.enabled {
            let server = HealthServer::bind(&config.health.bind, Arc::clone(&stats))
                .await
                .map_err(|e| Error::Startup(format!("health bind {}: {e}", config.health.bind)))?;
            Some(server.spawn())
        } else {
            None
        };

        let watcher = EventWatcher::new(
            Arc::clone(&ledger),
            config.contracts.watched.clone(),
            config.contracts.events_method.clone(),
        )
        .with_paging(config.polling.page_size, config.polling.max_pages)
        .with_retry(retry);

        let submitter = ResponseSubmitter::new(
            Arc::clone(&ledger),
            config.contracts.watched.clone(),
            config.contracts.response_method.clone(),
            config.gas.limit(),
            config.gas.response_deposit(),
        );

        let orchestrator =
            OrchestrationLoop::new(watcher, Arc::clone(&quotes), submitter, Arc::clone(&stats))
                .with_event_kind(config.contracts.event_kind.clone())
                .with_event_timeout(config.polling.event_timeout())
                .with_dry_run(config.dry_run)
                .with_dedup_capacity(config.polling.dedup_capacity);

        let writer = config.status_file.clone().map(|path| {
            StatusWriter::new(
                path,
                StatusHeader {
                    network: config.network.network_id.clone(),
                    contract: config.contracts.watched.clone(),
                    dry_run: config.dry_run,
                },
            )
        });

        info!(
            network = %config.network.network_id,
            contract = %config.contracts.watched,
            pool = %config.contracts.pool,
            bridge = quotes.transport_name(),
            provider = ledger.provider_name(),
            dry_run = config.dry_run,
            "Quoter started"
        );
        if config.dry_run {
            warn!("Dry run: responses will not be submitted");
        }

        let mut watch = tokio::spawn(
            orchestrator.run(config.polling.start_cursor, config.polling.watch_interval()),
        );
        let mut status = tokio::spawn(orchestrator::run_status(
            Arc::clone(&stats),
            config.polling.status_interval(),
            writer,
        ));

        let stopped = tokio::select! {
            result = &mut watch => ("watch", result),
            result = &mut status => ("status", result),
        };

        watch.abort();
        status.abort();
        if let Some(health) = health {
            health.abort();
        }

        match stopped {
            (task, Err(e)) => {
                error!(task, error = %e, "Trigger task failed");
                Err(Error::Startup(format!("{task} task failed: {e}")))
            }
            (task, Ok(())) => Err(Error::Startup(format!("{task} task stopped"))),
        }
    }

    /// Run only the quote service, answering bridge requests over TCP.
    pub async fn serve_quotes(config: Config) -> Result<()> {
        let ledger = Arc::new(RpcLedger::from_config(&config.network, None));
        probe(&ledger, &config).await?;

        let service = Arc::new(quote_service(&config, ledger));
        let listener = TcpListener::bind(&config.bridge.address)
            .await
            .map_err(|e| Error::Startup(format!("bridge bind {}: {e}", config.bridge.address)))?;

        serve_tcp(service, listener).await;
        Ok(())
    }
}

fn quote_service(config: &Config, ledger: Arc<dyn Ledger>) -> QuoteService {
    QuoteService::new(ReserveReader::new(
        ledger,
        config.contracts.pool.clone(),
        config.contracts.balances_method.clone(),
    ))
    .with_retry(RetryPolicy::new(&config.retry))
}

/// Check the node answers and serves the configured network.
pub async fn probe(ledger: &RpcLedger, config: &Config) -> Result<()> {
    let status = ledger.status().await.map_err(|e| {
        Error::Startup(format!(
            "NEAR node {} unreachable: {e}",
            config.network.rpc_url
        ))
    })?;

    if status.chain_id != config.network.network_id {
        return Err(Error::Startup(format!(
            "node serves {} but network_id is {}",
            status.chain_id, config.network.network_id
        )));
    }

    info!(
        chain_id = %status.chain_id,
        block_height = status.sync_info.latest_block_height,
        syncing = status.sync_info.syncing,
        "NEAR node reachable"
    );
    Ok(())
}
