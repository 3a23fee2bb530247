//! Command dispatch.
//!
//! Wires configuration, signal-driven shutdown, and the long-running
//! services together. All blocking pipeline work runs on the blocking
//! pool so signal handling stays responsive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info};

use super::parser::{Cli, Commands};
use crate::config::{IndexerConfig, PipelineConfig, ServerConfig};
use crate::index::{admin, IndexerService, OsClient};
use crate::pipeline::{log_summary, PipelineRunner};
use crate::query::SearchService;
use crate::server::{run_server, AppState};
use crate::summary::{SummarizerClient, SummaryCoordinator};

/// Executes the parsed command to completion.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Pipeline {
            once,
            raw_dir,
            output_dir,
        } => {
            let mut config = PipelineConfig::from_env();
            if let Some(raw_dir) = raw_dir {
                config.raw_data_dir = raw_dir;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            run_pipeline(config, once).await
        }
        Commands::Indexer => run_indexer(IndexerConfig::from_env()).await,
        Commands::Serve { host, port } => {
            let mut config = ServerConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_query_service(config).await
        }
        Commands::InitIndices => init_indices(IndexerConfig::from_env()).await,
    }
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}

async fn run_pipeline(config: PipelineConfig, once: bool) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.store(true, Ordering::Relaxed);
        });
    }

    let runner = PipelineRunner::new(config, shutdown);
    let result = tokio::task::spawn_blocking(move || {
        if once {
            runner.run_once().map(|summary| {
                log_summary(&summary);
            })
        } else {
            runner.run_continuous()
        }
    })
    .await
    .context("pipeline worker panicked")?;

    result.map_err(Into::into)
}

async fn run_indexer(config: IndexerConfig) -> anyhow::Result<()> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = tx.send(true);
    });

    IndexerService::new(config, rx).run().await?;
    Ok(())
}

async fn run_query_service(config: ServerConfig) -> anyhow::Result<()> {
    let indexer_config = IndexerConfig::from_env();
    let client = OsClient::new(&indexer_config)?;
    if !client.ping().await {
        error!(
            host = %indexer_config.opensearch_host,
            "index store unreachable at startup, searches will fail until it recovers"
        );
    }

    let search = SearchService::new(client, config.cache_capacity, config.max_limit)
        .with_aliases(
            &indexer_config.documents_index_base,
            &indexer_config.chunks_index_base,
        );

    let state = AppState {
        search: Arc::new(search),
        summarizer: Arc::new(SummarizerClient::new(&config.summarizer_url)),
        coordinator: Arc::new(SummaryCoordinator::new()),
        config: Arc::new(config),
    };

    run_server(state, shutdown_signal()).await
}

async fn init_indices(config: IndexerConfig) -> anyhow::Result<()> {
    let client = OsClient::new(&config)?;
    if !client.ping().await {
        anyhow::bail!("index store unreachable at {}", config.opensearch_host);
    }
    admin::initialize(&client, &config).await?;
    info!("index initialization complete");
    Ok(())
}
