//! Scans a list of contract addresses for duplicate deployed bytecode.
//!
//! Counts come from an Etherscan-compatible API, bytecode from a JSON-RPC
//! node, both rate-limited independently and cached in sled so a re-run only
//! pays for what is missing.

mod cli;
mod config;
mod report;

use std::{
    path::Path,
    time::Duration,
};

use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{
    info,
    warn,
};
use tracing_subscriber::EnvFilter;

use bytescan_core::{
    CodeCache,
    Scanner,
    enrich,
    rpc::EthRpcClient,
    txlist::TxHistoryClient,
};

use crate::{
    cli::Args,
    config::AddressBook,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(args.log_level.into())
                .from_env_lossy(),
        )
        .init();

    let book = match &args.address_book {
        Some(path) => AddressBook::load(path)?,
        None => AddressBook::default(),
    };

    let addresses = load_addresses(&args.address_file)?;
    info!(
        total = addresses.len(),
        file = %args.address_file.display(),
        "loaded address list"
    );

    let db_path = match &args.db_path {
        Some(path) => path.clone(),
        None => directories::ProjectDirs::from("io", "bytescan", "bytescan")
            .context("could not determine a data directory for the cache")?
            .data_dir()
            .join("db"),
    };
    let cache =
        CodeCache::open(&db_path, args.cache_size).context("failed to open bytecode cache")?;
    info!(
        database_size = cache.size_on_disk()?,
        database_path = %db_path.display(),
        "opened cache"
    );

    let scanner = Scanner::new(
        cache.clone(),
        TxHistoryClient::new(&args.tx_api_url, &args.tx_api_key)
            .context("invalid transaction API endpoint")?,
        EthRpcClient::new(&args.rpc_url).context("invalid RPC endpoint")?,
        Duration::from_millis(args.tx_api_interval_ms),
        Duration::from_millis(args.rpc_interval_ms),
        args.tx_eval_count,
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            warn!("error setting up signal handler: {e}");
        } else {
            info!("shutdown signal received, initiating graceful shutdown...");
            signal_cancel.cancel();
        }
    });

    let records = enrich(&scanner, &addresses, &cancel).await;

    // Flushed on every exit path, interrupt included.
    cache.flush().context("failed to flush bytecode cache")?;

    if cancel.is_cancelled() {
        info!("interrupted, cache flushed, skipping report");
        return Ok(());
    }

    let groups = report::duplicate_groups(&records, &book);
    info!(duplicate_groups = groups.len(), "scan complete");
    report::print_report(&groups);

    Ok(())
}

/// Read the newline-delimited address list. Lines are trimmed; blank lines
/// are dropped.
fn load_addresses(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read address list: {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C)
async fn shutdown_signal() -> Result<()> {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .context("failed to install SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        info!("received Ctrl+C");
    }

    Ok(())
}
