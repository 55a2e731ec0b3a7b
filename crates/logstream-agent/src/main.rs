#![doc = include_str!("../README.md")]

mod client;
mod config;
mod tail;
mod telemetry;

use anyhow::{Context, bail};
use clap::Parser;
use client::{DirectoryClient, LogClient};
use config::{AgentConfig, CliArgs};
use logstream::Streamer;
use tail::{TailEnd, tail};
use telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run());

    // Tokio reads stdin on a blocking thread that cannot be cancelled; after a
    // signal it may still be parked in `read`, so don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AgentConfig::try_from(args)?;

    init_telemetry(config.json_logs)?;
    log_startup_info(&config);

    let mut streamer = match &config.output_dir {
        Some(dir) => {
            let client = DirectoryClient::create(dir)
                .await
                .with_context(|| format!("failed to create {}", dir.display()))?;
            tracing::info!("Writing chunks to {}", client.root().display());
            Streamer::with_config(client, config.streamer.clone())?
        }
        None => Streamer::with_config(LogClient, config.streamer.clone())?,
    };

    let mut failures = streamer.subscribe_failures()?;
    tokio::spawn(async move {
        while let Some(failure) = failures.recv().await {
            tracing::error!(
                order = failure.order,
                attempts = failure.attempts,
                "Chunk upload failed: {}",
                failure.error
            );
        }
    });

    streamer.start()?;

    let tailed = tail(
        &mut streamer,
        tokio::io::stdin(),
        config.flush_interval,
        shutdown_signal(),
    )
    .await;

    // Drain whatever was queued even if tailing failed.
    tracing::info!("Waiting for the log streaming workers to finish");
    let report = streamer.stop().await?;

    match tailed? {
        TailEnd::Eof => tracing::info!("Input closed"),
        TailEnd::Shutdown => tracing::info!("Shut down before end of input"),
    }

    tracing::info!(
        "Streamed {} bytes in {} chunks ({} uploaded, {} failed)",
        streamer.processed_bytes(),
        streamer.history().len(),
        report.uploaded,
        report.failures.len()
    );

    if !report.is_clean() {
        bail!(
            "{} of {} chunks failed to upload",
            report.failures.len(),
            streamer.history().len()
        );
    }

    Ok(())
}

fn log_startup_info(config: &AgentConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting log streamer with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting log streamer with {} workers and {} byte chunks",
            config.streamer.concurrency,
            config.streamer.max_chunk_size
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
