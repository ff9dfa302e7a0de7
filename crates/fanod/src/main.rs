//! fanod - Fano canon playback daemon.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use fano_api::ApiState;
use fano_core::chunk::load_manifest;
use fano_core::config::FanoConfig;
use fano_services::{ticker, BroadcastHub, PlaybackEngine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = FanoConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = FanoConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FanoConfig::default()
    });

    let manifest = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.canon.manifest_path.clone());
    tracing::info!(manifest = %manifest.display(), "fanod starting");

    // A missing manifest is not fatal: the canon is just empty.
    let chunks = load_manifest(&manifest).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "canon manifest unavailable, starting empty");
        Vec::new()
    });

    let hub = Arc::new(BroadcastHub::new(config.hub.capacity()));
    let engine = Arc::new(PlaybackEngine::new(
        chunks,
        config.canon.default_speed,
        hub.clone(),
    ));
    tracing::info!(
        chunks = engine.len(),
        max_subscribers = config.hub.max_subscribers,
        queue_depth = config.hub.queue_depth,
        "canon ready"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let mut ticker_task = tokio::spawn(ticker::run(
        engine.clone(),
        Duration::from_millis(config.canon.poll_ms),
        shutdown_tx.subscribe(),
    ));

    let mut api_task = {
        let state = ApiState {
            engine: engine.clone(),
            hub: hub.clone(),
            port: config.network.api_port,
            source_id: config.packet.source_id,
            assets_path: config.canon.assets_path.clone(),
            queue_depth: config.hub.queue_depth,
            shutdown_tx: shutdown_tx.clone(),
        };
        let bind_addr = config.network.bind_addr.clone();
        let port = config.network.api_port;
        tokio::spawn(async move {
            fano_api::serve(state, &bind_addr, port)
                .await
                .context("API server failed")
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = &mut ticker_task   => tracing::error!("timing loop exited: {:?}", r),
        r = &mut api_task      => tracing::error!("API server exited: {:?}", r),
    }

    let _ = shutdown_tx.send(());
    if !ticker_task.is_finished()
        && tokio::time::timeout(Duration::from_secs(2), ticker_task)
            .await
            .is_err()
    {
        tracing::warn!("timing loop did not stop within 2s");
    }
    if !api_task.is_finished()
        && tokio::time::timeout(Duration::from_secs(2), api_task)
            .await
            .is_err()
    {
        tracing::warn!("API server did not stop within 2s");
    }

    Ok(())
}
