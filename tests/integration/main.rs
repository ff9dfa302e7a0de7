//! Fano integration test harness.
//!
//! Every test starts its own in-process API on an ephemeral loopback port
//! and drives it over HTTP, the same way fano-ctl and the web client do.
//! No timing loop runs unless a test asks for one, so positions only move
//! when a test moves them.
//!
//!   cargo test --test integration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use fano_api::ApiState;
use fano_core::chunk::parse_manifest;
use fano_services::{BroadcastHub, PlaybackEngine};

mod inspect;
mod streams;

// ── Harness ───────────────────────────────────────────────────────────────────

/// The three-chunk canon used throughout.
pub const CANON: &str = r#"{"matrix":[0,1,2,3,0,1,2],"angle":0,"path":"m/0'"}
{"matrix":[3,2,1,0,3,2,1],"angle":120,"path":"m/1'"}
{"matrix":[1,1,1,1,1,1,1],"angle":240,"path":"m/2'"}
"#;

pub struct TestServer {
    pub base: String,
    pub engine: Arc<PlaybackEngine>,
    pub hub: Arc<BroadcastHub>,
    pub shutdown_tx: broadcast::Sender<()>,
    /// Per-server asset list path. Nothing is written there unless a test does.
    pub assets_path: PathBuf,
    client: reqwest::Client,
    server: tokio::task::JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start(manifest: &str, max_subscribers: Option<usize>) -> Result<Self> {
        let chunks = parse_manifest(manifest, 1_000).context("test manifest must parse")?;
        let hub = Arc::new(BroadcastHub::new(max_subscribers));
        let engine = Arc::new(PlaybackEngine::new(chunks, 1.0, hub.clone()));
        let (shutdown_tx, _) = broadcast::channel(1);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let assets_path = std::env::temp_dir().join(format!("fano-assets-{port}.ndjson"));
        let state = ApiState {
            engine: engine.clone(),
            hub: hub.clone(),
            port,
            source_id: 7,
            assets_path: assets_path.clone(),
            queue_depth: 32,
            shutdown_tx: shutdown_tx.clone(),
        };
        let server = tokio::spawn(fano_api::serve_on(listener, state));

        Ok(Self {
            base: format!("http://127.0.0.1:{port}/api"),
            engine,
            hub,
            shutdown_tx,
            assets_path,
            client: reqwest::Client::new(),
            server,
        })
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(format!("{}{}", self.base, path)).send().await?)
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<reqwest::Response> {
        let mut req = self.client.post(format!("{}{}", self.base, path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        Ok(req.send().await?)
    }

    /// GET that must succeed, parsed as JSON.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let resp = self.get(path).await?;
        if !resp.status().is_success() {
            bail!("GET {path} returned {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn status(&self) -> Result<Value> {
        self.get_json("/canon").await
    }

    pub async fn stop(self) {
        let _ = std::fs::remove_file(&self.assets_path);
        let _ = self.shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(2), self.server).await;
    }
}

/// Poll until `check` holds or the deadline passes.
pub async fn eventually<F: Fn() -> bool>(what: &str, check: F) -> Result<()> {
    for _ in 0..100 {
        if check() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("timed out waiting for {what}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_info_reports_port_and_chunks() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let info = server.get_json("").await?;
    assert_eq!(info["server"], "fanod");
    assert_eq!(info["chunks"], 3);
    assert!(info["port"].as_u64().unwrap_or(0) > 0);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_empty_canon_is_functional() -> Result<()> {
    let server = TestServer::start("", None).await?;

    let status = server.status().await?;
    assert_eq!(status["chunks"], 0);
    assert_eq!(status["current"], 0);

    assert!(server.post("/play", None).await?.status().is_success());
    assert!(server.get("/seek?position=0.9").await?.status().is_success());
    assert_eq!(server.get("/chunk/0").await?.status(), 404);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_endpoint_stops_server() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;
    let mut rx = server.shutdown_tx.subscribe();

    let resp = server.post("/daemon/shutdown", None).await?;
    assert!(resp.status().is_success());
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Shutdown initiated");

    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .context("shutdown signal not sent")??;

    let finished = tokio::time::timeout(Duration::from_secs(2), server.server).await;
    assert!(finished.is_ok(), "server did not stop");
    Ok(())
}
