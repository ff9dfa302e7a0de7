//! HTTP API handlers: exposes the playback engine and the hub as JSON.

pub mod assets;
pub mod canon;
pub mod chunks;
pub mod packet;
pub mod stream;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;

use fano_core::CanonError;
use fano_services::{BroadcastHub, PlaybackEngine};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<PlaybackEngine>,
    pub hub: Arc<BroadcastHub>,
    /// Port reported by `/api`.
    pub port: u16,
    /// Source id stamped on packets built by `/api/packet/{index}`.
    pub source_id: u16,
    /// NDJSON asset list served at `/api/assets`.
    pub assets_path: PathBuf,
    /// Per-connection frame queue for socket and event-stream subscribers.
    pub queue_depth: usize,
    /// Fires once to stop the daemon, the timing loop and open streams.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

pub(crate) type ApiError = (StatusCode, String);

/// Map an engine/hub error onto its HTTP status.
pub(crate) fn reject(err: CanonError) -> ApiError {
    let status = match &err {
        CanonError::NotFound { .. } => StatusCode::NOT_FOUND,
        CanonError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CanonError::InvalidPacket(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CanonError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, err.to_string())
}

/// Pull one numeric argument out of a raw query string.
///
/// Accepts both `key=value` pairs and the bare `?0.5` form.
pub(crate) fn query_arg(raw: Option<&str>, key: &str) -> Result<f32, ApiError> {
    let missing = || reject(CanonError::InvalidInput(format!("missing {key}")));
    let raw = raw.filter(|q| !q.is_empty()).ok_or_else(missing)?;

    let value = if raw.contains('=') {
        raw.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .ok_or_else(missing)?
    } else {
        raw
    };

    value
        .parse::<f32>()
        .map_err(|_| reject(CanonError::InvalidInput(format!("{key} must be a number, got {value:?}"))))
}

// Re-export handler functions for use in router setup.
pub use assets::handle_assets;
pub use canon::{
    handle_canon, handle_info, handle_pause, handle_play, handle_seek, handle_shutdown,
    handle_speed, handle_stop, handle_subscribers,
};
pub use chunks::{handle_chunk, handle_fano};
pub use packet::{handle_packet_decode, handle_packet_encode};
pub use stream::{handle_events, handle_ws, handle_ws_info};
