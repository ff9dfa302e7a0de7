//! /, /canon, transport controls, /subscribers and /daemon/shutdown.

use axum::extract::{RawQuery, State};
use axum::Json;
use serde::Serialize;

use fano_services::{StatusSnapshot, TransportKind};

use super::{query_arg, reject, ApiError, ApiState};

// ── / ──────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct InfoResponse {
    pub server: &'static str,
    pub port: u16,
    pub chunks: usize,
}

pub async fn handle_info(State(state): State<ApiState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        server: "fanod",
        port: state.port,
        chunks: state.engine.len(),
    })
}

// ── /canon ────────────────────────────────────────────────────────────────────

pub async fn handle_canon(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    Json(state.engine.status())
}

// ── Controls ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct Ack {
    pub ok: bool,
}

const ACK: Json<Ack> = Json(Ack { ok: true });

pub async fn handle_play(State(state): State<ApiState>) -> Json<Ack> {
    state.engine.play();
    ACK
}

pub async fn handle_pause(State(state): State<ApiState>) -> Json<Ack> {
    state.engine.pause();
    ACK
}

pub async fn handle_stop(State(state): State<ApiState>) -> Json<Ack> {
    state.engine.stop();
    ACK
}

pub async fn handle_seek(
    State(state): State<ApiState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Ack>, ApiError> {
    let position = query_arg(query.as_deref(), "position")?;
    state.engine.seek(position).map_err(reject)?;
    Ok(ACK)
}

pub async fn handle_speed(
    State(state): State<ApiState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Ack>, ApiError> {
    let speed = query_arg(query.as_deref(), "speed")?;
    state.engine.set_speed(speed).map_err(reject)?;
    Ok(ACK)
}

// ── /subscribers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SubscribersResponse {
    pub socket: usize,
    pub event_stream: usize,
}

pub async fn handle_subscribers(State(state): State<ApiState>) -> Json<SubscribersResponse> {
    Json(SubscribersResponse {
        socket: state.hub.subscriber_count(TransportKind::Socket),
        event_stream: state.hub.subscriber_count(TransportKind::EventStream),
    })
}

// ── /daemon/shutdown ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());
    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
