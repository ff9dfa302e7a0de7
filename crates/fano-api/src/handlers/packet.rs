//! /packet: build the wire packet for a chunk, or validate one from a peer.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use fano_core::wire::{decode_packet, encode_packet, BROADCAST_DEST, PACKET_LEN};
use fano_core::{CanonError, Matrix};

use super::{reject, ApiError, ApiState};

#[derive(Deserialize)]
pub struct EncodeQuery {
    pub source: Option<u16>,
    pub dest: Option<u16>,
}

#[derive(Serialize)]
pub struct EncodeResponse {
    pub index: usize,
    pub len: usize,
    pub hex: String,
}

pub async fn handle_packet_encode(
    State(state): State<ApiState>,
    Path(index): Path<usize>,
    Query(q): Query<EncodeQuery>,
) -> Result<Json<EncodeResponse>, ApiError> {
    let chunk = state.engine.get_chunk(index).map_err(reject)?;
    let bytes = encode_packet(
        &chunk.fano_state(),
        q.source.unwrap_or(state.source_id),
        q.dest.unwrap_or(BROADCAST_DEST),
    );
    Ok(Json(EncodeResponse {
        index,
        len: PACKET_LEN,
        hex: hex::encode(bytes),
    }))
}

#[derive(Deserialize)]
pub struct DecodeRequest {
    pub hex: String,
}

#[derive(Serialize)]
pub struct DecodeResponse {
    pub source_id: u16,
    pub dest_id: u16,
    pub fano_point: u8,
    pub matrix: Matrix,
    pub angle: f32,
    pub seed: u32,
}

pub async fn handle_packet_decode(
    Json(req): Json<DecodeRequest>,
) -> Result<Json<DecodeResponse>, ApiError> {
    let bytes = hex::decode(req.hex.trim())
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid hex".to_string()))?;
    let decoded = decode_packet(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "rejected packet");
        reject(CanonError::from(e))
    })?;
    Ok(Json(DecodeResponse {
        source_id: decoded.source_id,
        dest_id: decoded.dest_id,
        fano_point: decoded.state.fano_point,
        matrix: decoded.state.matrix,
        angle: decoded.state.angle,
        seed: decoded.state.seed,
    }))
}
