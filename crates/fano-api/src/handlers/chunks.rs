//! /chunk/{index} and /fano/{point} handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use fano_core::{fano, CanonError, Matrix};

use super::{reject, ApiError, ApiState};

#[derive(Serialize)]
pub struct ChunkResponse {
    pub index: usize,
    pub matrix: Matrix,
    pub angle: f32,
    pub seed: u32,
    pub timestamp: u64,
}

pub async fn handle_chunk(
    State(state): State<ApiState>,
    Path(index): Path<usize>,
) -> Result<Json<ChunkResponse>, ApiError> {
    let chunk = state.engine.get_chunk(index).map_err(reject)?;
    Ok(Json(ChunkResponse {
        index,
        matrix: chunk.matrix(),
        angle: chunk.angle(),
        seed: chunk.seed(),
        timestamp: chunk.timestamp(),
    }))
}

#[derive(Serialize)]
pub struct FanoResponse {
    /// 1-based.
    pub point: u8,
    pub name: &'static str,
    pub hue: u16,
    pub ratio: f32,
}

/// `point` in the path is the 0-based table index.
pub async fn handle_fano(Path(point): Path<usize>) -> Result<Json<FanoResponse>, ApiError> {
    let entry = fano::by_index(point)
        .ok_or_else(|| reject(CanonError::fano_point_not_found(point as u64)))?;
    Ok(Json(FanoResponse {
        point: entry.point,
        name: entry.name,
        hue: entry.hue,
        ratio: entry.ratio(),
    }))
}
