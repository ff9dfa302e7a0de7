//! /assets: the canon asset list, passed through as NDJSON.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use super::{ApiError, ApiState};

pub const NDJSON: &str = "application/x-ndjson";

pub async fn handle_assets(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let body = tokio::fs::read(&state.assets_path).await.map_err(|e| {
        tracing::debug!(path = %state.assets_path.display(), error = %e, "assets unavailable");
        (StatusCode::NOT_FOUND, "assets not found".to_string())
    })?;
    Ok(([(header::CONTENT_TYPE, NDJSON)], body))
}
