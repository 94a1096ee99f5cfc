//! Endpoints for time-slot generation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::server::endpoints::scheduling_error_to_response;
use crate::types::AppState;

/// POST /slots/generate
/// Regenerates slots for the active timings; all-or-nothing.
pub async fn post_generate(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /slots/generate");
    match s.db.generate_slots() {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DistributeBody {
    pub target_slots: u32,
}

/// POST /slots/distribute
/// Back-solves an even slot length for the target count, then regenerates.
pub async fn post_distribute(
    State(s): State<Arc<AppState>>,
    Json(body): Json<DistributeBody>,
) -> Response {
    info!("POST /slots/distribute (target {})", body.target_slots);
    match s
        .db
        .generate_slots_distributed(body.target_slots, &s.config.slot_length_bounds)
    {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

/// GET /slots
pub async fn get_slots(State(s): State<Arc<AppState>>) -> Response {
    match s.db.list_slots() {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}
