//! Endpoints for planning passes, block listing, and rescheduling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::scheduling::types::{BlockId, Day, InstructorId, RoomId, SlotId};
use crate::server::endpoints::scheduling_error_to_response;
use crate::types::AppState;

/// POST /schedule/plan
/// Runs one greedy planning pass over accepted, unassigned requests.
pub async fn post_plan(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /schedule/plan");
    match s.db.plan_assignments() {
        Ok(created) => {
            (StatusCode::OK, Json(json!({ "blocks_created": created }))).into_response()
        }
        Err(e) => scheduling_error_to_response(e),
    }
}

/// GET /blocks
pub async fn get_blocks(State(s): State<Arc<AppState>>) -> Response {
    match s.db.list_blocks() {
        Ok(blocks) => (StatusCode::OK, Json(blocks)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RescheduleBody {
    pub instructor_id: InstructorId,
    pub day: Day,
    pub slot_id: SlotId,
    pub room_id: RoomId,
}

/// POST /blocks/:id/reschedule
/// Moves a block after re-validating all three conflict dimensions.
pub async fn post_reschedule(
    Path(block_id): Path<BlockId>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<RescheduleBody>,
) -> Response {
    info!(
        "POST /blocks/{}/reschedule -> ({}, slot {}, room {})",
        block_id, body.day, body.slot_id, body.room_id
    );
    match s.db.reschedule_block(
        block_id,
        body.instructor_id,
        body.day,
        body.slot_id,
        body.room_id,
    ) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "rescheduled" }))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}
