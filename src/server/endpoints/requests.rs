//! Endpoints for course request fan-out and the acceptance protocol.

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

use crate::scheduling::types::{Day, InstructorId, RequestId, SlotId, SlotPreferences};
use crate::server::endpoints::scheduling_error_to_response;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequestsBody {
    pub semester: Option<i64>,
    pub major: Option<String>,
}

/// POST /requests/generate
/// Creates a pending request for every matching offering lacking one.
pub async fn post_generate(
    State(s): State<Arc<AppState>>,
    Json(body): Json<GenerateRequestsBody>,
) -> Response {
    info!(
        "POST /requests/generate (semester={:?}, major={:?})",
        body.semester, body.major
    );
    match s.db.generate_requests(body.semester, body.major.as_deref()) {
        Ok(created) => (StatusCode::OK, Json(json!({ "created": created }))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

/// GET /requests
pub async fn get_requests(State(s): State<Arc<AppState>>) -> Response {
    match s.db.list_requests() {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
    pub instructor_id: InstructorId,
    pub days: Vec<Day>,
    pub slot_ids: Vec<SlotId>,
}

/// POST /requests/:id/accept
/// Claims a pending request; exactly one concurrent caller wins.
pub async fn post_accept(
    Path(request_id): Path<RequestId>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<AcceptBody>,
) -> Response {
    info!(
        "POST /requests/{}/accept (instructor {})",
        request_id, body.instructor_id
    );
    let preferences = SlotPreferences {
        days: body.days,
        slot_ids: body.slot_ids,
    };
    match s.db.accept_request(request_id, body.instructor_id, &preferences) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "accepted" }))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UndoBody {
    pub instructor_id: InstructorId,
}

/// POST /requests/:id/undo
/// Reverts an acceptance within the 10-second window.
pub async fn post_undo(
    Path(request_id): Path<RequestId>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<UndoBody>,
) -> Response {
    info!(
        "POST /requests/{}/undo (instructor {})",
        request_id, body.instructor_id
    );
    match s.db.undo_acceptance(request_id, body.instructor_id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "pending" }))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}
