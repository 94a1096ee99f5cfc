//! Thin seeding endpoints for offerings, rooms, and operating timings.
//! Plumbing only; the scheduling engine never depends on how rows arrive.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::scheduling::types::{RoomKind, TimingsSpec};
use crate::server::endpoints::scheduling_error_to_response;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct RoomBody {
    pub name: String,
    pub capacity: i64,
    pub kind: RoomKind,
}

/// POST /rooms
pub async fn post_room(State(s): State<Arc<AppState>>, Json(body): Json<RoomBody>) -> Response {
    info!("POST /rooms ({})", body.name);
    match s.db.insert_room(&body.name, body.capacity, body.kind) {
        Ok(room_id) => (StatusCode::CREATED, Json(json!({ "room_id": room_id }))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

/// GET /rooms
pub async fn get_rooms(State(s): State<Arc<AppState>>) -> Response {
    match s.db.list_rooms() {
        Ok(rooms) => (StatusCode::OK, Json(rooms)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct OfferingBody {
    pub course_code: String,
    pub section_code: String,
    pub semester: i64,
    pub major: String,
    #[serde(default)]
    pub is_lab: bool,
}

/// POST /offerings
pub async fn post_offering(
    State(s): State<Arc<AppState>>,
    Json(body): Json<OfferingBody>,
) -> Response {
    info!(
        "POST /offerings ({} {} sem {})",
        body.course_code, body.section_code, body.semester
    );
    match s.db.insert_offering(
        &body.course_code,
        &body.section_code,
        body.semester,
        &body.major,
        body.is_lab,
    ) {
        Ok(offering_id) => {
            (StatusCode::CREATED, Json(json!({ "offering_id": offering_id }))).into_response()
        }
        Err(e) => scheduling_error_to_response(e),
    }
}

/// GET /offerings
pub async fn get_offerings(State(s): State<Arc<AppState>>) -> Response {
    match s.db.list_offerings() {
        Ok(offerings) => (StatusCode::OK, Json(offerings)).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}

/// POST /timings
/// Activates a new timings row; the previous active row is deactivated.
pub async fn post_timings(
    State(s): State<Arc<AppState>>,
    Json(spec): Json<TimingsSpec>,
) -> Response {
    info!("POST /timings (shift {})", spec.shift);
    match s.db.activate_timings(&spec) {
        Ok(timings_id) => {
            (StatusCode::CREATED, Json(json!({ "timings_id": timings_id }))).into_response()
        }
        Err(e) => scheduling_error_to_response(e),
    }
}

/// GET /timings
pub async fn get_timings(State(s): State<Arc<AppState>>) -> Response {
    match s.db.active_timings() {
        Ok(Some(timings)) => (StatusCode::OK, Json(timings)).into_response(),
        Ok(None) => (StatusCode::OK, Json(json!(null))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}
