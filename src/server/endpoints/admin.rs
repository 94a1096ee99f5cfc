//! Administrative reset endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::scheduling::types::ResetScope;
use crate::server::endpoints::scheduling_error_to_response;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetBody {
    pub scope: ResetScope,
}

/// POST /admin/reset
/// Bulk state clearing; each scope is all-or-nothing.
pub async fn post_reset(State(s): State<Arc<AppState>>, Json(body): Json<ResetBody>) -> Response {
    warn!("POST /admin/reset ({:?})", body.scope);
    match s.db.reset(body.scope) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "reset" }))).into_response(),
        Err(e) => scheduling_error_to_response(e),
    }
}
