pub mod admin;
pub mod catalog;
pub mod requests;
pub mod schedule;
pub mod slots;
pub mod status;

use crate::scheduling::SchedulingError;
use crate::server::types::ApiErrorType;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Maps a scheduling error onto the API error taxonomy.
pub(crate) fn scheduling_error_to_response(err: SchedulingError) -> Response {
    let (status, message) = match &err {
        SchedulingError::NotFound { .. } => (StatusCode::NOT_FOUND, "Entity not found"),
        SchedulingError::Conflict { .. } => {
            (StatusCode::CONFLICT, "Request was already claimed")
        }
        SchedulingError::ScheduleConflict { .. } => {
            (StatusCode::CONFLICT, "Placement collides with an existing block")
        }
        SchedulingError::Expired { .. } => (StatusCode::GONE, "Undo window elapsed"),
        SchedulingError::Unauthorized { .. } => {
            (StatusCode::FORBIDDEN, "Instructor does not own this entity")
        }
        SchedulingError::ConfigError { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "Infeasible configuration")
        }
        SchedulingError::Corrupt { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Inconsistent stored state")
        }
        SchedulingError::Storage(_) | SchedulingError::Payload(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        }
    };
    if !err.is_client_error() {
        error!("Storage-level failure: {}", err);
    }
    ApiErrorType::from((status, message, Some(err.to_string()))).into_response()
}
