//! Error taxonomy for scheduling operations.

use super::conflict::ResourceKind;
use super::types::{Day, InstructorId, RequestId, SlotId};
use thiserror::Error;

/// Errors returned by scheduling operations.
///
/// Every variant except `Storage`, `Payload`, and `Corrupt` is a domain
/// outcome recovered at the operation boundary; store failures are kept
/// distinct so callers can retry them without misreading a lost race or a
/// real conflict.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// A referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The optimistic claim lost the race - the request was no longer pending
    #[error("request {request_id} has already been claimed")]
    Conflict { request_id: RequestId },

    /// A resource already occupies the candidate (day, slot) cell
    #[error("{kind} is already scheduled on {day}, slot {slot_id}")]
    ScheduleConflict {
        kind: ResourceKind,
        day: Day,
        slot_id: SlotId,
    },

    /// The undo window elapsed before the call arrived
    #[error("undo window elapsed ({elapsed_ms} ms since acceptance)")]
    Expired { elapsed_ms: i64 },

    /// The acting instructor does not own the entity
    #[error("instructor {instructor_id} does not own this {entity}")]
    Unauthorized {
        instructor_id: InstructorId,
        entity: &'static str,
    },

    /// Infeasible slot-generation or request parameters
    #[error("infeasible configuration: {message}")]
    ConfigError { message: String },

    /// A stored row violates an internal invariant
    #[error("inconsistent stored state: {message}")]
    Corrupt { message: String },

    /// Store-level failure, distinct from the domain taxonomy
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A persisted JSON column failed to parse
    #[error("corrupt stored payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl SchedulingError {
    /// Returns true if this error reflects the caller's input or timing
    /// rather than a store failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            SchedulingError::Storage(_)
                | SchedulingError::Payload(_)
                | SchedulingError::Corrupt { .. }
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        SchedulingError::ConfigError {
            message: message.into(),
        }
    }
}
