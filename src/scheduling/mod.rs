/// Scheduling engine: conflict predicate, slot partitioning, and the greedy
/// assignment planner. Persistence-facing orchestration lives in `crate::db`.

pub mod conflict;
pub mod error;
pub mod planner;
pub mod slots;
pub mod types;

pub use error::SchedulingError;
