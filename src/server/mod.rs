use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{admin, catalog, requests, schedule, slots, status};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Request fan-out and the acceptance protocol
    let request_router = Router::new()
        .route("/requests", get(requests::get_requests))
        .route("/requests/generate", post(requests::post_generate))
        .route("/requests/:id/accept", post(requests::post_accept))
        .route("/requests/:id/undo", post(requests::post_undo));

    // Planning, blocks, and slot generation
    let schedule_router = Router::new()
        .route("/schedule/plan", post(schedule::post_plan))
        .route("/blocks", get(schedule::get_blocks))
        .route("/blocks/:id/reschedule", post(schedule::post_reschedule))
        .route("/slots", get(slots::get_slots))
        .route("/slots/generate", post(slots::post_generate))
        .route("/slots/distribute", post(slots::post_distribute));

    // Seeding plumbing around the engine
    let catalog_router = Router::new()
        .route("/rooms", get(catalog::get_rooms).post(catalog::post_room))
        .route(
            "/offerings",
            get(catalog::get_offerings).post(catalog::post_offering),
        )
        .route(
            "/timings",
            get(catalog::get_timings).post(catalog::post_timings),
        );

    Router::new()
        .route("/health", get(status::get_health))
        .route("/admin/reset", post(admin::post_reset))
        .merge(request_router)
        .merge(schedule_router)
        .merge(catalog_router)
        .with_state(app_state)
}
