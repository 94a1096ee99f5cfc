use crate::config::AppConfig;
use crate::db::SchedulingDbManager;

/// Shared application state handed to every endpoint.
pub struct AppState {
    pub db: SchedulingDbManager,
    pub config: AppConfig,
}
