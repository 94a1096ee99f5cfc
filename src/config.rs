/// Application configuration loaded from a JSON file
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bounds for the slot length that distribution-mode generation may solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotLengthBounds {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl Default for SlotLengthBounds {
    fn default() -> Self {
        SlotLengthBounds {
            min_minutes: 30,
            max_minutes: 180,
        }
    }
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub slot_length_bounds: SlotLengthBounds,
}

fn default_db_path() -> String {
    "timetabler.db".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl AppConfig {
    /// Loads configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            slot_length_bounds: SlotLengthBounds::default(),
        }
    }
}
