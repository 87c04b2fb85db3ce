mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{Config, HabitsConfig, NotificationsConfig, Theme, UiConfig};
pub use database::{HabitDb, UserRecord};
pub use store::HabitStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Resolve the data directory, creating it if needed.
///
/// `ONEPERCENT_DATA_DIR` wins if set. Otherwise `~/.config/onepercent`, or
/// `~/.config/onepercent-dev` when `ONEPERCENT_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ONEPERCENT_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ONEPERCENT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("onepercent-dev")
            } else {
                base_dir.join("onepercent")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
