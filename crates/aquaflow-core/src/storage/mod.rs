mod config;
pub mod database;

pub use config::{Config, NotificationsConfig, ReminderConfig, ServerConfig, SyncConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `AQUAFLOW_HOME` wins when set. Otherwise `~/.config/aquaflow[-dev]/`,
/// with the `-dev` variant selected by `AQUAFLOW_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("AQUAFLOW_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("AQUAFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("aquaflow-dev")
            } else {
                base_dir.join("aquaflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
