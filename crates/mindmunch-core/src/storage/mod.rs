mod config;
pub mod database;
pub mod memory;

pub use config::{
    BackgroundConfig, Config, EngineConfig, LoggingConfig, MonitorConfig, QuizConfig,
    ShieldConfig,
};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StoreError};

/// Durable key-value storage shared by the foreground app and the background
/// monitor.
///
/// Records are read and written whole; there are no transactions and no
/// partial-key access. A `set` replaces the previous value atomically from the
/// reader's point of view.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// Returns the data directory.
///
/// `MINDMUNCH_DATA_DIR` wins when set. Otherwise `~/.config/mindmunch[-dev]/`
/// based on MINDMUNCH_ENV (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MINDMUNCH_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("MINDMUNCH_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mindmunch-dev")
            } else {
                base_dir.join("mindmunch")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
