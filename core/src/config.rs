//! Configuration types for HANDLERSYNC

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the reconciliation driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Path of the persistent store database
    pub store_path: PathBuf,

    /// Logging level
    pub log_level: String,

    /// Report the full drift field list on Test, not just the verdict
    pub verbose_drift: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./handlers.db"),
            log_level: "info".to_string(),
            verbose_drift: false,
        }
    }
}
