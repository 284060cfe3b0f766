//! Runtime configuration
//!
//! Plain settings structs with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Domain identifier of a local development environment
pub const DEV_DOMAIN_ID: u64 = 31337;

/// Per-account settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSettings {
    /// Length in seconds of one stream accrual interval
    pub stream_interval_secs: u64,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            stream_interval_secs: 1,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub registry_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            registry_file: "registry.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}
