//! Registry persistence layer
//!
//! Provides save/load functionality for the registry and every account it
//! holds (signers, nonces, balances, streams and pending events).

use crate::config::StorageConfig;
use crate::registry::Registry;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Registry storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    /// Get the registry file path
    fn registry_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.registry_file)
    }

    /// Get a backup file path
    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.registry_file, index))
    }

    /// Temporary file a save writes before renaming over the registry file
    fn temp_path(&self) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.tmp", self.config.registry_file))
    }

    /// Save the registry to disk
    pub fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        let path = self.registry_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.temp_path();
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, registry)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!(
            "Saved registry with {} accounts to {:?}",
            registry.account_count(),
            path
        );
        Ok(())
    }

    /// Load the registry from disk
    pub fn load(&self) -> Result<Registry, StorageError> {
        let path = self.registry_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Registry file not found".to_string(),
            ));
        }

        let registry = load_from_file(&path)?;
        log::info!(
            "Loaded registry with {} accounts from {:?}",
            registry.account_count(),
            path
        );
        Ok(registry)
    }

    /// Load the saved registry, or start an empty one
    pub fn load_or_default(&self) -> Result<Registry, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(Registry::new())
        }
    }

    /// Check if a saved registry exists
    pub fn exists(&self) -> bool {
        self.registry_path().exists()
    }

    /// Delete the saved registry
    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.registry_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<Registry, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|&i| self.backup_path(i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.registry_path();

        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

/// Save a registry to a specific file path
pub fn save_to_file(registry: &Registry, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, registry)?;
    Ok(())
}

/// Load a registry from a specific file path
///
/// Well-formed JSON that describes an impossible account (bad threshold,
/// duplicate signers, overdrawn stream) is `InvalidData`.
pub fn load_from_file(path: &Path) -> Result<Registry, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let registry: Registry = serde_json::from_reader(reader).map_err(|e| {
        if e.is_data() {
            StorageError::InvalidData(format!("{:?}: {}", path, e))
        } else {
            StorageError::SerializationError(e)
        }
    })?;

    if !registry.is_consistent() {
        return Err(StorageError::InvalidData(format!(
            "account index in {:?} does not match its accounts",
            path
        )));
    }
    Ok(registry)
}
