//! IMLO Storage Layer - File-Based Snapshots
//!
//! Persistence model for the ledger:
//! - State stays in memory for the life of the process
//! - The full snapshot is rewritten after every mutation
//! - Every file is written to a temporary sibling and renamed into place,
//!   so a crash mid-write never leaves a truncated snapshot behind

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Simple file-based storage for named snapshots
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Open storage directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }

        Ok(Self { data_dir })
    }

    /// Save a snapshot (JSON for readability, Bincode for speed)
    pub fn save_snapshot<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let bin =
            bincode::serialize(data).map_err(|e| StorageError::SerializationError(e.to_string()))?;

        // bincode is what load_snapshot trusts, so it lands first; an
        // interrupted save leaves at worst a stale JSON copy
        write_atomic(&self.bin_path(name), &bin)?;
        write_atomic(&self.json_path(name), json.as_bytes())?;

        log::debug!("💾 Snapshot '{}' written ({} bytes)", name, bin.len());
        Ok(())
    }

    /// Load a snapshot (tries Bincode first, falls back to JSON)
    pub fn load_snapshot<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let bin_path = self.bin_path(name);
        let json_path = self.json_path(name);

        if bin_path.exists() {
            let data = fs::read(&bin_path)?;
            match bincode::deserialize(&data) {
                Ok(value) => return Ok(value),
                Err(e) if json_path.exists() => {
                    log::warn!(
                        "⚠️  Binary snapshot '{}' unreadable ({}), trying JSON copy",
                        name,
                        e
                    );
                }
                Err(e) => return Err(StorageError::SerializationError(e.to_string())),
            }
        }

        if json_path.exists() {
            let data = fs::read_to_string(&json_path)?;
            return serde_json::from_str(&data)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        Err(StorageError::SnapshotNotFound(name.to_string()))
    }

    /// Check if snapshot exists
    pub fn has_snapshot(&self, name: &str) -> bool {
        self.bin_path(name).exists() || self.json_path(name).exists()
    }

    /// Get storage directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn json_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    fn bin_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.bin", name))
    }
}

/// Write-temp-then-rename. The rename is atomic on the same filesystem.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
