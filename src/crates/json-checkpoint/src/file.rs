//! Single-file JSON backend for the record table
//!
//! The whole table lives in one JSON file. Saves never patch the file in
//! place: the new contents go to a uniquely named sibling temp file, which is
//! fsynced and then renamed over the target. Readers therefore see either the
//! old table or the new one, never a torn mix.
//!
//! The write itself runs on a spawned task that owns the I/O lock. If the
//! caller's future is dropped mid-save, the write still runs to completion
//! (or fails cleanly) before the next load or save on this instance proceeds.

use crate::error::Result;
use crate::table::{Table, TableStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Record table stored in a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileTable {
    path: PathBuf,
    pretty: bool,
    io_lock: Arc<Mutex<()>>,
}

impl JsonFileTable {
    /// Create a table backed by `path`. Nothing is touched on disk until the
    /// first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: false,
            io_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Pretty-print the file (larger, but diffable by hand)
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(table)?
        } else {
            serde_json::to_vec(table)?
        };
        Ok(bytes)
    }

    async fn write_locked(&self, guard: OwnedMutexGuard<()>, data: Vec<u8>) -> Result<()> {
        let path = self.path.clone();
        let handle = tokio::spawn(async move {
            let result = atomic_write(&path, &data).await;
            drop(guard);
            result
        });
        handle.await??;
        Ok(())
    }
}

#[async_trait]
impl TableStore for JsonFileTable {
    async fn load(&self) -> Result<Table> {
        let guard = self.io_lock.clone().lock_owned().await;

        match fs::read(&self.path).await {
            Ok(bytes) => {
                let table: Table = serde_json::from_slice(&bytes)?;
                debug!(
                    path = %self.path.display(),
                    threads = table.thread_count(),
                    "Loaded checkpoint table"
                );
                Ok(table)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Table::new();
                let data = self.encode(&empty)?;
                self.write_locked(guard, data).await?;
                info!(path = %self.path.display(), "Initialized empty checkpoint file");
                Ok(empty)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, table: &Table) -> Result<()> {
        let data = self.encode(table)?;
        let guard = self.io_lock.clone().lock_owned().await;
        let len = data.len();
        self.write_locked(guard, data).await?;
        debug!(path = %self.path.display(), bytes = len, "Saved checkpoint table");
        Ok(())
    }
}

/// Write `data` to a temp file next to `path`, fsync, then rename over `path`.
async fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("checkpoints"),
        Uuid::new_v4()
    );
    let temp_path = path.with_file_name(temp_name);

    let result = write_and_rename(&temp_path, path, data).await;
    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}

async fn write_and_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CheckpointRecord;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_bootstraps_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("checkpoints.json");
        let table = JsonFileTable::new(&path);

        let loaded = table.load().await.unwrap();
        assert!(loaded.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let table = JsonFileTable::new(dir.path().join("checkpoints.json"));

        let mut data = Table::new();
        data.insert("t", "0001", CheckpointRecord::new("{}".into(), "{}".into(), None));
        table.save(&data).await.unwrap();

        assert_eq!(table.load().await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let table = JsonFileTable::new(dir.path().join("checkpoints.json")).with_pretty(true);

        for i in 0..5 {
            let mut data = Table::new();
            data.insert("t", &format!("{:04}", i), CheckpointRecord::new("{}".into(), "{}".into(), None));
            table.save(&data).await.unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["checkpoints.json".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoints.json");
        std::fs::write(&path, "{\"t\": ").unwrap();

        let err = JsonFileTable::new(&path).load().await.unwrap_err();
        assert!(matches!(err, crate::CheckpointError::Serialization(_)));
    }
}
