//! Checkpoint repository over a record table
//!
//! [`JsonFileCheckpointSaver`] implements [`CheckpointSaver`] by reading the
//! entire record table on every call and, for writes, saving the entire table
//! back before returning. Nothing is cached between calls, so the backing
//! store is always the source of truth.
//!
//! # Concurrent writers
//!
//! Each write is load → mutate → save. Two writers that interleave those
//! steps both start from the same table, and the second save overwrites the
//! first one's change (last write wins, at file granularity). By default the
//! saver does nothing about this. Setting
//! [`StoreConfig::serialize_writes`] holds a per-instance mutex across the
//! whole sequence, which makes writes through *one* saver safe. Separate
//! saver instances or processes sharing a file still need outside
//! coordination.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use json_checkpoint::{
//!     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, JsonFileCheckpointSaver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let saver = JsonFileCheckpointSaver::new("tmp/checkpoint.json").await?;
//!
//!     let config = CheckpointConfig::new().with_thread_id("thread-123".to_string());
//!     let saved = saver
//!         .put(&config, Checkpoint::empty(), CheckpointMetadata::new().with_step(0))
//!         .await?;
//!
//!     if let Some(tuple) = saver.get_tuple(&saved).await? {
//!         println!("Retrieved checkpoint: {}", tuple.checkpoint.id);
//!     }
//!     Ok(())
//! }
//! ```

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    config::{PutWritesPolicy, StoreConfig},
    error::{CheckpointError, Result},
    file::JsonFileTable,
    retry::RetryingTable,
    serializer::{JsonSerializer, SerializerProtocol},
    table::{CheckpointRecord, StoredWrite, TableStore},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::{future, stream, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Checkpoint saver persisting the whole record table through a [`TableStore`]
///
/// The default type parameters give the file-backed store with retried loads
/// and JSON encoding. Swap `T` for [`InMemoryTable`](crate::InMemoryTable) or a
/// custom backend via [`with_table`](Self::with_table).
#[derive(Debug)]
pub struct JsonFileCheckpointSaver<T = RetryingTable<JsonFileTable>, S = JsonSerializer> {
    table: T,
    serializer: Arc<S>,
    put_writes_policy: PutWritesPolicy,
    write_lock: Option<Mutex<()>>,
}

impl JsonFileCheckpointSaver {
    /// Open (or create) a checkpoint file with default settings
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(StoreConfig::new(path)).await
    }

    /// Open (or create) the checkpoint file described by `config`
    pub async fn from_config(config: StoreConfig) -> Result<Self> {
        Self::from_config_with_serializer(config, JsonSerializer::new()).await
    }
}

impl<S: SerializerProtocol + 'static> JsonFileCheckpointSaver<RetryingTable<JsonFileTable>, S> {
    /// Like [`from_config`](JsonFileCheckpointSaver::from_config) with a custom codec.
    ///
    /// The backing file is created, holding an empty table, if it does not
    /// exist yet.
    pub async fn from_config_with_serializer(config: StoreConfig, serializer: S) -> Result<Self> {
        let file = JsonFileTable::new(&config.path).with_pretty(config.pretty);
        let table = RetryingTable::new(file, config.retry.clone());

        let saver = Self::with_table(table, serializer)
            .with_put_writes_policy(config.put_writes_policy)
            .with_serialize_writes(config.serialize_writes);
        saver.ensure_exists().await?;

        info!(
            path = %config.path.display(),
            serialize_writes = config.serialize_writes,
            "Opened checkpoint store"
        );
        Ok(saver)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.table.inner().path()
    }
}

impl<T: TableStore, S: SerializerProtocol + 'static> JsonFileCheckpointSaver<T, S> {
    /// Build a saver over any table backend. The backend is not touched until
    /// the first operation; call [`ensure_exists`](Self::ensure_exists) to
    /// bootstrap it eagerly.
    pub fn with_table(table: T, serializer: S) -> Self {
        Self {
            table,
            serializer: Arc::new(serializer),
            put_writes_policy: PutWritesPolicy::default(),
            write_lock: None,
        }
    }

    pub fn with_put_writes_policy(mut self, policy: PutWritesPolicy) -> Self {
        self.put_writes_policy = policy;
        self
    }

    /// Serialize `put`/`put_writes` through this instance (see module docs)
    pub fn with_serialize_writes(mut self, enabled: bool) -> Self {
        self.write_lock = enabled.then(|| Mutex::new(()));
        self
    }

    /// The underlying table backend
    pub fn table(&self) -> &T {
        &self.table
    }

    /// Make sure the backing store exists and holds a readable table
    pub async fn ensure_exists(&self) -> Result<()> {
        self.table.ensure_exists().await
    }

    /// Get the number of threads being tracked
    pub async fn thread_count(&self) -> Result<usize> {
        Ok(self.table.load().await?.thread_count())
    }

    /// Get the total number of checkpoints across all threads
    pub async fn checkpoint_count(&self) -> Result<usize> {
        Ok(self.table.load().await?.checkpoint_count())
    }

    async fn lock_writes(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.write_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    fn missing_target(&self, thread_id: &str, checkpoint_id: Option<&str>) -> Result<()> {
        match self.put_writes_policy {
            PutWritesPolicy::Ignore => {
                debug!(
                    thread_id = %thread_id,
                    checkpoint_id = checkpoint_id.unwrap_or("<none>"),
                    "Target checkpoint missing, dropping pending writes"
                );
                Ok(())
            }
            PutWritesPolicy::Strict => match checkpoint_id {
                Some(id) => Err(CheckpointError::NotFound(format!("{}/{}", thread_id, id))),
                None => Err(CheckpointError::Invalid(
                    "checkpoint_id is required".to_string(),
                )),
            },
        }
    }
}

fn require_thread_id(config: &CheckpointConfig) -> Result<&str> {
    config
        .thread_id
        .as_deref()
        .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))
}

/// Decode a stored record into the tuple handed back to callers
fn decode_tuple<S: SerializerProtocol>(
    serializer: &S,
    thread_id: &str,
    checkpoint_id: &str,
    record: &CheckpointRecord,
) -> Result<CheckpointTuple> {
    let checkpoint: Checkpoint = serializer.loads_str(&record.checkpoint)?;
    let metadata: CheckpointMetadata = serializer.loads_str(&record.metadata)?;
    let pending_writes = record
        .pending_writes
        .iter()
        .map(|write| {
            Ok((
                write.task_id.clone(),
                write.channel.clone(),
                serializer.loads_str(&write.value)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tuple = CheckpointTuple::new(
        CheckpointConfig::for_checkpoint(thread_id, checkpoint_id),
        checkpoint,
        metadata,
    )
    .with_pending_writes(pending_writes);

    if let Some(parent_id) = record.parent_config.as_deref().filter(|id| !id.is_empty()) {
        tuple = tuple.with_parent_config(CheckpointConfig::for_checkpoint(thread_id, parent_id));
    }

    Ok(tuple)
}

#[async_trait]
impl<T: TableStore, S: SerializerProtocol + 'static> CheckpointSaver for JsonFileCheckpointSaver<T, S> {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = require_thread_id(config)?;
        let table = self.table.load().await?;

        let found = match &config.checkpoint_id {
            Some(checkpoint_id) => table
                .get(thread_id, checkpoint_id)
                .map(|record| (checkpoint_id.as_str(), record)),
            None => table
                .latest(thread_id)
                .map(|(checkpoint_id, record)| (checkpoint_id.as_str(), record)),
        };

        match found {
            Some((checkpoint_id, record)) => Ok(Some(decode_tuple(
                self.serializer.as_ref(),
                thread_id,
                checkpoint_id,
                record,
            )?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let mut threads = self.table.load().await?.into_threads();

        let selected: Vec<_> = match config.and_then(|c| c.thread_id.as_ref()) {
            Some(thread_id) => threads.remove_entry(thread_id).into_iter().collect(),
            None => threads.into_iter().collect(),
        };

        let before_id = before.and_then(|b| b.checkpoint_id.clone());
        let entries = selected.into_iter().flat_map(move |(thread_id, records)| {
            let before_id = before_id.clone();
            records
                .into_iter()
                .rev()
                .filter(move |(checkpoint_id, _)| {
                    before_id.as_ref().map_or(true, |before| checkpoint_id < before)
                })
                .map(move |(checkpoint_id, record)| (thread_id.clone(), checkpoint_id, record))
        });

        let serializer = Arc::clone(&self.serializer);
        let filter = filter.unwrap_or_default();
        let stream = stream::iter(entries)
            .map(move |(thread_id, checkpoint_id, record)| {
                decode_tuple(serializer.as_ref(), &thread_id, &checkpoint_id, &record)
            })
            .filter(move |item| {
                future::ready(match item {
                    Ok(tuple) => tuple.metadata.matches(&filter),
                    Err(_) => true,
                })
            })
            .take(limit.unwrap_or(usize::MAX));

        Ok(Box::pin(stream))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        let thread_id = require_thread_id(config)?;
        if checkpoint.id.is_empty() {
            return Err(CheckpointError::Invalid("checkpoint id is required".to_string()));
        }

        let record = CheckpointRecord::new(
            self.serializer.dumps_str(&checkpoint)?,
            self.serializer.dumps_str(&metadata)?,
            config.checkpoint_id.clone(),
        );

        let _guard = self.lock_writes().await;
        let mut table = self.table.load().await?;
        table.insert(thread_id, &checkpoint.id, record);
        self.table.save(&table).await?;

        debug!(
            thread_id = %thread_id,
            checkpoint_id = %checkpoint.id,
            parent = config.checkpoint_id.as_deref().unwrap_or("<none>"),
            "Stored checkpoint"
        );
        Ok(CheckpointConfig::for_checkpoint(thread_id, checkpoint.id))
    }

    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()> {
        let thread_id = require_thread_id(config)?;
        let Some(checkpoint_id) = config.checkpoint_id.as_deref() else {
            return self.missing_target(thread_id, None);
        };

        let count = writes.len();
        let stored = writes
            .into_iter()
            .map(|(channel, value)| {
                Ok(StoredWrite {
                    task_id: task_id.clone(),
                    channel,
                    value: self.serializer.dumps_str(&value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let _guard = self.lock_writes().await;
        let mut table = self.table.load().await?;
        if !table.append_writes(thread_id, checkpoint_id, stored) {
            return self.missing_target(thread_id, Some(checkpoint_id));
        }
        self.table.save(&table).await?;

        debug!(
            thread_id = %thread_id,
            checkpoint_id = %checkpoint_id,
            task_id = %task_id,
            writes = count,
            "Appended pending writes"
        );
        Ok(())
    }
}
