//! Record table: the whole persisted dataset held in memory
//!
//! The table maps `thread_id -> checkpoint_id -> CheckpointRecord` and
//! serializes to exactly this JSON shape:
//!
//! ```text
//! { "<thread_id>": { "<checkpoint_id>": {
//!       "checkpoint": "<encoded checkpoint>",
//!       "metadata": "<encoded metadata>",
//!       "parent_config": "<parent checkpoint_id>" | null,
//!       "pending_writes": [ ["<task_id>", "<channel>", "<encoded value>"], ... ]
//! } } }
//! ```
//!
//! Both levels are `BTreeMap`s, so a thread's checkpoints are always held in
//! checkpoint-id order and "latest" is the last key.
//!
//! Backends implement [`TableStore`]: load the full table, save the full
//! table. See [`JsonFileTable`](crate::file::JsonFileTable) and
//! [`InMemoryTable`](crate::memory::InMemoryTable).

use crate::checkpoint::CheckpointId;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pending write as persisted: `[task_id, channel, encoded value]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct StoredWrite {
    pub task_id: String,
    pub channel: String,
    /// Value as produced by the codec
    pub value: String,
}

impl From<(String, String, String)> for StoredWrite {
    fn from((task_id, channel, value): (String, String, String)) -> Self {
        Self {
            task_id,
            channel,
            value,
        }
    }
}

impl From<StoredWrite> for (String, String, String) {
    fn from(write: StoredWrite) -> Self {
        (write.task_id, write.channel, write.value)
    }
}

/// One checkpoint as persisted in the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Encoded [`Checkpoint`](crate::Checkpoint)
    pub checkpoint: String,

    /// Encoded [`CheckpointMetadata`](crate::CheckpointMetadata)
    pub metadata: String,

    /// Id of the checkpoint this one was derived from, in the same thread
    pub parent_config: Option<CheckpointId>,

    /// Append-only, insertion ordered
    #[serde(default)]
    pub pending_writes: Vec<StoredWrite>,
}

impl CheckpointRecord {
    /// Create a record with no pending writes
    pub fn new(checkpoint: String, metadata: String, parent_config: Option<CheckpointId>) -> Self {
        Self {
            checkpoint,
            metadata,
            parent_config,
            pending_writes: Vec::new(),
        }
    }
}

/// Checkpoints of a single thread, ordered by id
pub type ThreadRecords = BTreeMap<CheckpointId, CheckpointRecord>;

/// The full dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    threads: BTreeMap<String, ThreadRecords>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// All checkpoints of a thread
    pub fn thread(&self, thread_id: &str) -> Option<&ThreadRecords> {
        self.threads.get(thread_id)
    }

    /// Iterate threads in thread-id order
    pub fn threads(&self) -> impl Iterator<Item = (&String, &ThreadRecords)> {
        self.threads.iter()
    }

    /// Take ownership of the per-thread records
    pub fn into_threads(self) -> BTreeMap<String, ThreadRecords> {
        self.threads
    }

    /// Look up an exact checkpoint
    pub fn get(&self, thread_id: &str, checkpoint_id: &str) -> Option<&CheckpointRecord> {
        self.threads.get(thread_id)?.get(checkpoint_id)
    }

    /// The checkpoint with the greatest id in the thread
    pub fn latest(&self, thread_id: &str) -> Option<(&CheckpointId, &CheckpointRecord)> {
        self.threads.get(thread_id)?.iter().next_back()
    }

    /// Insert or overwrite a checkpoint, creating the thread if needed
    pub fn insert(&mut self, thread_id: &str, checkpoint_id: &str, record: CheckpointRecord) {
        self.threads
            .entry(thread_id.to_string())
            .or_default()
            .insert(checkpoint_id.to_string(), record);
    }

    /// Append writes to an existing checkpoint.
    ///
    /// Returns `false` and leaves the table untouched when the checkpoint
    /// does not exist.
    pub fn append_writes(
        &mut self,
        thread_id: &str,
        checkpoint_id: &str,
        writes: impl IntoIterator<Item = StoredWrite>,
    ) -> bool {
        match self
            .threads
            .get_mut(thread_id)
            .and_then(|records| records.get_mut(checkpoint_id))
        {
            Some(record) => {
                record.pending_writes.extend(writes);
                true
            }
            None => false,
        }
    }

    /// Number of threads
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Number of checkpoints across all threads
    pub fn checkpoint_count(&self) -> usize {
        self.threads.values().map(|records| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

/// Storage backend for the record table
///
/// Every operation moves the whole table. There is no partial or streaming
/// access, and no caching across calls: each `load` reflects the backing
/// store as it is right now.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Read the full table, creating an empty backing store if none exists
    async fn load(&self) -> Result<Table>;

    /// Replace the backing store with `table`
    async fn save(&self, table: &Table) -> Result<()>;

    /// Make sure the backing store exists and is readable
    async fn ensure_exists(&self) -> Result<()> {
        self.load().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(tag: &str) -> CheckpointRecord {
        CheckpointRecord::new(format!("\"{}\"", tag), "{}".to_string(), None)
    }

    #[test]
    fn test_latest_is_max_id() {
        let mut table = Table::new();
        table.insert("t", "0002", record("b"));
        table.insert("t", "0010", record("c"));
        table.insert("t", "0001", record("a"));

        let (id, rec) = table.latest("t").unwrap();
        assert_eq!(id, "0010");
        assert_eq!(rec.checkpoint, "\"c\"");
        assert!(table.latest("missing").is_none());
    }

    #[test]
    fn test_insert_overwrites_and_resets_writes() {
        let mut table = Table::new();
        table.insert("t", "0001", record("a"));
        assert!(table.append_writes(
            "t",
            "0001",
            vec![StoredWrite::from(("task".to_string(), "ch".to_string(), "1".to_string()))],
        ));

        table.insert("t", "0001", record("b"));
        let rec = table.get("t", "0001").unwrap();
        assert_eq!(rec.checkpoint, "\"b\"");
        assert!(rec.pending_writes.is_empty());
        assert_eq!(table.checkpoint_count(), 1);
    }

    #[test]
    fn test_append_writes_missing_target() {
        let mut table = Table::new();
        table.insert("t", "0001", record("a"));
        let before = table.clone();

        assert!(!table.append_writes("t", "0002", Vec::new()));
        assert!(!table.append_writes("other", "0001", Vec::new()));
        assert_eq!(table, before);
    }

    #[test]
    fn test_persisted_layout() {
        let mut table = Table::new();
        table.insert(
            "thread-1",
            "0001",
            CheckpointRecord::new("{\"v\":1}".to_string(), "{}".to_string(), Some("0000".to_string())),
        );
        table.append_writes(
            "thread-1",
            "0001",
            vec![StoredWrite::from(("a".to_string(), "ch".to_string(), "\"v1\"".to_string()))],
        );

        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(
            value,
            json!({
                "thread-1": {
                    "0001": {
                        "checkpoint": "{\"v\":1}",
                        "metadata": "{}",
                        "parent_config": "0000",
                        "pending_writes": [["a", "ch", "\"v1\""]]
                    }
                }
            })
        );

        let restored: Table = serde_json::from_value(value).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_missing_pending_writes_defaults_empty() {
        let raw = json!({
            "t": { "c": { "checkpoint": "{}", "metadata": "{}", "parent_config": null } }
        });
        let table: Table = serde_json::from_value(raw).unwrap();
        assert!(table.get("t", "c").unwrap().pending_writes.is_empty());
        assert_eq!(table.thread_count(), 1);
    }

    #[test]
    fn test_empty_object_is_empty_table() {
        let table: Table = serde_json::from_str("{}").unwrap();
        assert!(table.is_empty());
        assert_eq!(serde_json::to_string(&table).unwrap(), "{}");
    }
}
