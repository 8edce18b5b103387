//! Core checkpoint data structures
//!
//! This module defines the values exchanged between the workflow engine and the
//! store: **[`Checkpoint`]**, **[`CheckpointConfig`]**, **[`CheckpointMetadata`]**,
//! and **[`CheckpointTuple`]**.
//!
//! # Identity and ordering
//!
//! A checkpoint is identified by `(thread_id, checkpoint_id)`. Within a thread,
//! "latest" means the greatest [`CheckpointId`] under plain string ordering, so
//! ids must sort in creation order. [`Checkpoint::new`] mints UUIDv7 ids, whose
//! hyphenated text form sorts by creation time. Engines that bring their own ids
//! only need to keep that property.
//!
//! # Parent links
//!
//! The [`CheckpointConfig`] passed to [`put`](crate::CheckpointSaver::put) names the
//! checkpoint the new one was derived from. The config *returned* by `put` names
//! the new checkpoint, so chaining is simply:
//!
//! ```rust,ignore
//! let first = saver.put(&CheckpointConfig::new().with_thread_id("t".into()), cp1, meta1).await?;
//! let second = saver.put(&first, cp2, meta2).await?; // cp2's parent is cp1
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Checkpoint ID type
pub type CheckpointId = String;

/// Pending write tuple: (task_id, channel, value)
///
/// A write computed by a task against a checkpoint but not yet folded into a
/// later checkpoint's state.
pub type PendingWrite = (String, String, serde_json::Value);

/// Metadata source type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Checkpoint created from an input to invoke/stream/batch
    Input,
    /// Checkpoint created from inside the execution loop
    Loop,
    /// Checkpoint created from a manual state update
    Update,
    /// Checkpoint created as a copy of another checkpoint
    Fork,
}

/// Metadata associated with a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointMetadata {
    /// The source of the checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CheckpointSource>,

    /// The step number of the checkpoint
    /// -1 for the first "input" checkpoint
    /// 0 for the first "loop" checkpoint
    /// n for the nth checkpoint afterwards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i32>,

    /// Additional custom metadata
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CheckpointMetadata {
    /// Create a new checkpoint metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source
    pub fn with_source(mut self, source: CheckpointSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the step number
    pub fn with_step(mut self, step: i32) -> Self {
        self.step = Some(step);
        self
    }

    /// Add custom metadata
    pub fn with_extra(mut self, key: String, value: serde_json::Value) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Check whether every `filter` entry is present with an equal value.
    ///
    /// Keys are matched against the serialized form, so `"source"` and
    /// `"step"` can be filtered on alongside custom keys.
    pub fn matches(&self, filter: &HashMap<String, serde_json::Value>) -> bool {
        if filter.is_empty() {
            return true;
        }
        let serde_json::Value::Object(fields) =
            serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
        else {
            return false;
        };
        filter
            .iter()
            .all(|(key, value)| fields.get(key) == Some(value))
    }
}

/// State snapshot at a given point in time
///
/// The store persists this through the configured codec and never inspects
/// `channel_values`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// The version of the checkpoint format (currently 1)
    pub v: i32,

    /// The ID of the checkpoint (unique and sortable in creation order)
    pub id: CheckpointId,

    /// The timestamp of the checkpoint
    pub ts: DateTime<Utc>,

    /// Engine state at the time of the checkpoint
    pub channel_values: HashMap<String, serde_json::Value>,
}

impl Checkpoint {
    /// Current checkpoint format version
    pub const CURRENT_VERSION: i32 = 1;

    /// Create a new checkpoint with a fresh time-ordered id
    pub fn new(channel_values: HashMap<String, serde_json::Value>) -> Self {
        Self::with_id(Uuid::now_v7().to_string(), channel_values)
    }

    /// Create a checkpoint with a caller-chosen id
    pub fn with_id(id: impl Into<CheckpointId>, channel_values: HashMap<String, serde_json::Value>) -> Self {
        Self {
            v: Self::CURRENT_VERSION,
            id: id.into(),
            ts: Utc::now(),
            channel_values,
        }
    }

    /// Create an empty checkpoint
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Set a single channel value
    pub fn with_value(mut self, channel: impl Into<String>, value: serde_json::Value) -> Self {
        self.channel_values.insert(channel.into(), value);
        self
    }
}

/// Configuration for checkpoint operations
///
/// Doubles as the handle returned by [`put`](crate::CheckpointSaver::put).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Thread ID for grouping related checkpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Specific checkpoint ID to retrieve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,
}

impl CheckpointConfig {
    /// Create a new checkpoint configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Config addressing a single checkpoint
    pub fn for_checkpoint(thread_id: impl Into<String>, checkpoint_id: impl Into<CheckpointId>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            checkpoint_id: Some(checkpoint_id.into()),
        }
    }

    /// Set the thread ID
    pub fn with_thread_id(mut self, thread_id: String) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Set the checkpoint ID
    pub fn with_checkpoint_id(mut self, checkpoint_id: CheckpointId) -> Self {
        self.checkpoint_id = Some(checkpoint_id);
        self
    }
}

/// A checkpoint together with everything stored alongside it
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointTuple {
    /// Configuration for this checkpoint
    pub config: CheckpointConfig,

    /// The checkpoint itself
    pub checkpoint: Checkpoint,

    /// Metadata associated with the checkpoint
    pub metadata: CheckpointMetadata,

    /// Parent configuration (if any)
    pub parent_config: Option<CheckpointConfig>,

    /// Writes attached to this checkpoint, in insertion order
    pub pending_writes: Vec<PendingWrite>,
}

impl CheckpointTuple {
    /// Create a new checkpoint tuple
    pub fn new(
        config: CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Self {
        Self {
            config,
            checkpoint,
            metadata,
            parent_config: None,
            pending_writes: Vec::new(),
        }
    }

    /// Set the parent configuration
    pub fn with_parent_config(mut self, parent_config: CheckpointConfig) -> Self {
        self.parent_config = Some(parent_config);
        self
    }

    /// Set the pending writes
    pub fn with_pending_writes(mut self, pending_writes: Vec<PendingWrite>) -> Self {
        self.pending_writes = pending_writes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_creation() {
        let checkpoint = Checkpoint::empty();
        assert_eq!(checkpoint.v, Checkpoint::CURRENT_VERSION);
        assert!(checkpoint.channel_values.is_empty());
    }

    #[test]
    fn test_generated_ids_sort_in_creation_order() {
        let ids: Vec<CheckpointId> = (0..50).map(|_| Checkpoint::empty().id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_checkpoint_metadata() {
        let metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Input)
            .with_step(-1)
            .with_extra("key".to_string(), json!("value"));

        assert_eq!(metadata.source, Some(CheckpointSource::Input));
        assert_eq!(metadata.step, Some(-1));
        assert_eq!(metadata.extra.get("key"), Some(&json!("value")));
    }

    #[test]
    fn test_metadata_filter_matching() {
        let metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Loop)
            .with_step(3)
            .with_extra("writer".to_string(), json!("planner"));

        let mut filter = HashMap::new();
        assert!(metadata.matches(&filter));

        filter.insert("source".to_string(), json!("loop"));
        filter.insert("writer".to_string(), json!("planner"));
        assert!(metadata.matches(&filter));

        filter.insert("step".to_string(), json!(4));
        assert!(!metadata.matches(&filter));

        let mut missing = HashMap::new();
        missing.insert("absent".to_string(), json!(null));
        assert!(!metadata.matches(&missing));
    }

    #[test]
    fn test_checkpoint_config() {
        let config = CheckpointConfig::new()
            .with_thread_id("thread-1".to_string())
            .with_checkpoint_id("checkpoint-1".to_string());

        assert_eq!(config, CheckpointConfig::for_checkpoint("thread-1", "checkpoint-1"));
    }
}
