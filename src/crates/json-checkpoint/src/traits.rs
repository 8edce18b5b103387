//! Checkpoint storage trait used by the workflow engine
//!
//! [`CheckpointSaver`] is the whole contract between an execution engine and a
//! checkpoint backend: `put`, `get_tuple`, `list`, and `put_writes`. All
//! methods are async; [`BlockingCheckpointSaver`](crate::BlockingCheckpointSaver)
//! drives any implementation to completion for synchronous callers.
//!
//! # Lifecycle of a thread
//!
//! ```text
//!  put(thread=t, parent=None)      -> { t, c1 }
//!  put_writes({ t, c1 }, task=a)   -> c1.pending_writes = [(a, ..)]
//!  put({ t, c1 }, ..)              -> { t, c2 }   (c2.parent = c1)
//!  get_tuple({ t })                -> c2          (greatest id wins)
//!  list({ t }, limit=1)            -> [c2]        (newest first)
//! ```
//!
//! Threads come into existence on their first `put`. Checkpoints are never
//! deleted.

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    error::Result,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// Type alias for async stream of checkpoint tuples
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send + 'static>>;

/// Core trait for checkpoint storage backends
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so one saver can be shared by
/// concurrent graph executions. Sharing does not imply the writes are
/// serialized; see the implementation's documentation.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch just the checkpoint for `config`
    ///
    /// # Returns
    ///
    /// The requested checkpoint, or `None` if not found
    async fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        Ok(self.get_tuple(config).await?.map(|tuple| tuple.checkpoint))
    }

    /// Retrieve a complete checkpoint tuple.
    ///
    /// * With `checkpoint_id` set: that exact checkpoint.
    /// * Without it: the **latest** checkpoint of the thread, i.e. the one
    ///   with the greatest id under string ordering.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(CheckpointTuple))` - Checkpoint found and decoded
    /// - `Ok(None)` - Unknown thread or checkpoint (never an error)
    /// - `Err` - Storage or decode failure
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// Stream checkpoints, newest first within each thread.
    ///
    /// # Arguments
    ///
    /// * `config` - Restrict to `config.thread_id` when set; otherwise every
    ///   thread is visited in thread-id order
    /// * `filter` - Keep only checkpoints whose metadata contains every
    ///   key/value pair given
    /// * `before` - Keep only checkpoints whose id is strictly less than
    ///   `before.checkpoint_id`
    /// * `limit` - Stop after this many checkpoints in total, across threads
    ///
    /// The backing store is read once, when `list` is called. The stream is
    /// finite and cannot be restarted; call `list` again to observe newer
    /// writes.
    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream>;

    /// Store a checkpoint.
    ///
    /// `config.thread_id` is required. `config.checkpoint_id`, when present,
    /// is recorded as the **parent** of the new checkpoint. A checkpoint with
    /// the same `(thread_id, checkpoint.id)` is replaced, pending writes
    /// included.
    ///
    /// # Returns
    ///
    /// A config addressing the stored checkpoint, ready to be passed as the
    /// parent of the next `put`.
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig>;

    /// Append intermediate writes produced by `task_id` to the checkpoint
    /// addressed by `config`.
    ///
    /// Writes are appended after any existing ones, preserving order. What
    /// happens when the checkpoint does not exist is up to the
    /// implementation.
    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()>;
}
