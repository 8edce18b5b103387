//! # json-checkpoint - Durable Checkpoints in a Single JSON File
//!
//! A checkpoint store for long-running, stateful workflow engines. The engine
//! hands over periodic snapshots of its state; the store persists them so
//! execution can be resumed after an interruption, inspected, replayed, or
//! branched from an earlier point.
//!
//! ## Overview
//!
//! - **Threads** - independent execution lineages, created on first write
//! - **Checkpoints** - immutable snapshots, optionally derived from a parent
//! - **Pending writes** - `(task_id, channel, value)` tuples appended to a
//!   checkpoint before they are folded into the next one
//! - **Latest resolution** - the greatest checkpoint id in a thread
//! - **History** - newest-first listing with `limit`, `before`, and metadata filters
//!
//! ## Storage model
//!
//! ```text
//!  engine ──► CheckpointSaver (JsonFileCheckpointSaver)
//!                 │  load ─ mutate ─ save, every call
//!                 ▼
//!             RetryingTable ── retries loads (3 attempts, 100ms doubling)
//!                 │
//!                 ▼
//!             JsonFileTable ── whole-file JSON, temp file + rename on save
//! ```
//!
//! The entire dataset is read on every operation and rewritten on every write.
//! That keeps the repository stateless and the file always authoritative, at
//! the cost of O(dataset) I/O per call. The [`TableStore`] trait is the seam
//! for swapping in a different backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use json_checkpoint::{
//!     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, JsonFileCheckpointSaver,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let saver = JsonFileCheckpointSaver::new("tmp/checkpoint.json").await?;
//!     let thread = CheckpointConfig::new().with_thread_id("example-thread".to_string());
//!
//!     let first = saver
//!         .put(&thread, Checkpoint::empty().with_value("count", json!(0)), CheckpointMetadata::new().with_step(0))
//!         .await?;
//!     saver
//!         .put_writes(&first, vec![("count".to_string(), json!(1))], "increment".to_string())
//!         .await?;
//!     saver
//!         .put(&first, Checkpoint::empty().with_value("count", json!(1)), CheckpointMetadata::new().with_step(1))
//!         .await?;
//!
//!     let latest = saver.get_tuple(&thread).await?.expect("just written");
//!     assert_eq!(latest.parent_config, Some(first));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`checkpoint`] - [`Checkpoint`], [`CheckpointConfig`], [`CheckpointMetadata`], [`CheckpointTuple`]
//! - [`traits`] - [`CheckpointSaver`] trait and [`CheckpointStream`]
//! - [`saver`] - [`JsonFileCheckpointSaver`], the repository
//! - [`table`] - [`Table`] records and the [`TableStore`] backend trait
//! - [`file`] / [`memory`] - file and in-memory table backends
//! - [`retry`] - bounded exponential backoff for loads
//! - [`blocking`] - synchronous facade
//! - [`config`] - [`StoreConfig`]
//! - [`serializer`] - codec boundary
//! - [`error`] - [`CheckpointError`]

pub mod blocking;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod retry;
pub mod saver;
pub mod serializer;
pub mod table;
pub mod traits;

// Re-export main types
pub use blocking::BlockingCheckpointSaver;
pub use checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointId, CheckpointMetadata, CheckpointSource,
    CheckpointTuple, PendingWrite,
};
pub use config::{PutWritesPolicy, StoreConfig};
pub use error::{CheckpointError, Result};
pub use file::JsonFileTable;
pub use memory::InMemoryTable;
pub use retry::{with_retry, RetryConfig, RetryingTable};
pub use saver::JsonFileCheckpointSaver;
pub use serializer::{JsonSerializer, SerializerProtocol};
pub use table::{CheckpointRecord, StoredWrite, Table, TableStore};
pub use traits::{CheckpointSaver, CheckpointStream};
