//! Blocking facade over any [`CheckpointSaver`]
//!
//! Each method drives the corresponding async operation to completion on a
//! private current-thread runtime; no logic lives here. Do not call these
//! methods from inside an async runtime (tokio panics when `block_on` is
//! nested); use the async [`CheckpointSaver`] methods there instead.

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    config::StoreConfig,
    error::Result,
    saver::JsonFileCheckpointSaver,
    traits::CheckpointSaver,
};
use futures::{TryFutureExt, TryStreamExt};
use std::collections::HashMap;
use tokio::runtime::{Builder, Runtime};

/// Synchronous wrapper around a [`CheckpointSaver`]
#[derive(Debug)]
pub struct BlockingCheckpointSaver<C> {
    inner: C,
    runtime: Runtime,
}

impl BlockingCheckpointSaver<JsonFileCheckpointSaver> {
    /// Open (or create) the checkpoint file described by `config`
    pub fn open(config: StoreConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(JsonFileCheckpointSaver::from_config(config))?;
        Ok(Self { inner, runtime })
    }
}

impl<C: CheckpointSaver> BlockingCheckpointSaver<C> {
    /// Wrap an existing saver
    pub fn new(inner: C) -> Result<Self> {
        Ok(Self {
            inner,
            runtime: build_runtime()?,
        })
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// See [`CheckpointSaver::put`]
    pub fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        self.runtime
            .block_on(self.inner.put(config, checkpoint, metadata))
    }

    /// See [`CheckpointSaver::get_tuple`]
    pub fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        self.runtime.block_on(self.inner.get_tuple(config))
    }

    /// See [`CheckpointSaver::get`]
    pub fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        self.runtime.block_on(self.inner.get(config))
    }

    /// See [`CheckpointSaver::put_writes`]
    pub fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.put_writes(config, writes, task_id))
    }

    /// See [`CheckpointSaver::list`]; the stream is collected eagerly and
    /// stops at the first decode error.
    pub fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointTuple>> {
        self.runtime.block_on(
            self.inner
                .list(config, filter, before, limit)
                .and_then(|stream| stream.try_collect()),
        )
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::InMemoryTable, serializer::JsonSerializer};
    use serde_json::json;

    #[test]
    fn test_blocking_round_trip() {
        let saver = BlockingCheckpointSaver::new(JsonFileCheckpointSaver::with_table(
            InMemoryTable::new(),
            JsonSerializer::new(),
        ))
        .unwrap();

        let config = CheckpointConfig::new().with_thread_id("t".to_string());
        let checkpoint = Checkpoint::empty().with_value("count", json!(1));
        let saved = saver
            .put(&config, checkpoint.clone(), CheckpointMetadata::new())
            .unwrap();

        saver
            .put_writes(&saved, vec![("ch".to_string(), json!("v"))], "task".to_string())
            .unwrap();

        let tuple = saver.get_tuple(&config).unwrap().unwrap();
        assert_eq!(tuple.checkpoint, checkpoint);
        assert_eq!(tuple.pending_writes.len(), 1);

        assert_eq!(saver.list(None, None, None, None).unwrap().len(), 1);
        assert_eq!(saver.get(&saved).unwrap(), Some(checkpoint));
    }
}
