//! In-memory record table for development and testing
//!
//! [`InMemoryTable`] keeps the table behind an `Arc<RwLock<_>>` instead of a
//! file. It implements [`TableStore`], so a
//! [`JsonFileCheckpointSaver`](crate::JsonFileCheckpointSaver) built on it
//! behaves exactly like the file-backed one, minus durability.
//!
//! Loads hand out a clone of the table and saves replace it wholesale, which
//! keeps the same load-mutate-save semantics (and the same lost-update hazard
//! between unserialized writers) as the file backend.
//!
//! ```rust
//! use json_checkpoint::{InMemoryTable, JsonFileCheckpointSaver, JsonSerializer};
//!
//! let saver = JsonFileCheckpointSaver::with_table(InMemoryTable::new(), JsonSerializer::new());
//! ```

use crate::{
    error::Result,
    table::{Table, TableStore},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory table storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    storage: Arc<RwLock<Table>>,
}

impl InMemoryTable {
    /// Create an empty in-memory table
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing table
    pub fn from_table(table: Table) -> Self {
        Self {
            storage: Arc::new(RwLock::new(table)),
        }
    }

    /// Clear all checkpoints (useful for testing)
    pub async fn clear(&self) {
        *self.storage.write().await = Table::new();
    }
}

#[async_trait]
impl TableStore for InMemoryTable {
    async fn load(&self) -> Result<Table> {
        Ok(self.storage.read().await.clone())
    }

    async fn save(&self, table: &Table) -> Result<()> {
        *self.storage.write().await = table.clone();
        Ok(())
    }
}
