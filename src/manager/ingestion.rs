use crate::batch::LoadedBatch;
use crate::error::{FilterError, Result};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Read side of the append-only log the ingestion pipeline writes batch
/// metadata to.
#[async_trait]
pub trait IngestionLog: Send + Sync {
    /// Every batch whose `created` is strictly after `after`, or every
    /// batch when `after` is `None`. Order is not significant.
    async fn batches_created_after(
        &self,
        after: Option<SystemTime>,
    ) -> Result<Vec<LoadedBatch>>;
}

#[async_trait]
impl<L: IngestionLog + ?Sized> IngestionLog for Arc<L> {
    async fn batches_created_after(
        &self,
        after: Option<SystemTime>,
    ) -> Result<Vec<LoadedBatch>> {
        (**self).batches_created_after(after).await
    }
}

/// Append-only in-memory log
#[derive(Debug, Default)]
pub struct InMemoryIngestionLog {
    batches: RwLock<Vec<LoadedBatch>>,
}

impl InMemoryIngestionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_batches(batches: Vec<LoadedBatch>) -> Self {
        Self {
            batches: RwLock::new(batches),
        }
    }

    pub fn append(&self, batch: LoadedBatch) -> Result<()> {
        let mut batches = self
            .batches
            .write()
            .map_err(|e| FilterError::IngestionLog(e.to_string()))?;
        batches.push(batch);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let batches = self
            .batches
            .read()
            .map_err(|e| FilterError::IngestionLog(e.to_string()))?;
        Ok(batches.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of batches created within `range` that touched `key`. This
    /// is the authoritative answer the filters approximate.
    pub fn count_changes(
        &self,
        key: &str,
        range: &crate::range::DateRange,
    ) -> Result<usize> {
        let batches = self
            .batches
            .read()
            .map_err(|e| FilterError::IngestionLog(e.to_string()))?;
        Ok(batches
            .iter()
            .filter(|b| range.contains(b.created))
            .filter(|b| b.keys.iter().any(|k| k == key))
            .count())
    }
}

#[async_trait]
impl IngestionLog for InMemoryIngestionLog {
    async fn batches_created_after(
        &self,
        after: Option<SystemTime>,
    ) -> Result<Vec<LoadedBatch>> {
        let batches = self
            .batches
            .read()
            .map_err(|e| FilterError::IngestionLog(e.to_string()))?;
        Ok(batches
            .iter()
            .filter(|b| after.is_none_or(|after| b.created > after))
            .cloned()
            .collect())
    }
}
