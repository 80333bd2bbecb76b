use crate::common::epoch_millis;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One durably committed unit of ingested data, as recorded in the
/// ingestion log. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedBatch {
    pub batch_id: u64,
    /// The file this batch was loaded from. Consecutive batches of one
    /// file are summarised by a single filter.
    pub loaded_file_id: u64,
    #[serde(with = "epoch_millis")]
    pub created: SystemTime,
    /// Record keys (beneficiary ids) touched by the batch
    #[serde(default)]
    pub keys: Vec<String>,
}

impl LoadedBatch {
    pub fn new<I, K>(
        batch_id: u64,
        loaded_file_id: u64,
        created: SystemTime,
        keys: I,
    ) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            batch_id,
            loaded_file_id,
            created,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}
