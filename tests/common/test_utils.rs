#![allow(dead_code)]

use async_trait::async_trait;
use loaded_filter::{
    FilterCacheManager, FilterError, FilterManagerConfig,
    FilterManagerConfigBuilder, InMemoryIngestionLog, IngestionLog,
    LoadedBatch, Result,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::{Duration, SystemTime};

pub const SAMPLE_BENE: &str = "567834";
pub const INVALID_BENE: &str = "1";

/// Base instant for a test: the current time truncated to the second,
/// minus an hour so every offset used in tests lies in the past.
pub fn base_instant() -> SystemTime {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("clock before epoch");
    SystemTime::UNIX_EPOCH + Duration::from_secs(now.as_secs() - 3600)
}

pub fn plus_secs(base: SystemTime, secs: u64) -> SystemTime {
    base + Duration::from_secs(secs)
}

/// Ingestion log that can be switched into a failing state and counts how
/// often it was read.
#[derive(Default)]
pub struct FlakyLog {
    pub inner: InMemoryIngestionLog,
    pub failing: AtomicBool,
    pub reads: AtomicUsize,
}

impl FlakyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, batch: LoadedBatch) {
        self.inner.append(batch).expect("append to test log");
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IngestionLog for FlakyLog {
    async fn batches_created_after(
        &self,
        after: Option<SystemTime>,
    ) -> Result<Vec<LoadedBatch>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FilterError::IngestionLog(
                "connection refused".to_string(),
            ));
        }
        self.inner.batches_created_after(after).await
    }
}

pub fn test_config() -> FilterManagerConfig {
    FilterManagerConfigBuilder::default()
        .compact_filters(false)
        .build()
        .expect("Failed to build test config")
}

/// Initialized manager over a shared flaky log
pub fn create_test_manager() -> (Arc<FlakyLog>, FilterCacheManager<Arc<FlakyLog>>) {
    let log = Arc::new(FlakyLog::new());
    let manager = FilterCacheManager::new(log.clone(), test_config())
        .expect("Failed to create test manager");
    manager.init();
    (log, manager)
}
