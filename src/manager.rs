//! Owner of the published [`FilterCache`].
//!
//! Readers call [`FilterCacheManager::is_in_bounds`] and
//! [`FilterCacheManager::is_result_set_empty`] on every search; both load
//! the current snapshot without locking. A refresh reads the ingestion
//! log past the cache's last known batch, builds filters for the new
//! batches, and swaps in an extended snapshot in one store.
pub mod config;
pub mod ingestion;
pub mod scheduler;

pub use config::{
    FilterManagerConfig, FilterManagerConfigBuilder,
    FilterManagerConfigBuilderError,
};
pub use ingestion::{InMemoryIngestionLog, IngestionLog};
pub use scheduler::spawn_refresher;

use crate::batch::BatchFilter;
use crate::cache::{FilterCache, build_filters};
use crate::error::{FilterError, Result};
use crate::range::DateRange;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// What a single refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Batches read past the previous watermark
    pub new_batches: usize,
    /// Filters built from them, before compaction
    pub new_filters: usize,
    pub transaction_time: SystemTime,
}

pub struct FilterCacheManager<L> {
    log: L,
    config: FilterManagerConfig,
    cache: ArcSwapOption<FilterCache>,
    // Serialises refreshes; readers never take it
    refresh_lock: tokio::sync::Mutex<()>,
}

impl<L: IngestionLog> FilterCacheManager<L> {
    pub fn new(log: L, config: FilterManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            log,
            config,
            cache: ArcSwapOption::empty(),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Publishes an empty cache whose transaction time is now. Calling it
    /// again keeps the existing cache.
    pub fn init(&self) {
        if self.is_initialized() {
            warn!("batch filter cache already initialized");
            return;
        }
        let now = SystemTime::now();
        self.cache.store(Some(Arc::new(FilterCache::empty(now))));
        info!(transaction_time = ?now, "initialized batch filter cache");
    }

    pub fn is_initialized(&self) -> bool {
        self.cache.load_full().is_some()
    }

    pub fn config(&self) -> &FilterManagerConfig {
        &self.config
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// The cache currently published. It stays consistent for as long as
    /// the caller holds it, regardless of later refreshes.
    pub fn snapshot(&self) -> Result<Arc<FilterCache>> {
        self.cache.load_full().ok_or(FilterError::NotInitialized)
    }

    pub fn transaction_time(&self) -> Result<SystemTime> {
        Ok(self.snapshot()?.transaction_time())
    }

    pub fn first_batch_created(&self) -> Result<Option<SystemTime>> {
        Ok(self.snapshot()?.first_batch_created())
    }

    pub fn last_batch_created(&self) -> Result<Option<SystemTime>> {
        Ok(self.snapshot()?.last_batch_created())
    }

    pub fn filters(&self) -> Result<Vec<Arc<BatchFilter>>> {
        Ok(self.snapshot()?.filters().to_vec())
    }

    /// Whether the range overlaps the window the filters know about. An
    /// empty cache or a range with no lower bound is never in bounds.
    pub fn is_in_bounds(&self, range: Option<&DateRange>) -> Result<bool> {
        Ok(self.snapshot()?.is_in_bounds(range))
    }

    /// `true` proves that no record for `key` changed within `range`;
    /// `false` means the store must be queried.
    pub fn is_result_set_empty(
        &self,
        key: &str,
        range: Option<&DateRange>,
    ) -> Result<bool> {
        Ok(self.snapshot()?.is_result_set_empty(key, range))
    }

    /// Reads batches created after the current cache's last batch and
    /// publishes an extended cache. With nothing new, only the transaction
    /// time advances.
    ///
    /// On error nothing is published and the previous cache stays in
    /// place.
    pub async fn refresh_filters(&self) -> Result<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.snapshot()?;
        let observed = self.observation_instant();
        let after = current.last_batch_created();

        let batches: Vec<_> = self
            .log
            .batches_created_after(after)
            .await?
            .into_iter()
            .filter(|b| after.is_none_or(|after| b.created > after))
            .collect();

        if batches.is_empty() {
            let next = current.observed_at(observed);
            let transaction_time = next.transaction_time();
            self.cache.store(Some(Arc::new(next)));
            debug!(?transaction_time, "no new batches since last refresh");
            return Ok(RefreshOutcome {
                new_batches: 0,
                new_filters: 0,
                transaction_time,
            });
        }

        let new_batches = batches.len();
        info!(
            from = ?after,
            new_batches,
            "Refreshing batch filters with new batches"
        );

        let false_positive_rate = self.config.false_positive_rate;
        let hash_function = self.config.hash_function;
        let filters = tokio::task::spawn_blocking(move || {
            build_filters(batches, false_positive_rate, hash_function)
        })
        .await
        .map_err(|e| FilterError::RefreshTask(e.to_string()))??;
        let new_filters = filters.len();

        let next =
            current.extended(filters, observed, self.config.compact_filters)?;
        debug_assert!(next.verify().is_ok());
        let transaction_time = next.transaction_time();

        info!(
            filters = next.len(),
            new_filters,
            first_batch_created = ?next.first_batch_created(),
            last_batch_created = ?next.last_batch_created(),
            memory = %crate::common::bits2hr(next.memory_bits()),
            "Published batch filter cache"
        );
        self.cache.store(Some(Arc::new(next)));

        Ok(RefreshOutcome {
            new_batches,
            new_filters,
            transaction_time,
        })
    }

    fn observation_instant(&self) -> SystemTime {
        let now = SystemTime::now();
        now.checked_sub(self.config.replica_delay)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

impl<L> std::fmt::Debug for FilterCacheManager<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cache.load_full() {
            Some(cache) => write!(
                f,
                "FilterCacheManager {{ filters: {}, transaction_time: {:?}, first_batch_created: {:?}, last_batch_created: {:?} }}",
                cache.len(),
                cache.transaction_time(),
                cache.first_batch_created(),
                cache.last_batch_created()
            ),
            None => write!(f, "FilterCacheManager {{ uninitialized }}"),
        }
    }
}
