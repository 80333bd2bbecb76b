//! Immutable snapshot of every batch filter known to the manager.
//!
//! A [`FilterCache`] is never changed after construction. Refreshing builds
//! a new cache that reuses the previous filters (shared through `Arc`) and
//! appends the new ones, so a reader holding an older snapshot keeps
//! getting consistent answers.
use crate::batch::{BatchFilter, LoadedBatch};
use crate::error::{FilterError, Result};
use crate::hash::HashFunction;
use crate::range::DateRange;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FilterCache {
    /// Ascending by `created_lower`, intervals never overlap except at a
    /// shared instant
    filters: Vec<Arc<BatchFilter>>,
    first_batch_created: Option<SystemTime>,
    last_batch_created: Option<SystemTime>,
    transaction_time: SystemTime,
    last_batch_id: Option<u64>,
}

impl FilterCache {
    pub fn empty(transaction_time: SystemTime) -> Self {
        Self {
            filters: Vec::new(),
            first_batch_created: None,
            last_batch_created: None,
            transaction_time,
            last_batch_id: None,
        }
    }

    /// Same filters, watermark moved to `observed` unless it already is
    /// later.
    pub fn observed_at(&self, observed: SystemTime) -> Self {
        Self {
            transaction_time: self.transaction_time.max(observed),
            ..self.clone()
        }
    }

    /// A new cache holding the current filters followed by `new_filters`.
    ///
    /// Every new filter must start strictly after `last_batch_created`.
    /// With `compact`, adjacent filters of the same loaded file are merged
    /// when their memberships share a geometry.
    pub fn extended(
        &self,
        new_filters: Vec<BatchFilter>,
        observed: SystemTime,
        compact: bool,
    ) -> Result<Self> {
        let mut new_filters = new_filters;
        new_filters.sort_by_key(|f| (f.created_lower(), f.batch_id()));

        if let (Some(last), Some(first_new)) =
            (self.last_batch_created, new_filters.first())
        {
            if first_new.created_lower() <= last {
                return Err(FilterError::InvalidRange(format!(
                    "filter for batch {} starts at or before the last known batch",
                    first_new.batch_id()
                )));
            }
        }

        let mut filters = self.filters.clone();
        filters.extend(new_filters.into_iter().map(Arc::new));
        if compact {
            filters = compact_filters(filters);
        }

        let first_batch_created = filters.first().map(|f| f.created_lower());
        let last_batch_created = filters.last().map(|f| f.created_upper());
        let last_batch_id = filters.iter().map(|f| f.batch_id()).max();

        Ok(Self {
            filters,
            first_batch_created,
            last_batch_created,
            transaction_time: self.transaction_time.max(observed),
            last_batch_id,
        })
    }

    /// True when the range has a lower bound and overlaps
    /// `[first_batch_created, last_batch_created]`.
    ///
    /// A range without a lower bound is never in bounds: it would also
    /// match records whose last-updated marker was never set, and no
    /// filter knows anything about those.
    pub fn is_in_bounds(&self, range: Option<&DateRange>) -> bool {
        let (Some(range), Some(first), Some(last)) =
            (range, self.first_batch_created, self.last_batch_created)
        else {
            return false;
        };
        range.lower_instant().is_some() && range.overlaps(first, last)
    }

    /// True only when the range is in bounds and every filter overlapping
    /// it rules the key out.
    pub fn is_result_set_empty(&self, key: &str, range: Option<&DateRange>) -> bool {
        if !self.is_in_bounds(range) {
            return false;
        }
        let Some(range) = range else {
            return false;
        };

        // Newest first; once a filter ends before the range starts, all
        // remaining ones do too.
        for filter in self.filters.iter().rev() {
            if filter.matches_date_range(Some(range)) {
                if filter.might_contain(key) {
                    return false;
                }
            } else if range.starts_after(filter.created_upper()) {
                break;
            }
        }
        true
    }

    pub fn filters(&self) -> &[Arc<BatchFilter>] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn first_batch_created(&self) -> Option<SystemTime> {
        self.first_batch_created
    }

    pub fn last_batch_created(&self) -> Option<SystemTime> {
        self.last_batch_created
    }

    pub fn transaction_time(&self) -> SystemTime {
        self.transaction_time
    }

    pub fn last_batch_id(&self) -> Option<u64> {
        self.last_batch_id
    }

    /// Total Bloom bits held by all filters
    pub fn memory_bits(&self) -> usize {
        use crate::bloom::MembershipStats;
        self.filters.iter().map(|f| f.membership().bit_size()).sum()
    }

    /// Checks ordering and bound invariants.
    pub fn verify(&self) -> Result<()> {
        for pair in self.filters.windows(2) {
            if pair[0].created_upper() > pair[1].created_lower() {
                return Err(FilterError::InvalidRange(format!(
                    "filters for batches {} and {} overlap",
                    pair[0].batch_id(),
                    pair[1].batch_id()
                )));
            }
        }
        match (self.first_batch_created, self.last_batch_created) {
            (Some(first), Some(last)) => {
                let bounded = self.filters.iter().all(|f| {
                    first <= f.created_lower() && f.created_upper() <= last
                });
                if !bounded || self.filters.is_empty() {
                    return Err(FilterError::InvalidRange(
                        "batch created bounds do not cover the filters".into(),
                    ));
                }
            }
            (None, None) if self.filters.is_empty() => {}
            _ => {
                return Err(FilterError::InvalidRange(
                    "batch created bounds are inconsistent with the filter list"
                        .into(),
                ));
            }
        }
        Ok(())
    }
}

/// Turns newly read batches into filters: batches are ordered by creation
/// and every consecutive run from one loaded file becomes one filter.
pub fn build_filters(
    mut batches: Vec<LoadedBatch>,
    false_positive_rate: f64,
    hash_function: HashFunction,
) -> Result<Vec<BatchFilter>> {
    batches.sort_by_key(|b| (b.created, b.batch_id));
    batches
        .chunk_by(|a, b| a.loaded_file_id == b.loaded_file_id)
        .map(|run| BatchFilter::build(run, false_positive_rate, hash_function))
        .collect()
}

fn compact_filters(filters: Vec<Arc<BatchFilter>>) -> Vec<Arc<BatchFilter>> {
    let before = filters.len();
    let mut compacted: Vec<Arc<BatchFilter>> = Vec::with_capacity(before);
    for filter in filters {
        if let Some(last) = compacted.last_mut() {
            if last.loaded_file_id() == filter.loaded_file_id()
                && last.membership().can_union(filter.membership())
            {
                if let Ok(merged) = last.merge(&filter) {
                    *last = Arc::new(merged);
                    continue;
                }
            }
        }
        compacted.push(filter);
    }
    if compacted.len() != before {
        debug!(before, after = compacted.len(), "compacted batch filters");
    }
    compacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::default_hash_function;
    use std::time::{Duration, UNIX_EPOCH};

    const SAMPLE_BENE: &str = "567834";
    const INVALID_BENE: &str = "1";

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_600_000_000 + secs)
    }

    fn batch(id: u64, file: u64, secs: u64) -> LoadedBatch {
        LoadedBatch::new(id, file, at(secs), [SAMPLE_BENE])
    }

    fn cache_of(batches: Vec<LoadedBatch>, compact: bool) -> FilterCache {
        let filters = build_filters(batches, 0.01, default_hash_function).unwrap();
        FilterCache::empty(at(0))
            .extended(filters, at(100), compact)
            .unwrap()
    }

    #[test]
    fn test_build_filters_groups_consecutive_runs() {
        let filters = build_filters(
            vec![batch(1, 1, 4), batch(2, 1, 9), batch(3, 2, 14), batch(4, 1, 19)],
            0.01,
            default_hash_function,
        )
        .unwrap();
        let counts: Vec<_> =
            filters.iter().map(|f| (f.loaded_file_id(), f.batch_count())).collect();
        assert_eq!(counts, vec![(1, 2), (2, 1), (1, 1)]);
    }

    #[test]
    fn test_build_filters_empty_input() {
        let filters = build_filters(vec![], 0.01, default_hash_function).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_empty_cache_has_unknown_coverage() {
        let cache = FilterCache::empty(at(0));
        assert!(cache.is_empty());
        assert_eq!(cache.first_batch_created(), None);
        assert_eq!(cache.last_batch_created(), None);
        assert!(!cache.is_in_bounds(Some(&DateRange::since(at(0)))));
        assert!(!cache.is_result_set_empty(SAMPLE_BENE, Some(&DateRange::since(at(0)))));
        assert!(cache.verify().is_ok());
    }

    #[test]
    fn test_extended_bounds_and_watermark() {
        let cache = cache_of(vec![batch(1, 1, 4), batch(2, 2, 9)], false);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.first_batch_created(), Some(at(4)));
        assert_eq!(cache.last_batch_created(), Some(at(9)));
        assert_eq!(cache.last_batch_id(), Some(2));
        assert_eq!(cache.transaction_time(), at(100));
        assert!(cache.verify().is_ok());
    }

    #[test]
    fn test_extended_rejects_filters_inside_known_window() {
        let cache = cache_of(vec![batch(1, 1, 4), batch(2, 2, 9)], false);
        let stale = build_filters(vec![batch(3, 3, 9)], 0.01, default_hash_function).unwrap();
        assert!(cache.extended(stale, at(200), false).is_err());
    }

    #[test]
    fn test_watermark_never_moves_back() {
        let cache = FilterCache::empty(at(50));
        assert_eq!(cache.observed_at(at(10)).transaction_time(), at(50));
        assert_eq!(cache.observed_at(at(60)).transaction_time(), at(60));
    }

    // One-batch filter of file 1 sized for `capacity` keys
    fn roomy_filter(id: u64, secs: u64, key: &str, capacity: usize) -> BatchFilter {
        let mut membership =
            crate::bloom::BloomMembership::create(capacity, 0.01).unwrap();
        membership.add(key);
        BatchFilter::new(id, 1, 1, at(secs), at(secs), membership).unwrap()
    }

    #[test]
    fn test_compaction_merges_same_file_runs_with_spare_capacity() {
        let first = FilterCache::empty(at(0))
            .extended(vec![roomy_filter(1, 4, "A", 3)], at(100), true)
            .unwrap();
        let cache = first
            .extended(
                vec![roomy_filter(2, 9, "B", 3), roomy_filter(3, 14, "C", 3)],
                at(200),
                true,
            )
            .unwrap();

        assert_eq!(cache.len(), 1);
        let only = &cache.filters()[0];
        assert_eq!(only.batch_count(), 3);
        assert_eq!(only.created_lower(), at(4));
        assert_eq!(only.created_upper(), at(14));
        assert!(cache.verify().is_ok());

        // Full now; the next batch gets its own filter
        let cache = cache
            .extended(vec![roomy_filter(4, 19, "D", 3)], at(300), true)
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.filters()[1].batch_count(), 1);
    }

    #[test]
    fn test_compaction_keeps_exactly_sized_filters_apart() {
        let first = cache_of(vec![batch(1, 1, 4)], true);
        let more = build_filters(vec![batch(2, 1, 9)], 0.01, default_hash_function).unwrap();
        let cache = first.extended(more, at(200), true).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.verify().is_ok());
    }

    #[test]
    fn test_compaction_merges_keyless_batches() {
        let keyless = |id, secs| LoadedBatch::new(id, 1, at(secs), Vec::<String>::new());
        let first = cache_of(vec![keyless(1, 4)], true);
        let more =
            build_filters(vec![keyless(2, 9), keyless(3, 14)], 0.01, default_hash_function)
                .unwrap();
        let cache = first.extended(more, at(200), true).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.filters()[0].batch_count(), 3);
        let range = DateRange::closed(at(5), at(10));
        assert!(cache.is_result_set_empty(SAMPLE_BENE, Some(&range)));
    }

    #[test]
    fn test_compaction_disabled_keeps_filters() {
        let first = cache_of(vec![batch(1, 1, 4)], false);
        let more = build_filters(vec![batch(2, 1, 9)], 0.01, default_hash_function).unwrap();
        let cache = first.extended(more, at(200), false).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_result_set_empty_between_files() {
        let cache = cache_of(vec![batch(1, 1, 4), batch(2, 1, 9), batch(3, 2, 14)], false);

        let during = DateRange::closed(at(2), at(3));
        assert!(!cache.is_in_bounds(Some(&during)));

        let gap = DateRange::open(at(9), at(10));
        assert!(cache.is_in_bounds(Some(&gap)));
        assert!(cache.is_result_set_empty(SAMPLE_BENE, Some(&gap)));

        let first_file = DateRange::closed(at(5), at(6));
        assert!(!cache.is_result_set_empty(SAMPLE_BENE, Some(&first_file)));
        assert!(cache.is_result_set_empty(INVALID_BENE, Some(&first_file)));
    }

    #[test]
    fn test_unbounded_lower_is_never_in_bounds() {
        let cache = cache_of(vec![batch(1, 1, 4)], false);
        assert!(!cache.is_in_bounds(None));
        assert!(!cache.is_in_bounds(Some(&DateRange::until(at(10)))));
        assert!(!cache.is_result_set_empty(INVALID_BENE, Some(&DateRange::until(at(10)))));
        assert!(cache.is_in_bounds(Some(&DateRange::closed(at(0), at(10)))));
    }
}
