use super::LoadedBatch;
use crate::bloom::{BloomMembership, MembershipConfig, MembershipStats};
use crate::error::{FilterError, Result};
use crate::hash::HashFunction;
use crate::range::DateRange;
use std::time::SystemTime;

/// Summary of a run of batches from one loaded file: the closed interval
/// of their `created` instants plus a Bloom membership of every key they
/// touched.
///
/// `might_have_changed` returning `false` proves that no record with the
/// key changed inside the range within these batches. `true` only means
/// the authoritative store has to be asked.
#[derive(Debug, Clone)]
pub struct BatchFilter {
    batch_id: u64,
    loaded_file_id: u64,
    batch_count: usize,
    created_lower: SystemTime,
    created_upper: SystemTime,
    membership: BloomMembership,
}

impl BatchFilter {
    pub fn new(
        batch_id: u64,
        loaded_file_id: u64,
        batch_count: usize,
        created_lower: SystemTime,
        created_upper: SystemTime,
        membership: BloomMembership,
    ) -> Result<Self> {
        if created_lower > created_upper {
            return Err(FilterError::InvalidRange(format!(
                "filter for batch {batch_id} has created_lower after created_upper"
            )));
        }
        Ok(Self {
            batch_id,
            loaded_file_id,
            batch_count,
            created_lower,
            created_upper,
            membership,
        })
    }

    /// Builds one filter over `batches`, all taken from the same loaded
    /// file. The membership is sized for the total key count of the group.
    pub fn build(
        batches: &[LoadedBatch],
        false_positive_rate: f64,
        hash_function: HashFunction,
    ) -> Result<Self> {
        let first = batches.first().ok_or(FilterError::EmptyBatchGroup)?;

        let expected_insertions = batches.iter().map(|b| b.keys.len()).sum();
        let mut membership = BloomMembership::new(&MembershipConfig {
            expected_insertions,
            false_positive_rate,
            hash_function,
        })?;

        let mut created_lower = first.created;
        let mut created_upper = first.created;
        let mut batch_id = first.batch_id;
        for batch in batches {
            created_lower = created_lower.min(batch.created);
            created_upper = created_upper.max(batch.created);
            batch_id = batch_id.max(batch.batch_id);
            for key in &batch.keys {
                membership.add(key);
            }
        }

        tracing::debug!(
            loaded_file_id = first.loaded_file_id,
            batch_count = batches.len(),
            bit_size = membership.bit_size(),
            num_hashes = membership.num_hashes(),
            cardinality = membership.cardinality(),
            "built batch filter"
        );

        Self::new(
            batch_id,
            first.loaded_file_id,
            batches.len(),
            created_lower,
            created_upper,
            membership,
        )
    }

    /// Whether `[created_lower, created_upper]` overlaps `range`. `None`
    /// matches everything.
    pub fn matches_date_range(&self, range: Option<&DateRange>) -> bool {
        match range {
            None => true,
            Some(range) => range.overlaps(self.created_lower, self.created_upper),
        }
    }

    pub fn might_contain(&self, key: &str) -> bool {
        self.membership.might_contain(key)
    }

    pub fn might_have_changed(&self, key: &str, range: Option<&DateRange>) -> bool {
        self.matches_date_range(range) && self.might_contain(key)
    }

    /// Combines two filters into one spanning both intervals. Only
    /// memberships with identical geometry can be merged.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        let membership = self.membership.union(&other.membership)?;
        Self::new(
            self.batch_id.max(other.batch_id),
            self.loaded_file_id,
            self.batch_count + other.batch_count,
            self.created_lower.min(other.created_lower),
            self.created_upper.max(other.created_upper),
            membership,
        )
    }

    /// Highest batch id summarised by this filter
    pub fn batch_id(&self) -> u64 {
        self.batch_id
    }

    pub fn loaded_file_id(&self) -> u64 {
        self.loaded_file_id
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    pub fn created_lower(&self) -> SystemTime {
        self.created_lower
    }

    pub fn created_upper(&self) -> SystemTime {
        self.created_upper
    }

    pub fn membership(&self) -> &BloomMembership {
        &self.membership
    }
}
