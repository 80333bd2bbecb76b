//! Freshness filter over ingested data batches.
//!
//! Searches by `lastUpdated` (optionally for a single beneficiary) would
//! otherwise scan the claims tables. This crate keeps a compact summary of
//! every loaded batch so many of those searches can be answered "empty"
//! without touching the database.
//!
//! HowTo:
//!    * Batches: the ingestion pipeline appends one row per committed batch
//!      to a log (batch id, loaded file id, created instant, touched keys).
//!    * Filters: consecutive batches of one loaded file are summarised by a
//!      [`BatchFilter`], the closed interval of their `created` instants
//!      plus a [`BloomMembership`] of their keys.
//!    * Cache: a [`FilterCache`] is an immutable, time-ordered list of
//!      filters with its first/last batch instants and a transaction time.
//!    * Manager: [`FilterCacheManager`] periodically reads batches past the
//!      cache's last batch, builds filters for them, and atomically swaps
//!      in an extended cache.
//!
//! Query:
//!     * A range is "in bounds" when it has a lower bound and overlaps the
//!       cache's `[first_batch_created, last_batch_created]`.
//!     * A result set is provably empty when the range is in bounds and
//!       every overlapping filter's membership rules the key out.
//!
//! Guarantees:
//!     * No false negatives: an "empty" answer is always correct.
//!     * False positives only cost an extra database query.
//!     * Readers never block and never see a half-built cache.

pub mod batch;
pub mod bloom;
pub mod cache;
pub mod common;
mod error;
mod hash;
pub mod manager;
pub mod range;

pub use batch::{BatchFilter, LoadedBatch};
pub use bloom::{
    BloomMembership, KeyMembership, MembershipConfig, MembershipConfigBuilder,
    MembershipStats,
};
pub use cache::{FilterCache, build_filters};
pub use error::{FilterError, Result};
pub use hash::{
    HashFunction, default_hash_function, optimal_bit_vector_size,
    optimal_num_hashes,
};
pub use manager::{
    FilterCacheManager, FilterManagerConfig, FilterManagerConfigBuilder,
    FilterManagerConfigBuilderError, InMemoryIngestionLog, IngestionLog,
    RefreshOutcome, spawn_refresher,
};
pub use range::DateRange;
