//! Loaded batches and the per-batch filters built from them
pub mod filter;
pub mod model;

pub use filter::BatchFilter;
pub use model::LoadedBatch;
