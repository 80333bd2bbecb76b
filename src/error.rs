use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Filter cache manager has not been initialized")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Failed to parse environment variable {var_name}: value '{value}' - {error}"
    )]
    EnvParseError {
        var_name: String,
        value: String,
        error: String,
    },

    #[error(
        "Cannot union memberships: {left_bits} bits/{left_hashes} hashes vs {right_bits} bits/{right_hashes} hashes"
    )]
    IncompatibleMembership {
        left_bits: usize,
        left_hashes: usize,
        right_bits: usize,
        right_hashes: usize,
    },

    #[error(
        "Cannot union memberships: {insertions} keys exceed a capacity of {capacity}"
    )]
    MembershipOverCapacity { capacity: usize, insertions: usize },

    #[error("A batch filter needs at least one batch")]
    EmptyBatchGroup,

    #[error("Ingestion log error: {0}")]
    IngestionLog(String),

    #[error("Filter build task failed: {0}")]
    RefreshTask(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),
}
