use crate::error::{FilterError, Result};
use crate::hash::{
    HashFunction, default_hash_function, optimal_bit_vector_size,
    optimal_num_hashes,
};
use derive_builder::Builder;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct MembershipConfig {
    /// Number of keys the membership is sized for. Zero is allowed and
    /// sized as a single key.
    #[builder(default = "0")]
    pub expected_insertions: usize,

    /// Target false positive rate (0.0 to 1.0)
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Hash function to use
    #[builder(default = "default_hash_function")]
    pub hash_function: HashFunction,
}

impl MembershipConfig {
    pub fn new(expected_insertions: usize, false_positive_rate: f64) -> Self {
        Self {
            expected_insertions,
            false_positive_rate,
            hash_function: default_hash_function,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "False positive rate must be between 0 and 1, got {}",
                self.false_positive_rate
            )));
        }
        Ok(())
    }
}

/// Derived parameters calculated from MembershipConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipParams {
    pub bit_vector_size: usize,
    pub num_hashes: usize,
    /// Keys the bit array was sized for; past this the false positive
    /// rate exceeds its target
    pub capacity: usize,
}

impl From<&MembershipConfig> for MembershipParams {
    fn from(config: &MembershipConfig) -> Self {
        let bit_vector_size = optimal_bit_vector_size(
            config.expected_insertions,
            config.false_positive_rate,
        );
        let num_hashes =
            optimal_num_hashes(config.expected_insertions, bit_vector_size);

        Self {
            bit_vector_size,
            num_hashes,
            capacity: config.expected_insertions.max(1),
        }
    }
}
