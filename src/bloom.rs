//! Bloom membership over record keys
pub mod config;
pub mod filter;
pub mod traits;

pub use config::{MembershipConfig, MembershipConfigBuilder, MembershipParams};
pub use filter::BloomMembership;
pub use traits::{KeyMembership, MembershipStats};
