/// Read-only membership test over record keys.
///
/// Implementations must never report `false` for a key that was added.
pub trait KeyMembership {
    fn might_contain(&self, key: &str) -> bool;
}

pub trait MembershipStats {
    fn bit_size(&self) -> usize;
    fn num_hashes(&self) -> usize;
    fn insert_count(&self) -> usize;
    /// Number of bits currently set
    fn cardinality(&self) -> usize;

    /// Probability that a never-added key is reported present, given the
    /// current bit density.
    fn estimated_false_positive_rate(&self) -> f64 {
        let bits = self.bit_size();
        if bits == 0 {
            return 0.0;
        }
        (self.cardinality() as f64 / bits as f64).powi(self.num_hashes() as i32)
    }
}
