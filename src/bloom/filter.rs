use super::{KeyMembership, MembershipConfig, MembershipParams, MembershipStats};
use crate::error::{FilterError, Result};
use crate::hash::HashFunction;
use bitvec::{bitvec, order::Lsb0, vec::BitVec};

/// Fixed-capacity Bloom filter over string record keys.
///
/// Keys are added while a batch filter is being built; afterwards the
/// membership is only read. There is no removal.
#[derive(Clone)]
pub struct BloomMembership {
    params: MembershipParams,
    false_positive_rate: f64,
    hash_function: HashFunction,
    bits: BitVec<usize, Lsb0>,
    insert_count: usize,
}

impl BloomMembership {
    pub fn new(config: &MembershipConfig) -> Result<Self> {
        config.validate()?;

        let params = MembershipParams::from(config);
        let bits = bitvec![usize, Lsb0; 0; params.bit_vector_size];

        Ok(Self {
            params,
            false_positive_rate: config.false_positive_rate,
            hash_function: config.hash_function,
            bits,
            insert_count: 0,
        })
    }

    /// Sized for `expected_insertions` keys at `false_positive_rate`, with
    /// the default hash function.
    pub fn create(
        expected_insertions: usize,
        false_positive_rate: f64,
    ) -> Result<Self> {
        Self::new(&MembershipConfig::new(
            expected_insertions,
            false_positive_rate,
        ))
    }

    /// Builds a membership sized exactly for `keys`.
    pub fn from_keys<I, K>(keys: I, false_positive_rate: f64) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        I::IntoIter: ExactSizeIterator,
        K: AsRef<str>,
    {
        let keys = keys.into_iter();
        let mut membership = Self::create(keys.len(), false_positive_rate)?;
        for key in keys {
            membership.add(key.as_ref());
        }
        Ok(membership)
    }

    pub fn add(&mut self, key: &str) {
        let indices = (self.hash_function)(
            key.as_bytes(),
            self.params.num_hashes,
            self.params.bit_vector_size,
        );
        for idx in indices {
            self.bits.set(idx, true);
        }
        self.insert_count += 1;
    }

    pub fn might_contain(&self, key: &str) -> bool {
        (self.hash_function)(
            key.as_bytes(),
            self.params.num_hashes,
            self.params.bit_vector_size,
        )
        .into_iter()
        .all(|idx| self.bits[idx])
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.params == other.params
            && std::ptr::fn_addr_eq(self.hash_function, other.hash_function)
    }

    /// Whether [`BloomMembership::union`] with `other` would succeed: same
    /// geometry, and the combined insertions still fit the capacity.
    pub fn can_union(&self, other: &Self) -> bool {
        self.is_compatible(other)
            && self.insert_count + other.insert_count <= self.params.capacity
    }

    /// Bitwise OR of two memberships with identical geometry. The result
    /// contains every key either side contains.
    ///
    /// Refused when the combined insertions exceed the capacity the bit
    /// array was sized for, since the union would no longer meet its false
    /// positive rate.
    pub fn union(&self, other: &Self) -> Result<Self> {
        if !self.is_compatible(other) {
            return Err(FilterError::IncompatibleMembership {
                left_bits: self.params.bit_vector_size,
                left_hashes: self.params.num_hashes,
                right_bits: other.params.bit_vector_size,
                right_hashes: other.params.num_hashes,
            });
        }
        let insertions = self.insert_count + other.insert_count;
        if insertions > self.params.capacity {
            return Err(FilterError::MembershipOverCapacity {
                capacity: self.params.capacity,
                insertions,
            });
        }

        let mut bits = self.bits.clone();
        for (word, theirs) in bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *word |= *theirs;
        }

        Ok(Self {
            params: self.params,
            false_positive_rate: self.false_positive_rate,
            hash_function: self.hash_function,
            bits,
            insert_count: insertions,
        })
    }

    pub fn params(&self) -> MembershipParams {
        self.params
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }
}

impl KeyMembership for BloomMembership {
    fn might_contain(&self, key: &str) -> bool {
        BloomMembership::might_contain(self, key)
    }
}

impl MembershipStats for BloomMembership {
    fn bit_size(&self) -> usize {
        self.params.bit_vector_size
    }

    fn num_hashes(&self) -> usize {
        self.params.num_hashes
    }

    fn insert_count(&self) -> usize {
        self.insert_count
    }

    fn cardinality(&self) -> usize {
        self.bits.count_ones()
    }
}

impl std::fmt::Debug for BloomMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BloomMembership {{ bit_size: {}, num_hashes: {}, insert_count: {}, false_positive_rate: {} }}",
            self.params.bit_vector_size,
            self.params.num_hashes,
            self.insert_count,
            self.false_positive_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow() {
        let mut membership = BloomMembership::create(1000, 0.01)
            .expect("Failed to create BloomMembership");

        membership.add("567834");
        membership.add("567835");
        assert!(membership.might_contain("567834"));
        assert!(membership.might_contain("567835"));
        assert!(!membership.might_contain("1"));
        assert_eq!(membership.insert_count(), 2);
    }

    #[test]
    fn test_zero_expected_insertions_is_usable() {
        let membership = BloomMembership::create(0, 0.01)
            .expect("Zero expected insertions must not fail");
        assert_eq!(membership.bit_size(), 10);
        assert_eq!(membership.num_hashes(), 7);
        assert_eq!(membership.cardinality(), 0);
        for key in ["A", "B", "567834", ""] {
            assert!(!membership.might_contain(key));
        }
    }

    #[test]
    fn test_from_keys_has_no_false_negatives() {
        let keys: Vec<String> = (0..500).map(|i| format!("bene-{i}")).collect();
        let membership = BloomMembership::from_keys(&keys, 0.01).unwrap();
        assert_eq!(membership.insert_count(), 500);
        for key in &keys {
            assert!(membership.might_contain(key), "false negative for {key}");
        }
    }

    #[test]
    fn test_union_contains_both_sides() {
        let mut a = BloomMembership::create(100, 0.01).unwrap();
        let mut b = BloomMembership::create(100, 0.01).unwrap();
        a.add("A");
        b.add("B");

        let merged = a.union(&b).unwrap();
        assert!(merged.might_contain("A"));
        assert!(merged.might_contain("B"));
        assert_eq!(merged.insert_count(), 2);
        assert_eq!(merged.params(), a.params());
    }

    #[test]
    fn test_union_rejects_different_geometry() {
        let a = BloomMembership::create(100, 0.01).unwrap();
        let b = BloomMembership::create(1000, 0.01).unwrap();
        assert!(!a.is_compatible(&b));
        assert!(matches!(
            a.union(&b),
            Err(FilterError::IncompatibleMembership { .. })
        ));
    }

    #[test]
    fn test_union_rejects_combined_insertions_over_capacity() {
        let mut a = BloomMembership::create(2, 0.01).unwrap();
        let mut b = BloomMembership::create(2, 0.01).unwrap();
        a.add("A");
        b.add("B");
        assert!(a.can_union(&b));
        let full = a.union(&b).unwrap();

        let mut c = BloomMembership::create(2, 0.01).unwrap();
        c.add("C");
        assert!(!full.can_union(&c));
        assert!(matches!(
            full.union(&c),
            Err(FilterError::MembershipOverCapacity {
                capacity: 2,
                insertions: 3
            })
        ));
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        assert!(BloomMembership::create(10, 0.0).is_err());
        assert!(BloomMembership::create(10, 1.0).is_err());
    }

    #[test]
    fn test_estimated_rate_grows_with_density() {
        let mut membership = BloomMembership::create(100, 0.01).unwrap();
        assert_eq!(membership.estimated_false_positive_rate(), 0.0);
        for i in 0..100 {
            membership.add(&format!("key-{i}"));
        }
        let at_capacity = membership.estimated_false_positive_rate();
        assert!(at_capacity > 0.0 && at_capacity < 0.05);
    }
}
