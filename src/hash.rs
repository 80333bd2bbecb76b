use fnv::FnvHasher;
use murmur3::murmur3_32;
use std::hash::Hasher;
use std::io::Cursor;

/// A type alias for the hash function used by [`crate::BloomMembership`].
///
/// **Parameters:**
///
/// - `item: &[u8]`
///   - A byte slice representing the record key to be hashed.
/// - `num_hashes: usize`
///   - The number of bit positions to compute for the key.
/// - `bit_size: usize`
///   - The length of the membership bit array. Every returned index is
///     in `[0, bit_size)`.
///
/// **Returns:**
///
/// - `Vec<usize>`
///   - One bit index per hash function.
///
/// Two memberships can only be unioned when they were built with the same
/// hash function, so keep it stable across refreshes.
pub type HashFunction = fn(&[u8], usize, usize) -> Vec<usize>;

pub(crate) fn hash_murmur32(key: &[u8]) -> u32 {
    let mut cursor = Cursor::new(key);
    // Reading from an in-memory cursor cannot fail
    murmur3_32(&mut cursor, 0).unwrap_or_default()
}

pub(crate) fn hash_fnv64(key: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.finish()
}

/// Kirsch-Mitzenmacher double hashing over Murmur3 and FNV-1a.
///
/// Arithmetic is 64-bit so bit arrays longer than `u32::MAX` still get
/// uniformly spread indices.
pub fn default_hash_function(
    item: &[u8],
    num_hashes: usize,
    bit_size: usize,
) -> Vec<usize> {
    let h1 = hash_murmur32(item) as u64;
    // Force h2 odd so consecutive probes never collapse onto one bit
    let h2 = hash_fnv64(item) | 1;
    let m = bit_size.max(1) as u64;
    (0..num_hashes as u64)
        .map(|i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
        .collect()
}

/// Bit array length for `n` expected insertions at false positive rate
/// `fpr`: `ceil(-n ln p / ln^2 2)`.
///
/// `n` is clamped to 1 so an empty batch still gets a usable filter.
pub fn optimal_bit_vector_size(n: usize, fpr: f64) -> usize {
    let n = n.max(1) as f64;
    let fpr = if fpr <= 0.0 { f64::MIN_POSITIVE } else { fpr };
    let ln2 = std::f64::consts::LN_2;
    (((-n * fpr.ln()) / (ln2 * ln2)).ceil() as usize).max(1)
}

/// Hash function count `round(m / n * ln 2)`, never below 1.
pub fn optimal_num_hashes(n: usize, m: usize) -> usize {
    let n = n.max(1) as f64;
    (((m as f64 / n) * std::f64::consts::LN_2).round() as usize).max(1)
}
