use crate::api::Partitioner;
use crate::constants::DJB2_SEED;

/// djb2 over the key bytes, reduced modulo `num_partitions`.
///
/// Pure and deterministic: the same key and count always map to the same
/// bucket, across threads and across runs.
pub fn default_hash_partition(key: &[u8], num_partitions: usize) -> usize {
    debug_assert!(num_partitions > 0);
    let mut hash = DJB2_SEED;
    for &b in key {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(b));
    }
    (hash % num_partitions as u64) as usize
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHashPartitioner;

impl Partitioner for DefaultHashPartitioner {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize {
        default_hash_partition(key, num_partitions)
    }
}
