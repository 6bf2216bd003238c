//! Kafka-compatible partitioner for the simulated broker
//!
//! Picks the partition of a record that arrives without an explicit one,
//! using the `murmur2` crate with `KAFKA_SEED` so that keyed records land
//! where a real Kafka producer would put them.

use murmur2::{murmur2, KAFKA_SEED};
use rand::Rng;

/// Compute the target partition for a record.
///
/// - explicit partition: returned unchanged (the broker validates it)
/// - key present: murmur2 hash, sign bit masked, modulo partition count
/// - no key: uniformly random partition
///
/// `partition_count` must be positive.
pub fn compute_partition(key: Option<&[u8]>, partition_count: i32, explicit: Option<i32>) -> i32 {
    debug_assert!(partition_count > 0, "partition_count must be positive");

    if let Some(partition) = explicit {
        return partition;
    }

    match key {
        // Matches Kafka's Utils.toPositive(Utils.murmur2(key)) % numPartitions
        Some(k) => ((murmur2(k, KAFKA_SEED) & 0x7fffffff) as i32) % partition_count,
        None => rand::thread_rng().gen_range(0..partition_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_explicit_partition_wins_over_key() {
        assert_eq!(compute_partition(Some(b"key"), 5, Some(3)), 3);
        assert_eq!(compute_partition(None, 5, Some(0)), 0);
    }

    #[test]
    fn test_explicit_partition_is_not_clamped() {
        // Out-of-range partitions pass through so the broker can reject them
        assert_eq!(compute_partition(None, 5, Some(9)), 9);
    }

    #[test]
    fn test_keyed_routing_is_deterministic() {
        let first = compute_partition(Some(b"demo-key"), 5, None);
        for _ in 0..10 {
            assert_eq!(compute_partition(Some(b"demo-key"), 5, None), first);
        }
        assert!((0..5).contains(&first));
    }

    #[test]
    fn test_keys_spread_over_partitions() {
        let seen: HashSet<i32> = (0..500)
            .map(|i| compute_partition(Some(format!("key-{}", i).as_bytes()), 5, None))
            .collect();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_keyless_records_stay_in_range() {
        for _ in 0..200 {
            let partition = compute_partition(None, 5, None);
            assert!((0..5).contains(&partition));
        }
    }

    #[test]
    fn test_single_partition_topic() {
        assert_eq!(compute_partition(Some(b"a"), 1, None), 0);
        assert_eq!(compute_partition(None, 1, None), 0);
    }
}
