//! Kafka-compatible partitioner
//!
//! Producer implementations use this to pick a destination partition, so
//! that a given key maps to the same partition as it would with the Java
//! client.

use murmur2::{murmur2, KAFKA_SEED};
use rand::Rng;

/// Compute the target partition for a message.
///
/// - If `key` is Some: murmur2 hash with the sign bit masked, modulo
///   `partition_count`. Deterministic for a given key and partition count.
/// - If `key` is None: a random partition.
///
/// `partition_count` must be positive.
pub fn compute_partition(key: Option<&[u8]>, partition_count: i32) -> i32 {
    debug_assert!(partition_count > 0, "partition_count must be positive");

    match key {
        Some(k) => {
            let hash = murmur2(k, KAFKA_SEED);
            ((hash & 0x7fffffff) as i32) % partition_count
        }
        None => rand::thread_rng().gen_range(0..partition_count),
    }
}
