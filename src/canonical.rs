//! Content hashing for resolution results.
//!
//! [`ResolutionResult::fingerprint`](crate::ResolutionResult::fingerprint)
//! hashes the components in id order and each component's edges as a sorted
//! list of edge hashes, so a streamed result and the same graph built eagerly
//! hash alike whatever order the walk took. Attribute containers are
//! `BTreeMap`-backed and serialize sorted by key.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    // Every type hashed by this crate has string map keys only.
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize + ?Sized>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
