//! Common types returned by store operations.

use std::time::Duration;

use serde::Serialize;

/// Remaining lifetime of a key, as reported by [`ExpiringStore::ttl`](crate::ExpiringStore::ttl).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist or has already expired.
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key exists and expires after the given duration.
    Expires(Duration),
}

/// Entry counts for a store, covering live (non-expired) entries only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Total live entries.
    pub total: usize,
    /// Live entries carrying an expiry.
    pub with_expiry: usize,
    /// Live entries without an expiry.
    pub without_expiry: usize,
}
