//! Cache Entry Module
//!
//! Defines a single cached payload stamped with its insertion time.

// == Cache Entry ==
/// A stored payload and the time it was written.
///
/// Entries are never mutated; a write under the same key replaces the whole
/// entry, timestamp included.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored payload, never inspected by the cache
    pub payload: V,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped at `now_ms`.
    pub fn new(payload: V, now_ms: u64) -> Self {
        Self {
            payload,
            inserted_at: now_ms,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since insertion.
    ///
    /// A clock reading earlier than the insertion time yields an age of 0.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.inserted_at)
    }

    // == Is Expired ==
    /// Checks if the entry is stale at `now_ms`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is expired.
    /// Freshness holds only while `age < ttl`.
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        self.age_ms(now_ms) >= ttl_ms
    }

    // == Time To Live ==
    /// Returns remaining freshness in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64, ttl_ms: u64) -> u64 {
        ttl_ms.saturating_sub(self.age_ms(now_ms))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: u64 = 3_600_000;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("payload".to_string(), 500);

        assert_eq!(entry.payload, "payload");
        assert_eq!(entry.inserted_at, 500);
        assert!(!entry.is_expired(500, TTL));
    }

    #[test]
    fn test_fresh_until_just_before_ttl() {
        let entry = CacheEntry::new(1u8, 0);
        assert!(!entry.is_expired(TTL - 1, TTL));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(1u8, 0);

        // age == ttl is stale, not fresh
        assert!(entry.is_expired(TTL, TTL), "Entry should be expired at boundary");
        assert!(entry.is_expired(TTL + 1, TTL));
    }

    #[test]
    fn test_clock_behind_insertion_is_fresh() {
        let entry = CacheEntry::new(1u8, 10_000);

        assert_eq!(entry.age_ms(5_000), 0);
        assert!(!entry.is_expired(5_000, TTL));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new(1u8, 1_000);

        assert_eq!(entry.ttl_remaining_ms(1_000, TTL), TTL);
        assert_eq!(entry.ttl_remaining_ms(1_000 + 30_000, TTL), TTL - 30_000);
        assert_eq!(entry.ttl_remaining_ms(1_000 + TTL, TTL), 0);
        assert_eq!(entry.ttl_remaining_ms(u64::MAX, TTL), 0);
    }
}
