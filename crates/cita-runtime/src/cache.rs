//! Shared expiring key/value cache.
//!
//! Used for field-validation and backend-availability memoization across
//! sessions. Entries expire lazily on read; a bounded sweep keeps memory
//! in check: when the map grows past its bound, expired entries are
//! dropped first, then oldest-inserted entries until back under the
//! bound. Reads and writes for unrelated keys never contend on a global
//! lock.

use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

/// A cached value with its insertion instant and time-to-live.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > self.ttl
    }
}

/// Concurrent TTL cache, shared across sessions.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Cache with a default TTL and a size bound that triggers sweeping.
    #[must_use]
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Get a value. An entry past its TTL is logically absent: it is
    /// removed on this read and `None` is returned.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        };
        if expired {
            let _ = self.entries.remove(key);
        }
        None
    }

    /// Insert with the default TTL.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL, sweeping if the map grew past its
    /// bound.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let _ = self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        if self.entries.len() > self.max_entries {
            self.sweep();
        }
    }

    /// Drop expired entries; if still over the bound, drop
    /// oldest-inserted entries until back under it.
    pub fn sweep(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let expired = before.saturating_sub(self.entries.len());

        let mut displaced = 0usize;
        if self.entries.len() > self.max_entries {
            let mut by_age: Vec<(K, Instant)> = self
                .entries
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

            let excess = self.entries.len() - self.max_entries;
            for (key, _) in by_age.into_iter().take(excess) {
                let _ = self.entries.remove(&key);
                displaced += 1;
            }
        }
        debug!(expired, displaced, remaining = self.entries.len(), "cache sweep");
    }

    /// Number of entries currently stored (including not-yet-swept
    /// expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn get_returns_fresh_value() {
        let cache: TtlCache<String, String> = TtlCache::new(Duration::from_secs(60), 100);
        cache.put("slot".into(), "free".into());
        assert_eq!(cache.get(&"slot".into()).as_deref(), Some("free"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_absent_and_removed() {
        let cache: TtlCache<String, String> = TtlCache::new(Duration::from_secs(60), 100);
        cache.put("slot".into(), "free".into());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get(&"slot".into()), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entry_ttl_overrides_default() {
        let cache: TtlCache<String, String> = TtlCache::new(Duration::from_secs(60), 100);
        cache.put_with_ttl("long".into(), "v".into(), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(cache.get(&"long".into()).as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_expired_first() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(10), 3);
        cache.put(1, 1);
        cache.put(2, 2);
        tokio::time::advance(Duration::from_secs(11)).await;

        // Two expired entries plus two fresh ones; inserting the fourth
        // triggers a sweep that clears only the expired pair.
        cache.put(3, 3);
        cache.put(4, 4);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&3), Some(3));
        assert_eq!(cache.get(&4), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_displaces_oldest_when_all_fresh() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(600), 2);
        cache.put(1, 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(2, 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(3, 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None, "oldest entry displaced");
        assert_eq!(cache.get(&2), Some(2));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_refreshes_entry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(10), 100);
        cache.put("k".into(), 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("k".into(), 2);
        tokio::time::advance(Duration::from_secs(8)).await;

        // Re-insert reset the clock; the entry is still live.
        assert_eq!(cache.get(&"k".into()), Some(2));
    }
}
