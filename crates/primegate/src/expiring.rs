//! Concurrent map with expire-after-write entries and a capacity bound.
//!
//! [`ExpiringMap`] is the storage primitive behind both halves of the
//! [`AdmissionGate`] and behind the [`ResultCache`]. It is backed by a
//! sharded [`DashMap`], so operations on unrelated keys rarely contend, and
//! every read-modify-write on a single key runs under that key's shard lock.
//!
//! The map does not own a clock: every operation takes `now` in milliseconds,
//! read by the caller from its [`TimeSource`].
//!
//! [`AdmissionGate`]: crate::AdmissionGate
//! [`ResultCache`]: crate::ResultCache
//! [`TimeSource`]: crate::TimeSource

use core::{borrow::Borrow, hash::Hash, time::Duration};
use dashmap::{DashMap, mapref::entry::Entry};

#[derive(Debug)]
struct Stamped<V> {
    value: V,
    written_at: u64,
}

impl<V> Stamped<V> {
    const fn new(value: V, written_at: u64) -> Self {
        Self { value, written_at }
    }

    fn is_live(&self, now: u64, ttl_ms: u64) -> bool {
        now.saturating_sub(self.written_at) < ttl_ms
    }
}

/// A concurrent map whose entries expire a fixed time after they were last
/// written.
///
/// - An entry is live while `now - written_at < ttl`. Expired entries are
///   invisible to readers and are replaced lazily or dropped by
///   [`purge_expired`].
/// - Reads never refresh an entry; only writes re-stamp it.
/// - When a new key arrives while the map holds `capacity` entries, expired
///   entries are purged first; if that is not enough, the entry with the
///   oldest write is evicted. Under concurrent inserts the map may briefly
///   exceed its capacity by the number of racing writers.
/// - [`get_or_insert_pinned`] takes a predicate that marks entries as pinned.
///   Pinned entries are never evicted, purged or replaced; the map exceeds
///   its capacity rather than drop one.
///
/// [`get_or_insert_pinned`]: ExpiringMap::get_or_insert_pinned
/// [`purge_expired`]: ExpiringMap::purge_expired
#[derive(Debug)]
pub struct ExpiringMap<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: DashMap<K, Stamped<V>>,
    ttl_ms: u64,
    capacity: usize,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty map. A `capacity` of `0` is treated as `1`.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms: ttl.as_millis() as u64,
            capacity: capacity.max(1),
        }
    }

    /// Returns the configured time-to-live.
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Returns the configured capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a clone of the live value for `key`, if any.
    pub fn get<Q>(&self, key: &Q, now: u64) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now, self.ttl_ms))
            .map(|entry| entry.value.clone())
    }

    /// Returns the live value for `key`, inserting `init()` stamped with `now`
    /// if the key is absent or expired.
    ///
    /// The lookup and the insert happen atomically with respect to other
    /// operations on the same key, so concurrent callers all observe the same
    /// value.
    pub fn get_or_insert_with(&self, key: K, now: u64, init: impl FnOnce() -> V) -> V {
        self.get_or_insert_pinned(key, now, init, |_| false)
    }

    /// Like [`get_or_insert_with`], but entries for which `pinned` returns
    /// `true` are kept: they are never evicted to make room, and an expired
    /// pinned entry is returned instead of being replaced.
    ///
    /// `pinned` runs while a shard is locked and must not access this map.
    ///
    /// [`get_or_insert_with`]: ExpiringMap::get_or_insert_with
    pub fn get_or_insert_pinned(
        &self,
        key: K,
        now: u64,
        init: impl FnOnce() -> V,
        pinned: impl Fn(&V) -> bool,
    ) -> V {
        self.make_room(&key, now, &pinned);

        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if current.is_live(now, self.ttl_ms) || pinned(&current.value) {
                    entry.get().value.clone()
                } else {
                    let value = init();
                    entry.insert(Stamped::new(value.clone(), now));
                    value
                }
            }
            Entry::Vacant(entry) => {
                let value = init();
                entry.insert(Stamped::new(value.clone(), now));
                value
            }
        }
    }

    /// Atomically reads the live value for `key` and replaces it with the
    /// result of `update`.
    ///
    /// `update` receives `None` if the key is absent or expired. On `Ok` the
    /// returned value is stored and stamped with `now`; on `Err` the map is
    /// left untouched and the error is returned.
    ///
    /// `update` runs while the key's shard is locked and must not access this
    /// map.
    pub fn try_update<E>(
        &self,
        key: K,
        now: u64,
        update: impl FnOnce(Option<&V>) -> Result<V, E>,
    ) -> Result<(), E> {
        self.make_room(&key, now, |_| false);

        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                let current = entry
                    .get()
                    .is_live(now, self.ttl_ms)
                    .then(|| &entry.get().value);
                let value = update(current)?;
                entry.insert(Stamped::new(value, now));
            }
            Entry::Vacant(entry) => {
                let value = update(None)?;
                entry.insert(Stamped::new(value, now));
            }
        }
        Ok(())
    }

    /// Re-stamps the entry for `key` with `now` if `matches` accepts its
    /// value. Returns `true` if the entry was re-stamped.
    ///
    /// `matches` runs while the key's shard is locked and must not access
    /// this map.
    pub fn restamp_if<Q>(&self, key: &Q, now: u64, matches: impl FnOnce(&V) -> bool) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return false;
        };
        if !matches(&entry.value) {
            return false;
        }
        entry.written_at = now;
        true
    }

    /// Drops every entry that has expired at `now`.
    pub fn purge_expired(&self, now: u64) {
        let ttl_ms = self.ttl_ms;
        self.entries.retain(|_, entry| entry.is_live(now, ttl_ms));
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ensures an insert of `key` will not grow the map past its capacity,
    /// unless every remaining entry is pinned.
    ///
    /// Must be called without holding any entry of this map.
    fn make_room(&self, key: &K, now: u64, pinned: impl Fn(&V) -> bool) {
        if self.entries.len() < self.capacity || self.entries.contains_key(key) {
            return;
        }

        let ttl_ms = self.ttl_ms;
        self.entries
            .retain(|_, entry| entry.is_live(now, ttl_ms) || pinned(&entry.value));

        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .filter(|entry| !pinned(&entry.value))
                .min_by_key(|entry| entry.written_at)
                .map(|entry| entry.key().clone());

            let Some(oldest) = oldest else {
                break;
            };
            // Re-checked under the shard lock: the entry may have been pinned
            // since the scan.
            self.entries
                .remove_if(&oldest, |_, entry| !pinned(&entry.value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(100);

    #[test]
    fn entries_expire_after_write() {
        let map = ExpiringMap::new(TTL, 10);
        map.get_or_insert_with("a", 0, || 1);

        assert_eq!(map.get("a", 0), Some(1));
        assert_eq!(map.get("a", 99), Some(1));
        assert_eq!(map.get("a", 100), None);
    }

    #[test]
    fn reads_do_not_refresh() {
        let map = ExpiringMap::new(TTL, 10);
        map.get_or_insert_with("a", 0, || 1);

        assert_eq!(map.get_or_insert_with("a", 90, || 2), 1);
        assert_eq!(map.get("a", 120), None);
    }

    #[test]
    fn expired_entry_is_replaced() {
        let map = ExpiringMap::new(TTL, 10);
        map.get_or_insert_with("a", 0, || 1);

        assert_eq!(map.get_or_insert_with("a", 150, || 2), 2);
        assert_eq!(map.get("a", 200), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn try_update_restamps_on_success() {
        let map = ExpiringMap::new(TTL, 10);

        let seen = map.try_update("a", 0, |prev| {
            assert!(prev.is_none());
            Ok::<_, ()>(10)
        });
        assert!(seen.is_ok());

        map.try_update("a", 80, |prev| Ok::<_, ()>(prev.copied().unwrap_or(0) + 1))
            .unwrap();
        // Re-stamped at 80, so still live at 150.
        assert_eq!(map.get("a", 150), Some(11));
    }

    #[test]
    fn try_update_leaves_value_on_error() {
        let map = ExpiringMap::new(TTL, 10);
        map.try_update("a", 0, |_| Ok::<_, &str>(1)).unwrap();

        let result = map.try_update("a", 50, |_| Err("rejected"));
        assert_eq!(result, Err("rejected"));
        assert_eq!(map.get("a", 50), Some(1));
        // Not re-stamped by the failed update.
        assert_eq!(map.get("a", 100), None);
    }

    #[test]
    fn try_update_sees_expired_as_absent() {
        let map = ExpiringMap::new(TTL, 10);
        map.try_update("a", 0, |_| Ok::<_, ()>(1)).unwrap();

        map.try_update("a", 500, |prev| {
            assert!(prev.is_none());
            Ok::<_, ()>(2)
        })
        .unwrap();
        assert_eq!(map.get("a", 500), Some(2));
    }

    #[test]
    fn capacity_evicts_oldest_write() {
        let map = ExpiringMap::new(Duration::from_secs(60), 3);
        map.get_or_insert_with("a", 0, || 1);
        map.get_or_insert_with("b", 1, || 2);
        map.get_or_insert_with("c", 2, || 3);
        map.get_or_insert_with("d", 3, || 4);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a", 3), None);
        assert_eq!(map.get("b", 3), Some(2));
        assert_eq!(map.get("d", 3), Some(4));
    }

    #[test]
    fn capacity_prefers_purging_expired() {
        let map = ExpiringMap::new(TTL, 2);
        map.get_or_insert_with("old", 0, || 1);
        map.get_or_insert_with("new", 90, || 2);
        map.get_or_insert_with("newer", 110, || 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("new", 110), Some(2));
        assert_eq!(map.get("newer", 110), Some(3));
    }

    #[test]
    fn existing_key_does_not_evict() {
        let map = ExpiringMap::new(Duration::from_secs(60), 2);
        map.get_or_insert_with("a", 0, || 1);
        map.get_or_insert_with("b", 1, || 2);
        map.try_update("a", 2, |_| Ok::<_, ()>(5)).unwrap();

        assert_eq!(map.get("a", 2), Some(5));
        assert_eq!(map.get("b", 2), Some(2));
    }

    #[test]
    fn pinned_entries_survive_capacity_pressure() {
        let map = ExpiringMap::new(Duration::from_secs(60), 2);
        let pinned = |value: &i32| *value < 0;
        map.get_or_insert_pinned("a", 0, || -1, pinned);
        map.get_or_insert_pinned("b", 1, || 2, pinned);
        map.get_or_insert_pinned("c", 2, || 3, pinned);

        assert_eq!(map.get("a", 2), Some(-1));
        assert_eq!(map.get("b", 2), None);
        assert_eq!(map.get("c", 2), Some(3));

        map.get_or_insert_pinned("d", 3, || -4, pinned);
        // Only pinned entries remain, so the map grows instead.
        map.get_or_insert_pinned("e", 4, || 5, pinned);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a", 4), Some(-1));
        assert_eq!(map.get("d", 4), Some(-4));
    }

    #[test]
    fn expired_pinned_entry_is_not_replaced() {
        let map = ExpiringMap::new(TTL, 10);
        map.get_or_insert_pinned("a", 0, || -1, |v: &i32| *v < 0);

        assert_eq!(map.get_or_insert_pinned("a", 500, || 2, |v: &i32| *v < 0), -1);
        assert_eq!(map.get_or_insert_with("a", 500, || 2), 2);
    }

    #[test]
    fn restamp_extends_matching_entries_only() {
        let map = ExpiringMap::new(TTL, 10);
        map.get_or_insert_with("a", 0, || 1);

        assert!(!map.restamp_if("a", 80, |&v| v == 2));
        assert!(map.restamp_if("a", 80, |&v| v == 1));
        assert!(!map.restamp_if("missing", 80, |_| true));
        assert_eq!(map.get("a", 150), Some(1));
        assert_eq!(map.get("a", 180), None);
    }

    #[test]
    fn purge_drops_only_expired() {
        let map = ExpiringMap::new(TTL, 10);
        map.get_or_insert_with("a", 0, || 1);
        map.get_or_insert_with("b", 60, || 2);
        map.purge_expired(120);

        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
        assert_eq!(map.get("b", 120), Some(2));
    }
}
