use crate::{Algorithm, Bound, ExpiringMap, Result, StrategySelector, TimeSource};
use core::time::Duration;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default maximum number of memoized prime lists.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default lifetime of a memoized prime list: 30 minutes after it was first
/// requested.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// An immutable, cheaply cloneable prime list.
pub type PrimeList = Arc<[u32]>;

/// Per-key result slot. Holding the mutex is what makes a caller the single
/// in-flight computation for that key.
#[derive(Debug, Default)]
struct Slot {
    primes: Mutex<Option<PrimeList>>,
}

impl Slot {
    /// A slot is in use while any caller besides the map holds it, which
    /// covers both the computing caller and everyone waiting on it.
    fn in_use(slot: &Arc<Self>) -> bool {
        Arc::strong_count(slot) > 1 || slot.primes.is_locked()
    }
}

/// Hit/miss counters of a [`ResultCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a stored result.
    pub hits: u64,
    /// Lookups that ran (or retried) the computation.
    pub misses: u64,
}

/// Memoizes prime lists per `(Bound, Algorithm)` with single-flight
/// computation.
///
/// ## Single-flight
/// Each key maps to a slot guarded by a mutex. The first caller for a key
/// computes while holding that mutex; concurrent callers for the same key
/// block on it and then read the stored list, so a key is computed at most
/// once per lifetime of its entry. Callers for different keys never wait on
/// each other. If the computation fails the slot stays empty and the next
/// waiter runs the computation itself.
///
/// ## Eviction
/// Entries expire `ttl` after their result was stored and the cache holds at
/// most `capacity` keys, evicting the oldest entry first (see
/// [`ExpiringMap`]). A slot that is being computed or waited on is never
/// evicted or replaced, so the cache may exceed `capacity` while more keys
/// than that are in flight.
pub struct ResultCache<T>
where
    T: TimeSource<u64>,
{
    entries: ExpiringMap<(Bound, Algorithm), Arc<Slot>>,
    clock: T,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> ResultCache<T>
where
    T: TimeSource<u64>,
{
    /// Creates an empty cache.
    pub fn new(ttl: Duration, capacity: usize, clock: T) -> Self {
        Self {
            entries: ExpiringMap::new(ttl, capacity),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the primes up to `bound` computed by `algorithm`, computing
    /// them with `selector` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the generator's error; nothing is cached in that case.
    pub fn get_or_compute(
        &self,
        bound: Bound,
        algorithm: Algorithm,
        selector: &StrategySelector,
    ) -> Result<PrimeList> {
        self.get_or_compute_with(bound, algorithm, || {
            selector.generator(algorithm).generate(bound.get())
        })
    }

    /// Like [`get_or_compute`], with an explicit computation.
    ///
    /// `compute` runs at most once per live entry across all threads.
    ///
    /// [`get_or_compute`]: ResultCache::get_or_compute
    pub fn get_or_compute_with<F>(
        &self,
        bound: Bound,
        algorithm: Algorithm,
        compute: F,
    ) -> Result<PrimeList>
    where
        F: FnOnce() -> Result<Vec<u32>>,
    {
        let key = (bound, algorithm);
        let now = self.clock.current_millis();
        let slot = self
            .entries
            .get_or_insert_pinned(key, now, Arc::default, Slot::in_use);

        let mut primes = slot.primes.lock();
        if let Some(primes) = primes.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "tracing")]
            tracing::trace!(%bound, %algorithm, "Result cache hit");
            return Ok(Arc::clone(primes));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::debug!(%bound, %algorithm, "Result cache miss, computing");

        let computed: PrimeList = compute()?.into();
        *primes = Some(Arc::clone(&computed));
        // The entry lives `ttl` from the write of the result, not from the
        // creation of its slot.
        self.entries
            .restamp_if(&key, self.clock.current_millis(), |stored| {
                Arc::ptr_eq(stored, &slot)
            });
        Ok(computed)
    }

    /// Returns a snapshot of the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Returns the number of stored keys, including in-flight and expired
    /// ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
