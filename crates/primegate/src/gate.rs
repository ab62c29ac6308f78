//! Per-client admission control.
//!
//! [`AdmissionGate`] combines two independent checks, each backed by its own
//! [`ExpiringMap`]:
//!
//! 1. **Throttle** - a minimum interval between consecutive admitted requests
//!    of one client, tracked as a last-access timestamp.
//! 2. **Rate limit** - a maximum number of requests per window, tracked as an
//!    atomic counter created on the client's first request of the window.
//!
//! The two maps expire independently, so a client can pass the throttle check
//! and still be rejected by the rate limit in the same request.

use crate::{Error, ExpiringMap, Result, TimeSource};
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default number of requests allowed per client per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 5;

/// Default rate-limit window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default minimum interval between two requests of one client.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Default number of client identities tracked by each map.
pub const DEFAULT_GATE_CAPACITY: usize = 1000;

/// Tuning knobs of an [`AdmissionGate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateConfig {
    /// Requests allowed per client within one `window`.
    pub max_requests: u64,
    /// Lifetime of a rate counter and of a last-access mark.
    pub window: Duration,
    /// Minimum time between two admitted requests of one client.
    pub min_interval: Duration,
    /// Maximum number of identities tracked by each map.
    pub capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            min_interval: DEFAULT_MIN_INTERVAL,
            capacity: DEFAULT_GATE_CAPACITY,
        }
    }
}

/// Decides whether a client's request may proceed to computation.
///
/// All state is shared across request threads. The gate never blocks beyond
/// the time needed to perform its own map operations.
pub struct AdmissionGate<T>
where
    T: TimeSource<u64>,
{
    last_access: ExpiringMap<String, u64>,
    rate_counters: ExpiringMap<String, Arc<AtomicU64>>,
    max_requests: u64,
    min_interval_ms: u64,
    clock: T,
}

impl<T> AdmissionGate<T>
where
    T: TimeSource<u64>,
{
    /// Creates a gate with empty state.
    pub fn new(config: GateConfig, clock: T) -> Self {
        Self {
            last_access: ExpiringMap::new(config.window, config.capacity),
            rate_counters: ExpiringMap::new(config.window, config.capacity),
            max_requests: config.max_requests,
            min_interval_ms: config.min_interval.as_millis() as u64,
            clock,
        }
    }

    /// Runs the throttle check and then the rate-limit check for `identity`.
    ///
    /// # Errors
    ///
    /// - [`Error::Throttled`] if the previous admitted request of `identity`
    ///   was less than the minimum interval ago. The stored mark is left as
    ///   is and the rate counter is not touched.
    /// - [`Error::RateLimited`] if this request pushes the window's count past
    ///   the maximum. The count keeps the increment.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub fn check(&self, identity: &str) -> Result<()> {
        let now = self.clock.current_millis();
        self.check_throttle(identity, now)?;
        self.check_rate_limit(identity, now)
    }

    fn check_throttle(&self, identity: &str, now: u64) -> Result<()> {
        let min_interval_ms = self.min_interval_ms;

        self.last_access
            .try_update(identity.to_owned(), now, |mark| match mark {
                Some(&mark) if now.saturating_sub(mark) < min_interval_ms => {
                    Err(Error::Throttled {
                        elapsed_ms: now.saturating_sub(mark),
                        min_interval_ms,
                    })
                }
                _ => Ok(now),
            })
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Throttled request from {identity}: {_e}");
            })
    }

    fn check_rate_limit(&self, identity: &str, now: u64) -> Result<()> {
        let counter = self.rate_counters.get_or_insert_with(identity.to_owned(), now, || {
            Arc::new(AtomicU64::new(0))
        });

        let count = counter.fetch_add(1, Ordering::AcqRel) + 1;
        if count > self.max_requests {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Rate limit exceeded for {identity} ({count}/{})",
                self.max_requests
            );
            return Err(Error::RateLimited {
                count,
                max: self.max_requests,
            });
        }
        Ok(())
    }

    /// Returns the number of requests counted for `identity` in its current
    /// window, or `0` if it has none.
    pub fn request_count(&self, identity: &str) -> u64 {
        let now = self.clock.current_millis();
        self.rate_counters
            .get(identity, now)
            .map_or(0, |counter| counter.load(Ordering::Acquire))
    }

    /// Drops expired throttle marks and rate counters.
    pub fn purge_expired(&self) {
        let now = self.clock.current_millis();
        self.last_access.purge_expired(now);
        self.rate_counters.purge_expired(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::MockTime;
    use std::sync::Barrier;
    use std::thread::scope;

    fn gate(clock: MockTime) -> AdmissionGate<MockTime> {
        AdmissionGate::new(GateConfig::default(), clock)
    }

    #[test]
    fn fresh_identity_gets_five_spaced_requests() {
        let clock = MockTime::default();
        let gate = gate(clock.clone());

        for _ in 0..5 {
            assert_eq!(gate.check("10.0.0.1"), Ok(()));
            clock.advance(1_001);
        }

        assert_eq!(
            gate.check("10.0.0.1"),
            Err(Error::RateLimited { count: 6, max: 5 })
        );
    }

    #[test]
    fn rejected_requests_keep_counting() {
        let clock = MockTime::default();
        let gate = gate(clock.clone());

        for _ in 0..7 {
            let _ = gate.check("10.0.0.1");
            clock.advance(1_000);
        }

        assert_eq!(gate.request_count("10.0.0.1"), 7);
        assert_eq!(
            gate.check("10.0.0.1"),
            Err(Error::RateLimited { count: 8, max: 5 })
        );
    }

    #[test]
    fn quick_second_request_is_throttled() {
        let clock = MockTime::default();
        let gate = gate(clock.clone());

        assert_eq!(gate.check("10.0.0.1"), Ok(()));
        clock.advance(999);
        assert_eq!(
            gate.check("10.0.0.1"),
            Err(Error::Throttled {
                elapsed_ms: 999,
                min_interval_ms: 1_000
            })
        );
        // Throttled requests never reach the rate counter.
        assert_eq!(gate.request_count("10.0.0.1"), 1);
    }

    #[test]
    fn throttle_boundary_is_exclusive() {
        let clock = MockTime::default();
        let gate = gate(clock.clone());

        assert_eq!(gate.check("10.0.0.1"), Ok(()));
        clock.advance(1_000);
        assert_eq!(gate.check("10.0.0.1"), Ok(()));
    }

    #[test]
    fn throttled_request_does_not_move_the_mark() {
        let clock = MockTime::default();
        let gate = gate(clock.clone());

        assert_eq!(gate.check("10.0.0.1"), Ok(()));
        clock.advance(600);
        assert!(gate.check("10.0.0.1").is_err());
        clock.advance(400);
        // 1000ms since the admitted request, only 400ms since the throttled one.
        assert_eq!(gate.check("10.0.0.1"), Ok(()));
    }

    #[test]
    fn identities_are_independent() {
        let gate = gate(MockTime::default());

        assert_eq!(gate.check("10.0.0.1"), Ok(()));
        assert_eq!(gate.check("10.0.0.2"), Ok(()));
        assert!(gate.check("10.0.0.1").is_err());
        assert_eq!(gate.request_count("10.0.0.2"), 1);
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let clock = MockTime::default();
        let gate = gate(clock.clone());

        for _ in 0..6 {
            let _ = gate.check("10.0.0.1");
            clock.advance(1_000);
        }
        assert_eq!(gate.request_count("10.0.0.1"), 6);

        // Counter was created at t=0; the window closes at t=60s.
        clock.advance(60_000 - 6_000);
        assert_eq!(gate.request_count("10.0.0.1"), 0);
        assert_eq!(gate.check("10.0.0.1"), Ok(()));
        assert_eq!(gate.request_count("10.0.0.1"), 1);
    }

    #[test]
    fn throttle_passes_while_rate_limit_rejects() {
        let clock = MockTime::default();
        let config = GateConfig {
            max_requests: 1,
            ..GateConfig::default()
        };
        let gate = AdmissionGate::new(config, clock.clone());

        assert_eq!(gate.check("10.0.0.1"), Ok(()));
        clock.advance(5_000);
        assert_eq!(
            gate.check("10.0.0.1"),
            Err(Error::RateLimited { count: 2, max: 1 })
        );
    }

    #[test]
    fn concurrent_requests_never_lose_increments() {
        const THREADS: usize = 16;
        let config = GateConfig {
            max_requests: 1_000,
            min_interval: Duration::ZERO,
            ..GateConfig::default()
        };
        let gate = AdmissionGate::new(config, MockTime::default());
        let barrier = Barrier::new(THREADS);

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..50 {
                        gate.check("10.0.0.1").unwrap();
                    }
                });
            }
        });

        assert_eq!(gate.request_count("10.0.0.1"), (THREADS * 50) as u64);
    }

    #[test]
    fn concurrent_first_requests_admit_exactly_one() {
        const THREADS: usize = 8;
        let gate = gate(MockTime::default());
        let barrier = Barrier::new(THREADS);

        let admitted = scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        gate.check("10.0.0.1").is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|&ok| ok)
                .count()
        });

        assert_eq!(admitted, 1);
    }
}
