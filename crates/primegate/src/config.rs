use crate::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_CHUNKS, DEFAULT_GATE_CAPACITY,
    DEFAULT_MAX_REQUESTS, DEFAULT_MIN_INTERVAL, DEFAULT_WINDOW, GateConfig,
};
use core::time::Duration;

/// Largest bound accepted by default.
pub const DEFAULT_MAX_BOUND: u32 = 999_999;

/// Every tunable of a [`PrimeService`].
///
/// [`PrimeService`]: crate::PrimeService
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Requests allowed per client per window.
    pub max_requests: u64,
    /// Rate-limit window, also the lifetime of throttle marks.
    pub window: Duration,
    /// Minimum time between two admitted requests of one client.
    pub min_interval: Duration,
    /// Identities tracked by each admission map.
    pub gate_capacity: usize,
    /// Largest accepted bound.
    pub max_bound: u32,
    /// Worker count of the parallel sieve.
    pub chunks: usize,
    /// Memoized prime lists kept at most.
    pub cache_capacity: usize,
    /// Lifetime of a memoized prime list.
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            min_interval: DEFAULT_MIN_INTERVAL,
            gate_capacity: DEFAULT_GATE_CAPACITY,
            max_bound: DEFAULT_MAX_BOUND,
            chunks: DEFAULT_CHUNKS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl Config {
    /// The admission-gate subset of this configuration.
    pub const fn gate(&self) -> GateConfig {
        GateConfig {
            max_requests: self.max_requests,
            window: self.window,
            min_interval: self.min_interval,
            capacity: self.gate_capacity,
        }
    }
}
