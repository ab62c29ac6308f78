use crate::{
    AdmissionGate, Algorithm, Bound, CacheStats, Config, MonotonicClock, PrimeList, ResultCache,
    Result, StrategySelector, TimeSource,
};

/// The answer to one admitted, valid request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Primes {
    /// The validated bound.
    pub bound: Bound,
    /// The strategy the list was computed with.
    pub algorithm: Algorithm,
    /// Every prime `<= bound`, ascending.
    pub primes: PrimeList,
}

/// The request pipeline: admission gate, bound validation, strategy
/// selection, then cached computation.
///
/// A `PrimeService` is shared by every request thread. Rejected requests
/// short-circuit at the gate and never touch the selector or the cache.
pub struct PrimeService<T = MonotonicClock>
where
    T: TimeSource<u64> + Clone,
{
    gate: AdmissionGate<T>,
    selector: StrategySelector,
    cache: ResultCache<T>,
    max_bound: u32,
}

impl PrimeService<MonotonicClock> {
    /// Builds a service backed by a fresh [`MonotonicClock`].
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<T> PrimeService<T>
where
    T: TimeSource<u64> + Clone,
{
    /// Builds a service whose gate and cache read time from `clock`.
    pub fn with_clock(config: Config, clock: T) -> Self {
        Self {
            gate: AdmissionGate::new(config.gate(), clock.clone()),
            selector: StrategySelector::new(config.chunks),
            cache: ResultCache::new(config.cache_ttl, config.cache_capacity, clock),
            max_bound: config.max_bound,
        }
    }

    /// Handles one request from `identity` for the primes up to `raw_bound`.
    ///
    /// `algorithm` is matched case-insensitively; absent or unknown names use
    /// the default strategy.
    ///
    /// # Errors
    ///
    /// - [`Error::Throttled`] or [`Error::RateLimited`] from the gate.
    /// - [`Error::InvalidBound`] if `raw_bound` is not in `1..=max_bound`.
    /// - [`Error::ComputationFailure`] if the chosen generator fails.
    ///
    /// [`Error::Throttled`]: crate::Error::Throttled
    /// [`Error::RateLimited`]: crate::Error::RateLimited
    /// [`Error::InvalidBound`]: crate::Error::InvalidBound
    /// [`Error::ComputationFailure`]: crate::Error::ComputationFailure
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub fn handle(&self, identity: &str, raw_bound: i64, algorithm: Option<&str>) -> Result<Primes> {
        self.admit(identity)?;
        self.compute(raw_bound, algorithm)
    }

    /// Runs only the admission gate for `identity`.
    ///
    /// Callers that must reject a request for reasons of their own (a bound
    /// that is not even a number, say) call this first so such requests are
    /// still counted against the client.
    ///
    /// # Errors
    ///
    /// [`Error::Throttled`] or [`Error::RateLimited`].
    ///
    /// [`Error::Throttled`]: crate::Error::Throttled
    /// [`Error::RateLimited`]: crate::Error::RateLimited
    pub fn admit(&self, identity: &str) -> Result<()> {
        self.gate.check(identity)
    }

    /// Validates `raw_bound` and returns the primes up to it, skipping the
    /// admission gate.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBound`] or [`Error::ComputationFailure`].
    ///
    /// [`Error::InvalidBound`]: crate::Error::InvalidBound
    /// [`Error::ComputationFailure`]: crate::Error::ComputationFailure
    pub fn compute(&self, raw_bound: i64, algorithm: Option<&str>) -> Result<Primes> {
        let bound = Bound::new(raw_bound, self.max_bound)?;
        let algorithm = Algorithm::select(algorithm);
        let primes = self.cache.get_or_compute(bound, algorithm, &self.selector)?;

        Ok(Primes {
            bound,
            algorithm,
            primes,
        })
    }

    /// Returns the largest accepted bound.
    pub const fn max_bound(&self) -> u32 {
        self.max_bound
    }

    /// Returns the result cache's hit/miss counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops expired admission state.
    pub fn purge_expired(&self) {
        self.gate.purge_expired();
    }
}
