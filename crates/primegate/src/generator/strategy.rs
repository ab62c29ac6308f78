use crate::{BruteForce, ParallelSieve, PrimeGenerator, Sieve};
use core::fmt;

/// The closed set of prime generation strategies.
///
/// Names are matched case-insensitively by [`Algorithm::select`]. Anything it
/// does not recognize resolves to [`Algorithm::DEFAULT`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    /// Trial division, see [`BruteForce`].
    BruteForce,
    /// Single-threaded sieve, see [`Sieve`].
    #[default]
    Sieve,
    /// Chunked multi-threaded sieve, see [`ParallelSieve`].
    ParallelSieve,
}

impl Algorithm {
    /// Strategy used when no name, or an unknown name, is supplied.
    pub const DEFAULT: Self = Self::Sieve;

    /// Every strategy, in declaration order.
    pub const ALL: [Self; 3] = [Self::BruteForce, Self::Sieve, Self::ParallelSieve];

    /// Resolves an optional, case-insensitive strategy name.
    ///
    /// Never fails: absent and unrecognized names fall back to
    /// [`Algorithm::DEFAULT`].
    ///
    /// # Example
    ///
    /// ```
    /// use primegate::Algorithm;
    ///
    /// assert_eq!(Algorithm::select(Some("BruteForce")), Algorithm::BruteForce);
    /// assert_eq!(Algorithm::select(Some("quantum")), Algorithm::Sieve);
    /// assert_eq!(Algorithm::select(None), Algorithm::Sieve);
    /// ```
    pub fn select(name: Option<&str>) -> Self {
        let Some(name) = name else {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "Requested strategy is absent, using default strategy ({})",
                Self::DEFAULT
            );
            return Self::DEFAULT;
        };

        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    "Requested strategy {name:?} is invalid, using default strategy ({})",
                    Self::DEFAULT
                );
                Self::DEFAULT
            })
    }

    /// Returns the canonical lowercase name accepted by [`Algorithm::select`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BruteForce => "bruteforce",
            Self::Sieve => "sieveoferatosthenes",
            Self::ParallelSieve => "sieveoferatosthenesinparallel",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an [`Algorithm`] onto a ready-to-use generator.
///
/// The selector owns one instance of each strategy; the parallel sieve is
/// configured with the chunk count supplied at construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrategySelector {
    brute_force: BruteForce,
    sieve: Sieve,
    parallel: ParallelSieve,
}

impl StrategySelector {
    /// Creates a selector whose parallel sieve uses `chunks` workers.
    pub const fn new(chunks: usize) -> Self {
        Self {
            brute_force: BruteForce,
            sieve: Sieve,
            parallel: ParallelSieve::new(chunks),
        }
    }

    /// Returns the generator implementing `algorithm`.
    pub fn generator(&self, algorithm: Algorithm) -> &dyn PrimeGenerator {
        match algorithm {
            Algorithm::BruteForce => &self.brute_force,
            Algorithm::Sieve => &self.sieve,
            Algorithm::ParallelSieve => &self.parallel,
        }
    }

    /// Resolves `name` and returns the chosen strategy with its generator.
    pub fn select(&self, name: Option<&str>) -> (Algorithm, &dyn PrimeGenerator) {
        let algorithm = Algorithm::select(name);
        (algorithm, self.generator(algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_known_names_case_insensitively() {
        assert_eq!(Algorithm::select(Some("bruteforce")), Algorithm::BruteForce);
        assert_eq!(Algorithm::select(Some("BRUTEFORCE")), Algorithm::BruteForce);
        assert_eq!(
            Algorithm::select(Some("SieveOfEratosthenes")),
            Algorithm::Sieve
        );
        assert_eq!(
            Algorithm::select(Some("sieveOfEratosthenesInParallel")),
            Algorithm::ParallelSieve
        );
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(Algorithm::select(None), Algorithm::DEFAULT);
        assert_eq!(Algorithm::select(Some("")), Algorithm::DEFAULT);
        assert_eq!(Algorithm::select(Some("invalid")), Algorithm::DEFAULT);
        assert_eq!(Algorithm::DEFAULT, Algorithm::Sieve);
    }

    #[test]
    fn names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::select(Some(algorithm.as_str())), algorithm);
            assert_eq!(algorithm.to_string(), algorithm.as_str());
        }
    }

    #[test]
    fn selector_dispatches_to_matching_generator() {
        let selector = StrategySelector::new(3);
        for algorithm in Algorithm::ALL {
            let primes = selector.generator(algorithm).generate(10).unwrap();
            assert_eq!(primes, vec![2, 3, 5, 7], "{algorithm}");
        }

        let (algorithm, generator) = selector.select(Some("nope"));
        assert_eq!(algorithm, Algorithm::Sieve);
        assert_eq!(generator.generate(2).unwrap(), vec![2]);
    }
}
