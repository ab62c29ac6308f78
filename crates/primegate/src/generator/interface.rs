use crate::Result;

/// A minimal interface for generating primes up to an inclusive bound.
///
/// Implementations must return primes in ascending order without duplicates.
/// A bound below `2` yields an empty sequence.
pub trait PrimeGenerator: Send + Sync {
    /// Returns every prime `p` with `p <= bound`.
    ///
    /// # Errors
    ///
    /// Sequential generators are infallible. Concurrent generators return
    /// [`Error::ComputationFailure`] if a worker fails; no partial result is
    /// returned in that case.
    ///
    /// [`Error::ComputationFailure`]: crate::Error::ComputationFailure
    fn generate(&self, bound: u32) -> Result<Vec<u32>>;
}
