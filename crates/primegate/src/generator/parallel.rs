use crate::{
    Error, PrimeGenerator, Result,
    generator::sieve::{collect_marked, sieve_domain},
};
use std::thread;

/// Default number of chunks (and therefore worker threads) per computation.
pub const DEFAULT_CHUNKS: usize = 6;

/// A segmented Sieve of Eratosthenes that eliminates composites on a fixed
/// number of worker threads.
///
/// The domain `0..=bound` is split into `chunks` contiguous ranges of
/// `ceil((bound + 1) / chunks)` indices. Each worker receives an exclusive
/// `&mut` slice of its own range, so every index has exactly one writer and
/// no lock is taken while clearing. The sieving primes (`<= isqrt(bound)`) are
/// computed up front and shared read-only, which means no worker ever reads a
/// range another worker is writing.
///
/// Workers are scoped threads: [`generate`] joins every one of them before
/// reading the domain, and none outlives the call.
///
/// ## Output
/// Identical to [`Sieve`] for every bound.
///
/// ## Failure
/// If a worker panics, or the OS refuses to spawn one, the whole computation
/// fails with [`Error::ComputationFailure`]. Partially sieved domains are
/// discarded.
///
/// [`generate`]: PrimeGenerator::generate
/// [`Sieve`]: crate::Sieve
#[derive(Clone, Copy, Debug)]
pub struct ParallelSieve {
    chunks: usize,
}

impl Default for ParallelSieve {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNKS)
    }
}

impl ParallelSieve {
    /// Creates a sieve that splits its domain into `chunks` ranges.
    ///
    /// A chunk count of `0` is treated as `1`.
    pub const fn new(chunks: usize) -> Self {
        Self {
            chunks: if chunks == 0 { 1 } else { chunks },
        }
    }

    /// Returns the configured chunk count.
    pub const fn chunks(&self) -> usize {
        self.chunks
    }

    /// Runs the chunked computation with a custom per-chunk elimination
    /// routine.
    ///
    /// `eliminate` receives the chunk slice, the absolute index of its first
    /// element, and the shared sieving primes.
    pub(crate) fn run<F>(&self, bound: u32, eliminate: F) -> Result<Vec<u32>>
    where
        F: Fn(&mut [bool], usize, &[u32]) + Sync,
    {
        if bound < 2 {
            return Ok(Vec::new());
        }

        let len = bound as usize + 1;
        let chunk_size = len.div_ceil(self.chunks);
        let sieving_primes = collect_marked(&sieve_domain(bound.isqrt()));

        let mut domain = vec![true; len];
        domain[0] = false;
        domain[1] = false;

        let outcome = thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.chunks);
            let mut failure = None;

            for (idx, chunk) in domain.chunks_mut(chunk_size).enumerate() {
                let start = idx * chunk_size;
                let primes = sieving_primes.as_slice();
                let eliminate = &eliminate;

                let spawned = thread::Builder::new()
                    .name(format!("sieve-chunk-{idx}"))
                    .spawn_scoped(s, move || eliminate(chunk, start, primes));

                match spawned {
                    Ok(handle) => handles.push((idx, handle)),
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::error!("Failed to spawn sieve worker {idx}: {_e}");
                        failure = Some(Error::ComputationFailure {
                            reason: format!("failed to spawn worker for chunk {idx}"),
                        });
                        break;
                    }
                }
            }

            // Every spawned worker is joined, even after a failure, so the
            // domain is never observed mid-elimination.
            for (idx, handle) in handles {
                if handle.join().is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Sieve worker for chunk {idx} panicked");
                    failure.get_or_insert(Error::ComputationFailure {
                        reason: format!("worker for chunk {idx} panicked"),
                    });
                }
            }

            failure.map_or(Ok(()), Err)
        });
        outcome?;

        Ok(collect_marked(&domain))
    }
}

/// Clears every composite in `chunk`, whose first element is the absolute
/// index `start`.
///
/// For each sieving prime `p` with `p * p < end`, multiples are cleared from
/// `max(2p, first multiple of p >= start)`.
fn eliminate_chunk(chunk: &mut [bool], start: usize, sieving_primes: &[u32]) {
    let end = start + chunk.len();
    for &p in sieving_primes {
        let p = p as usize;
        if p * p >= end {
            break;
        }
        let first = (2 * p).max(start.div_ceil(p) * p);
        for i in (first..end).step_by(p) {
            chunk[i - start] = false;
        }
    }
}

impl PrimeGenerator for ParallelSieve {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self), fields(chunks = self.chunks)))]
    fn generate(&self, bound: u32) -> Result<Vec<u32>> {
        self.run(bound, eliminate_chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sieve;

    #[test]
    fn zero_chunks_behaves_as_one() {
        let sieve = ParallelSieve::new(0);
        assert_eq!(sieve.chunks(), 1);
        assert_eq!(sieve.generate(30).unwrap(), Sieve.generate(30).unwrap());
    }

    #[test]
    fn more_chunks_than_indices() {
        // 4 indices across 16 requested chunks -> chunk size 1, 4 workers.
        let sieve = ParallelSieve::new(16);
        assert_eq!(sieve.generate(3).unwrap(), vec![2, 3]);
    }

    #[test]
    fn chunk_boundaries_on_prime_squares() {
        // bound + 1 = 50, 5 chunks of 10: boundaries at 10, 20, 30, 40 so 49
        // (7 * 7) sits in the last chunk and 25 in the third.
        let sieve = ParallelSieve::new(5);
        assert_eq!(sieve.generate(49).unwrap(), Sieve.generate(49).unwrap());
    }

    #[test]
    fn worker_panic_fails_whole_computation() {
        let sieve = ParallelSieve::new(4);
        let result = sieve.run(1_000, |chunk, start, primes| {
            if start > 0 && start < 300 {
                panic!("injected failure");
            }
            eliminate_chunk(chunk, start, primes);
        });

        match result {
            Err(Error::ComputationFailure { reason }) => {
                assert!(reason.contains("panicked"), "unexpected reason: {reason}");
            }
            other => panic!("expected ComputationFailure, got {other:?}"),
        }
    }
}
