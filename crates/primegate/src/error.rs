//! Error types for prime generation and admission control.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of a request flowing through the pipeline. The HTTP
//! boundary maps each variant onto a status code; the library itself never
//! retries.
//!
//! ## Error Cases
//! - `InvalidBound`: The requested bound was `<= 0` or above the configured
//!   maximum.
//! - `Throttled`: The client sent a request before the minimum interval since
//!   its previous admitted request had elapsed.
//! - `RateLimited`: The client exhausted its request quota for the current
//!   window.
//! - `ComputationFailure`: A sieve worker panicked or could not be spawned.
//!   No partial result is ever returned.
//!
//! There is no variant for an unrecognized algorithm name: selection falls
//! back to the default strategy instead.

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `primegate` can emit.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The bound is not in `1..=max`.
    #[error("Invalid bound {value}: must be between 1 and {max}")]
    InvalidBound { value: i64, max: u32 },

    /// The client is sending requests faster than the minimum interval.
    #[error("Throttled: {elapsed_ms}ms since last request (minimum {min_interval_ms}ms)")]
    Throttled {
        elapsed_ms: u64,
        min_interval_ms: u64,
    },

    /// The client exceeded the number of requests allowed per window.
    #[error("Rate limited: {count} requests in window (maximum {max})")]
    RateLimited { count: u64, max: u64 },

    /// A worker failed while computing primes.
    #[error("Computation failed: {reason}")]
    ComputationFailure { reason: String },
}

impl Error {
    /// Returns `true` if the error was produced by the admission gate.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_classified() {
        assert!(
            Error::Throttled {
                elapsed_ms: 10,
                min_interval_ms: 1000
            }
            .is_rejection()
        );
        assert!(Error::RateLimited { count: 6, max: 5 }.is_rejection());
        assert!(!Error::InvalidBound { value: 0, max: 10 }.is_rejection());
        assert!(
            !Error::ComputationFailure {
                reason: "boom".into()
            }
            .is_rejection()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = Error::InvalidBound {
            value: -5,
            max: 999_999,
        };
        assert_eq!(
            err.to_string(),
            "Invalid bound -5: must be between 1 and 999999"
        );
    }
}
