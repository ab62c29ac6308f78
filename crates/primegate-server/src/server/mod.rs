//! HTTP front end for [`primegate`].
//!
//! ## Structure
//!
//! - [`config`] - CLI/environment configuration.
//! - [`error`] - mapping of library errors onto HTTP responses.
//! - [`handler`] - the `/primes/{range}` route.
//! - [`telemetry`] - logging and optional OpenTelemetry metrics.

pub mod config;
pub mod error;
pub mod handler;
pub mod telemetry;
