use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use primegate::{
    Config, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_CHUNKS, DEFAULT_GATE_CAPACITY,
    DEFAULT_MAX_BOUND, DEFAULT_MAX_REQUESTS, DEFAULT_MIN_INTERVAL, DEFAULT_WINDOW,
};

/// Runtime configuration for the `primegate-server` binary.
///
/// Every value is parsed from CLI arguments or environment variables (a
/// `.env` file in the working directory is loaded first), with defaults that
/// match the library's.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "primegate-server",
    version,
    about = "An HTTP service for computing primes up to a bound"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Requests one client may make within a rate-limit window.
    ///
    /// Environment variable: `MAX_REQUESTS`
    #[arg(long, env = "MAX_REQUESTS", default_value_t = DEFAULT_MAX_REQUESTS)]
    pub max_requests: u64,

    /// Length of the rate-limit window, in seconds.
    ///
    /// Environment variable: `WINDOW_SECS`
    #[arg(long, env = "WINDOW_SECS", default_value_t = DEFAULT_WINDOW.as_secs())]
    pub window_secs: u64,

    /// Minimum time between two requests of one client, in milliseconds.
    ///
    /// Environment variable: `MIN_INTERVAL_MS`
    #[arg(long, env = "MIN_INTERVAL_MS", default_value_t = DEFAULT_MIN_INTERVAL.as_millis() as u64)]
    pub min_interval_ms: u64,

    /// Largest range a client may request.
    ///
    /// Environment variable: `MAX_BOUND`
    #[arg(long, env = "MAX_BOUND", default_value_t = DEFAULT_MAX_BOUND)]
    pub max_bound: u32,

    /// Worker threads used by the parallel sieve.
    ///
    /// Environment variable: `NUM_CHUNKS`
    #[arg(long, env = "NUM_CHUNKS", default_value_t = DEFAULT_CHUNKS)]
    pub num_chunks: usize,

    /// Memoized prime lists kept at most.
    ///
    /// Environment variable: `CACHE_CAPACITY`
    #[arg(long, env = "CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    /// Lifetime of a memoized prime list, in seconds.
    ///
    /// Environment variable: `CACHE_TTL_SECS`
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    pub cache_ttl_secs: u64,

    /// Client identities tracked by the throttle and the rate limiter.
    ///
    /// Environment variable: `GATE_CAPACITY`
    #[arg(long, env = "GATE_CAPACITY", default_value_t = DEFAULT_GATE_CAPACITY)]
    pub gate_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub service: Config,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_chunks == 0 {
            bail!("NUM_CHUNKS must be greater than 0");
        }
        if args.max_requests == 0 {
            bail!("MAX_REQUESTS must be greater than 0");
        }
        if args.max_bound == 0 {
            bail!("MAX_BOUND must be greater than 0");
        }
        if args.window_secs == 0 {
            bail!("WINDOW_SECS must be greater than 0");
        }
        if args.cache_capacity == 0 || args.gate_capacity == 0 {
            bail!(
                "CACHE_CAPACITY ({}) and GATE_CAPACITY ({}) must be greater than 0",
                args.cache_capacity,
                args.gate_capacity
            );
        }

        Ok(Self {
            server_addr: args.server_addr,
            service: Config {
                max_requests: args.max_requests,
                window: Duration::from_secs(args.window_secs),
                min_interval: Duration::from_millis(args.min_interval_ms),
                gate_capacity: args.gate_capacity,
                max_bound: args.max_bound,
                chunks: args.num_chunks,
                cache_capacity: args.cache_capacity,
                cache_ttl: Duration::from_secs(args.cache_ttl_secs),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let args = CliArgs::try_parse_from(["primegate-server"].iter().chain(extra))?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn defaults_match_the_library() {
        let config = parse(&["--server-addr", "127.0.0.1:0"]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:0");
        assert_eq!(config.service, Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse(&[
            "--max-requests",
            "10",
            "--min-interval-ms",
            "250",
            "--max-bound",
            "5000",
            "--num-chunks",
            "3",
        ])
        .unwrap();

        assert_eq!(config.service.max_requests, 10);
        assert_eq!(config.service.min_interval, Duration::from_millis(250));
        assert_eq!(config.service.max_bound, 5000);
        assert_eq!(config.service.chunks, 3);
    }

    #[test]
    fn zero_values_are_rejected() {
        for flag in [
            "--num-chunks",
            "--max-requests",
            "--max-bound",
            "--window-secs",
            "--cache-capacity",
            "--gate-capacity",
        ] {
            assert!(parse(&[flag, "0"]).is_err(), "{flag}");
        }
    }

    #[test]
    fn negative_max_bound_does_not_parse() {
        assert!(parse(&["--max-bound", "-1"]).is_err());
    }
}
