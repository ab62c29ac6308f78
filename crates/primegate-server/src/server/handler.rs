//! HTTP entry point for prime generation.
//!
//! Exposes `GET /primes/{range}?algorithm=<name>`. The client's peer IP is
//! its identity for admission control. The admission gate runs before the
//! range or the query string is parsed, so malformed requests still count
//! against the client. Prime generation runs on Tokio's blocking pool.

use crate::server::{
    error::ApiError,
    telemetry::{
        increment_rate_limited, increment_requests, increment_throttled,
        record_computation_duration,
    },
};
use axum::{
    Json, Router,
    extract::{ConnectInfo, OriginalUri, Path, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use primegate::{Error, PrimeService};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::task;

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    service: Arc<PrimeService>,
}

/// Query string of `GET /primes/{range}`.
#[derive(Debug, Default, Deserialize)]
pub struct PrimesQuery {
    pub algorithm: Option<String>,
}

/// Successful response body.
#[derive(Debug, Serialize)]
struct PrimesBody<'a> {
    initial: u32,
    primes: &'a [u32],
}

/// Builds the application router around `service`.
pub fn router(service: Arc<PrimeService>) -> Router {
    Router::new()
        .route("/primes/{range}", get(get_primes))
        .with_state(AppState { service })
}

async fn get_primes(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    Path(range): Path<String>,
    query: Result<Query<PrimesQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    increment_requests();
    let url = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());
    let identity = peer.ip().to_string();

    if let Err(err) = state.service.admit(&identity) {
        match err {
            Error::Throttled { .. } => increment_throttled(),
            Error::RateLimited { .. } => increment_rate_limited(),
            _ => {}
        }
        return Err(ApiError::from_service(err, url));
    }

    let Query(query) = query.map_err(|rejection| {
        tracing::debug!("Rejected query string from {identity}: {rejection}");
        ApiError::bad_query(url.clone(), rejection.body_text())
    })?;

    let Ok(raw_bound) = range.trim().parse::<i64>() else {
        tracing::debug!("Rejected non-numeric range {range:?} from {identity}");
        return Err(ApiError::not_a_number(url));
    };

    let service = Arc::clone(&state.service);
    let started = Instant::now();
    let outcome =
        task::spawn_blocking(move || service.compute(raw_bound, query.algorithm.as_deref())).await;

    let primes = match outcome {
        Ok(Ok(primes)) => primes,
        Ok(Err(err)) => {
            if matches!(err, Error::ComputationFailure { .. }) {
                tracing::error!("Prime computation for {raw_bound} failed: {err}");
            }
            return Err(ApiError::from_service(err, url));
        }
        Err(err) => {
            tracing::error!("Prime computation task for {raw_bound} did not complete: {err}");
            return Err(ApiError::task_failed(url));
        }
    };

    record_computation_duration(
        started.elapsed().as_secs_f64() * 1000.0,
        primes.algorithm.as_str(),
    );

    Ok(Json(PrimesBody {
        initial: primes.bound.get(),
        primes: &primes.primes,
    })
    .into_response())
}
