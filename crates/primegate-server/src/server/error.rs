//! HTTP error mapping.
//!
//! [`ApiError`] converts rejections and failures from [`primegate::Error`]
//! into HTTP responses:
//!
//! - Throttled and rate-limited requests get `429 Too Many Requests` with a
//!   plain-text body.
//! - Malformed or out-of-range bounds and malformed query strings get
//!   `400 Bad Request` with an [`ErrorBody`].
//! - Computation failures get `500 Internal Server Error` with an
//!   [`ErrorBody`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

const FORMAT_HINT: &str = "Correct format is /primes/{range} where range is positive integer.";

/// JSON body of `4xx`/`5xx` responses (except `429`).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: String,
    pub url: String,
    pub status_code: u16,
    pub status_name: &'static str,
    pub message: String,
}

/// Unified error type for the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The client sent its previous request too recently.
    #[error("Too many requests too quickly. Please wait.")]
    Throttled,

    /// The client exhausted its requests for the current window.
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited,

    /// The requested range is malformed or out of bounds.
    #[error("{message}")]
    BadRequest { url: String, message: String },

    /// Prime generation failed.
    #[error("{message}")]
    Internal { url: String, message: String },
}

impl ApiError {
    /// The range path segment is not an integer.
    pub fn not_a_number(url: impl Into<String>) -> Self {
        Self::BadRequest {
            url: url.into(),
            message: format!("Provided range is not a number. {FORMAT_HINT}"),
        }
    }

    /// The query string could not be deserialized.
    pub fn bad_query(url: impl Into<String>, detail: impl core::fmt::Display) -> Self {
        Self::BadRequest {
            url: url.into(),
            message: format!("Invalid query string: {detail}"),
        }
    }

    /// The blocking computation task panicked or was cancelled.
    pub fn task_failed(url: impl Into<String>) -> Self {
        Self::Internal {
            url: url.into(),
            message: "Prime computation did not complete".to_owned(),
        }
    }

    /// Maps a library error raised while serving `url`.
    pub fn from_service(err: primegate::Error, url: impl Into<String>) -> Self {
        let url = url.into();
        match err {
            primegate::Error::Throttled { .. } => Self::Throttled,
            primegate::Error::RateLimited { .. } => Self::RateLimited,
            primegate::Error::InvalidBound { value, .. } if value <= 0 => Self::BadRequest {
                url,
                message: format!("Invalid range provided!. {FORMAT_HINT}"),
            },
            primegate::Error::InvalidBound { max, .. } => Self::BadRequest {
                url,
                message: format!(
                    "Range exceeds maximum allowed limit of {max}. Please provide a smaller range value."
                ),
            },
            primegate::Error::ComputationFailure { reason } => Self::Internal {
                url,
                message: format!("Prime computation failed: {reason}"),
            },
            other => Self::Internal {
                url,
                message: other.to_string(),
            },
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Throttled | Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            err @ (Self::Throttled | Self::RateLimited) => (status, err.to_string()).into_response(),
            Self::BadRequest { url, message } | Self::Internal { url, message } => {
                let body = ErrorBody {
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    url,
                    status_code: status.as_u16(),
                    status_name: status.canonical_reason().unwrap_or_default(),
                    message,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
