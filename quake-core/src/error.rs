//! Classified error model
//!
//! Every failure of the fetch layer is reduced to exactly one [`ErrorCode`]
//! at the engine boundary. Callers above that boundary only ever see a
//! [`ClassifiedError`] and never re-inspect the transport failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Timeout,
    NetworkError,
    ConnectionError,
    BadRequest,
    Forbidden,
    NotFound,
    RateLimit,
    ServerError,
    HttpError,
    InvalidFormat,
    InvalidGeojson,
    InvalidFeatures,
    UnknownError,
}

impl ErrorCode {
    /// Machine-readable code string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ConnectionError => "CONNECTION_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::InvalidGeojson => "INVALID_GEOJSON",
            ErrorCode::InvalidFeatures => "INVALID_FEATURES",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether a failure with this code may be retried automatically.
    ///
    /// `HttpError` depends on the status code; pass it in `status`.
    pub fn is_retryable(&self, status: Option<u16>) -> bool {
        match self {
            ErrorCode::Timeout
            | ErrorCode::NetworkError
            | ErrorCode::ConnectionError
            | ErrorCode::RateLimit
            | ErrorCode::ServerError => true,
            ErrorCode::HttpError => status.is_some_and(|s| s >= 500),
            ErrorCode::BadRequest
            | ErrorCode::Forbidden
            | ErrorCode::NotFound
            | ErrorCode::InvalidFormat
            | ErrorCode::InvalidGeojson
            | ErrorCode::InvalidFeatures
            | ErrorCode::UnknownError => false,
        }
    }

    /// User-facing message for this code
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "The earthquake feed took too long to respond.",
            ErrorCode::NetworkError => "Network error. Check your internet connection.",
            ErrorCode::ConnectionError => "Could not connect to the earthquake feed.",
            ErrorCode::BadRequest => "The feed rejected the request as malformed.",
            ErrorCode::Forbidden => "Access to the earthquake feed was denied.",
            ErrorCode::NotFound => "The earthquake feed could not be found.",
            ErrorCode::RateLimit => "Too many requests. Please wait before refreshing.",
            ErrorCode::ServerError => "The earthquake feed service is having problems.",
            ErrorCode::HttpError => "The earthquake feed returned an unexpected response.",
            ErrorCode::InvalidFormat => "The feed response was not a valid data object.",
            ErrorCode::InvalidGeojson => "The feed response is not a GeoJSON feature collection.",
            ErrorCode::InvalidFeatures => "The feed response has no usable event list.",
            ErrorCode::UnknownError => "An unexpected error occurred while loading earthquakes.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure that has already been categorized
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} ({code})")]
pub struct ClassifiedError {
    pub code: ErrorCode,
    /// User-facing message
    pub message: String,
    /// Protocol status code, when a response was received
    pub status: Option<u16>,
    pub retryable: bool,
    /// Underlying cause, for logs only
    pub detail: Option<String>,
}

impl ClassifiedError {
    /// Build an error with the code's default message and retryability
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            status: None,
            retryable: code.is_retryable(None),
            detail: None,
        }
    }

    /// Build an error for a response that carried a status code
    pub fn with_status(code: ErrorCode, status: u16) -> Self {
        Self {
            status: Some(status),
            retryable: code.is_retryable(Some(status)),
            ..Self::new(code)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Fallback when an attempt budget ends with no recorded failure
    pub fn retries_exhausted(attempts: u32) -> Self {
        Self::new(ErrorCode::UnknownError)
            .with_detail(format!("MAX_RETRIES_EXCEEDED after {attempts} attempts"))
    }
}

/// Why no response was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoResponseKind {
    /// The request exceeded its deadline
    Timeout,
    /// Connectivity failure (DNS, refused, reset)
    Network,
    /// No response, cause unknown
    Unclassified,
}

/// An unclassified failure as reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawFailure {
    #[error("no response ({kind:?}): {message}")]
    NoResponse { kind: NoResponseKind, message: String },

    #[error("HTTP status {status}")]
    Status { status: u16, message: String },

    #[error("local failure: {0}")]
    Local(String),
}

impl RawFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::NoResponse {
            kind: NoResponseKind::Timeout,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::NoResponse {
            kind: NoResponseKind::Network,
            message: message.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            message: String::new(),
        }
    }
}

/// Map a raw transport failure to exactly one error code.
///
/// Total and deterministic: every input maps to one code, and retryability
/// depends only on that code (plus the status for `HTTP_ERROR`).
pub fn classify_failure(failure: RawFailure) -> ClassifiedError {
    match failure {
        RawFailure::NoResponse { kind, message } => {
            let code = match kind {
                NoResponseKind::Timeout => ErrorCode::Timeout,
                NoResponseKind::Network => ErrorCode::NetworkError,
                NoResponseKind::Unclassified => ErrorCode::ConnectionError,
            };
            ClassifiedError::new(code).with_detail(message)
        }
        RawFailure::Status { status, message } => {
            let code = match status {
                400 => ErrorCode::BadRequest,
                403 => ErrorCode::Forbidden,
                404 => ErrorCode::NotFound,
                429 => ErrorCode::RateLimit,
                500..=504 => ErrorCode::ServerError,
                _ => ErrorCode::HttpError,
            };
            let error = ClassifiedError::with_status(code, status);
            if message.is_empty() {
                error
            } else {
                error.with_detail(message)
            }
        }
        RawFailure::Local(message) => {
            ClassifiedError::new(ErrorCode::UnknownError).with_detail(message)
        }
    }
}

/// Shape problems found while validating a feed document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedValidationError {
    #[error("response is not a structured object: {0}")]
    InvalidFormat(String),

    #[error("expected a FeatureCollection, found {0}")]
    InvalidGeojson(String),

    #[error("features list is missing or not an array")]
    InvalidFeatures,
}

impl From<FeedValidationError> for ClassifiedError {
    fn from(err: FeedValidationError) -> Self {
        let code = match &err {
            FeedValidationError::InvalidFormat(_) => ErrorCode::InvalidFormat,
            FeedValidationError::InvalidGeojson(_) => ErrorCode::InvalidGeojson,
            FeedValidationError::InvalidFeatures => ErrorCode::InvalidFeatures,
        };
        ClassifiedError::new(code).with_detail(err.to_string())
    }
}
