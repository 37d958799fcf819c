//! Error types for graph-notes.
//!
//! One enum covers the whole library: authentication failures carry the
//! diagnostic fields the identity service returns, transient fetch failures
//! wrap the underlying network/parse errors, and offline lookups against an
//! unknown section are an explicit variant rather than a panic.

use thiserror::Error;

/// Result type alias for graph-notes operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for graph-notes
#[derive(Debug, Error)]
pub enum Error {
    /// No token could be obtained. Fields are the service-provided
    /// diagnostics; any of them may be absent in the response.
    #[error("authentication failed: {code}: {description}")]
    Auth {
        /// Machine-readable error code (e.g. "authorization_declined")
        code: String,
        /// Human-readable description from the identity service
        description: String,
        /// Correlation id for support lookups
        correlation_id: Option<String>,
    },

    /// The device-code flow expired before the user approved it
    #[error("device code expired before authorization completed")]
    DeviceCodeExpired,

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Malformed JSON in a service response
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// Offline query named a section that is not in the local store
    #[error("section not found in local store: {0}")]
    SectionNotFound(String),

    /// Database operation failed
    #[error("store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error (token cache, log file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
