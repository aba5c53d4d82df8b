//! Error types for sonda-api

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors produced by the service client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, DNS, TLS, mid-body)
    #[error("transport error calling {url}: {source}")]
    Transport {
        /// Request URL
        url: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status from the service
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        /// Response status code
        status: u16,
        /// Request URL
        url: String,
        /// Response body (may be empty)
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Request URL
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Error reported inside an otherwise-successful response body
    #[error("service error: {0}")]
    Service(String),

    /// Invalid generation options
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Server process could not be spawned
    #[error("failed to spawn server process `{command}`: {source}")]
    Spawn {
        /// The command that failed to start
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Endpoint never became reachable within the allotted wait
    #[error("service at {endpoint} not reachable within {waited_ms}ms")]
    Unreachable {
        /// Endpoint that was probed
        endpoint: String,
        /// How long the probe loop waited
        waited_ms: u64,
    },
}
