//! Error types for the harness
//!
//! Two tiers: fatal errors (configuration, connectivity, fixture) abort the
//! run before or at session establishment; case-scoped errors (provision,
//! validation, transport) are caught at the runner boundary and recorded
//! against the single case. Skips are not errors and never appear here.

use thiserror::Error;

use sonda_api::ApiError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by harness components
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration; fatal before any case executes
    #[error("configuration error: {0}")]
    Config(String),

    /// Reference-vector fixture could not be loaded; fatal
    #[error("fixture {path}: {reason}")]
    Fixture {
        /// Fixture path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Model provisioning failed; scoped to the current case
    #[error("provisioning {model} failed: {source}")]
    Provision {
        /// Model being provisioned
        model: String,
        /// Underlying service error
        #[source]
        source: ApiError,
    },

    /// A remote call failed; scoped to the current case
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A response violated an acceptance criterion; scoped to the current case
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

/// Diagnostic payloads for acceptance-criterion failures
#[derive(Debug, Error)]
pub enum ValidationFailure {
    /// None of the expected terms appeared in the generated text
    #[error("none of {expected:?} found in output: {output:?}")]
    TermsAbsent {
        /// Terms that were searched for
        expected: Vec<String>,
        /// The full received text
        output: String,
    },

    /// No fragment arrived within the idle window
    #[error("generation stalled: no fragment within {idle_ms}ms (received so far: {received:?})")]
    Stalled {
        /// Idle window in milliseconds
        idle_ms: u64,
        /// Text accumulated before the stall
        received: String,
    },

    /// The overall per-call budget elapsed before completion
    #[error("generation exceeded budget of {overall_ms}ms (received so far: {received:?})")]
    BudgetExceeded {
        /// Overall budget in milliseconds
        overall_ms: u64,
        /// Text accumulated before cancellation
        received: String,
    },

    /// The service returned an empty embedding vector
    #[error("zero length embedding response")]
    EmptyEmbedding,

    /// Response and reference vectors have different lengths
    #[error("embedding dimensionality mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Reference vector length
        expected: usize,
        /// Response vector length
        got: usize,
    },

    /// A vector with zero norm cannot be compared
    #[error("{which} vector has zero norm, similarity undefined")]
    ZeroNorm {
        /// Which side was degenerate ("response" or "reference")
        which: &'static str,
    },

    /// Cosine similarity fell below the acceptance threshold
    #[error(
        "similarity {similarity:.6} below threshold {threshold}: expected {expected_prefix:?}, got {got_prefix:?}"
    )]
    LowSimilarity {
        /// Computed cosine similarity
        similarity: f64,
        /// Acceptance threshold
        threshold: f64,
        /// Leading elements of the reference vector
        expected_prefix: Vec<f64>,
        /// Leading elements of the response vector
        got_prefix: Vec<f64>,
    },
}

impl Error {
    /// Whether this error aborts the whole run rather than a single case
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Fixture { .. })
    }
}
