//! Response validators
//!
//! The two assertion algorithms of the harness: substring presence over
//! aggregated generation output, and cosine similarity against a stored
//! reference embedding. Both issue the request through the
//! [`ModelService`] seam and return the evidence a passing case records.

use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tracing::debug;

use sonda_api::{EmbeddingsRequest, GenerateRequest, ModelService};

use crate::error::{Result, ValidationFailure};

/// Minimum accepted cosine similarity between response and reference
pub const SIMILARITY_THRESHOLD: f64 = 0.99;

/// How many leading vector elements a similarity diagnostic carries
const VECTOR_PREFIX: usize = 5;

/// Issue a generation request and assert at least one expected term appears
///
/// The fragment stream is consumed under two concurrent timeout axes: an
/// inactivity window (`idle`) between fragments, and an overall budget
/// (`overall`) for the whole call. Whichever fires first cancels the
/// request: the stream is dropped, which aborts the transfer on the wire.
///
/// Matching is case-insensitive with OR semantics across `expected_terms`:
/// generative output is non-deterministic across environments even with
/// pinned decoding parameters, so this is a soft correctness probe rather
/// than an exact match.
///
/// # Errors
///
/// Returns a [`ValidationFailure`] when the output stalls, exceeds its
/// budget, or contains none of the expected terms; transport errors pass
/// through unchanged.
pub async fn validate_generate(
    service: &dyn ModelService,
    request: GenerateRequest,
    expected_terms: &[String],
    overall: Duration,
    idle: Duration,
) -> Result<String> {
    let model = request.model.clone();
    let mut stream = service.generate(request).await?;
    let deadline = Instant::now() + overall;
    let mut output = String::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            drop(stream);
            return Err(ValidationFailure::BudgetExceeded {
                overall_ms: overall.as_millis() as u64,
                received: output,
            }
            .into());
        }
        let wait = remaining.min(idle);
        match tokio::time::timeout(wait, stream.next()).await {
            Err(_elapsed) => {
                // Dropping the stream aborts the in-flight request.
                drop(stream);
                let failure = if wait < idle {
                    ValidationFailure::BudgetExceeded {
                        overall_ms: overall.as_millis() as u64,
                        received: output,
                    }
                } else {
                    ValidationFailure::Stalled {
                        idle_ms: idle.as_millis() as u64,
                        received: output,
                    }
                };
                return Err(failure.into());
            }
            Ok(None) => break,
            Ok(Some(Err(source))) => return Err(source.into()),
            Ok(Some(Ok(chunk))) => {
                output.push_str(&chunk.response);
                if chunk.done {
                    break;
                }
            }
        }
    }

    debug!(model = %model, chars = output.len(), "generation complete");

    let haystack = output.to_lowercase();
    let matched = expected_terms
        .iter()
        .any(|term| haystack.contains(&term.to_lowercase()));
    if matched {
        Ok(output)
    } else {
        Err(ValidationFailure::TermsAbsent {
            expected: expected_terms.to_vec(),
            output,
        }
        .into())
    }
}

/// Issue an embeddings request and assert similarity against `reference`
///
/// Degenerate responses fail before any similarity is computed: an empty
/// vector, a dimensionality mismatch (reported with both lengths), or a
/// zero-norm vector on either side. Returns the computed similarity on
/// success.
///
/// # Errors
///
/// Returns a [`ValidationFailure`] describing the first violated criterion;
/// transport errors pass through unchanged.
pub async fn validate_embedding(
    service: &dyn ModelService,
    request: EmbeddingsRequest,
    reference: &[f64],
) -> Result<f64> {
    let response = service.embeddings(request).await?;
    let got = response.embedding;

    if got.is_empty() {
        return Err(ValidationFailure::EmptyEmbedding.into());
    }
    if got.len() != reference.len() {
        return Err(ValidationFailure::DimensionMismatch {
            expected: reference.len(),
            got: got.len(),
        }
        .into());
    }
    if reference.iter().all(|&x| x == 0.0) {
        return Err(ValidationFailure::ZeroNorm { which: "reference" }.into());
    }
    let Some(similarity) = cosine_similarity(&got, reference) else {
        return Err(ValidationFailure::ZeroNorm { which: "response" }.into());
    };

    if similarity < SIMILARITY_THRESHOLD {
        return Err(ValidationFailure::LowSimilarity {
            similarity,
            threshold: SIMILARITY_THRESHOLD,
            expected_prefix: prefix(reference),
            got_prefix: prefix(&got),
        }
        .into());
    }
    Ok(similarity)
}

/// Cosine similarity of two equal-length vectors
///
/// `None` when either vector has zero norm; the measure is undefined there
/// and the caller decides what that means.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

fn prefix(v: &[f64]) -> Vec<f64> {
    v.iter().take(VECTOR_PREFIX).copied().collect()
}
