//! Service abstraction for testability
//!
//! [`ModelService`] is the seam between the harness and the wire: the four
//! remote operations the harness consumes, behind a trait so the runner and
//! validators can be exercised against [`crate::MockModelService`].

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;
use crate::types::{EmbeddingsRequest, EmbeddingsResponse, GenerateRequest, ModelList};
use crate::GenerateChunk;

/// A lazy, finite sequence of generation fragments
///
/// Consumed exactly once per call. Dropping the stream cancels the underlying
/// request; there is no way to resume a partially consumed stream.
pub type TokenStream = BoxStream<'static, Result<GenerateChunk>>;

/// The model-serving operations the harness depends on
///
/// Implementations must be safe for concurrent use by multiple in-flight
/// requests; the session handle is shared read-only across cases.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// List the models currently present in the service's store
    async fn list_models(&self) -> Result<ModelList>;

    /// Pull `name` into the store, blocking until completion or failure
    async fn pull_model(&self, name: &str) -> Result<()>;

    /// Issue a generation request, returning the fragment stream
    async fn generate(&self, request: GenerateRequest) -> Result<TokenStream>;

    /// Issue an embeddings request
    async fn embeddings(&self, request: EmbeddingsRequest) -> Result<EmbeddingsResponse>;
}
