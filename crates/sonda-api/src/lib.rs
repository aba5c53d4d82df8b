//! Sonda service API client
//!
//! Typed request/response surface for an Ollama-compatible model-serving
//! endpoint, plus the [`ModelService`] trait that the harness orchestrates
//! against. Ships a real HTTP implementation and a scriptable mock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_clone))]

pub mod client;
pub mod error;
pub mod mock;
pub mod options;
pub mod service;
pub mod session;
pub mod types;

pub use client::HttpModelService;
pub use error::{ApiError, Result};
pub use mock::{MockModelService, ScriptedGeneration};
pub use options::GenerateOptions;
pub use service::{ModelService, TokenStream};
pub use session::{ServerCommand, ServiceSession, SessionConfig};
pub use types::{
    EmbeddingsRequest, EmbeddingsResponse, GenerateChunk, GenerateRequest, ModelList,
    ModelSummary, PullRequest, PullStatus,
};
