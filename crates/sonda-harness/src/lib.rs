//! Sonda harness
//!
//! End-to-end validation harness for a running model-serving service:
//! timeout governance, on-demand model provisioning, resource-aware
//! skipping, and response validation for generation and embedding requests.
//!
//! The harness treats the service as a black box behind
//! [`sonda_api::ModelService`]; everything here is orchestration and
//! assertion logic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_clone))]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod cases;
pub mod clock;
pub mod config;
pub mod error;
pub mod fixture;
pub mod gatekeeper;
pub mod provision;
pub mod report;
pub mod runner;
pub mod validators;

pub use cases::{
    chat_models, declare_cases, Acceptance, CaseKind, TestCase, EXPECTED_SKY_TERMS, SKY_PROMPT,
};
pub use clock::{RunClock, Timeouts};
pub use config::{EngineVariant, HarnessConfig};
pub use error::{Error, Result, ValidationFailure};
pub use fixture::load_reference_vectors;
pub use gatekeeper::{should_skip, SAFETY_FACTOR};
pub use provision::{ensure_model, Provisioned};
pub use report::render_summary;
pub use runner::{CaseLedger, CaseRecord, CaseRunner, CaseStatus, RunReport};
pub use validators::{cosine_similarity, validate_embedding, validate_generate, SIMILARITY_THRESHOLD};
