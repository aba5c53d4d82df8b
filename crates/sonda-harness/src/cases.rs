//! Test-case declaration
//!
//! The case set is fixed before execution begins: one generation probe per
//! chat model in the selected engine set, plus one embedding probe per entry
//! in the reference-vector table. Cases are independent and order-insensitive;
//! declaration order is only a scheduling hint.

use sonda_api::GenerateOptions;

use crate::config::EngineVariant;
use crate::fixture::ReferenceVectors;

/// Canonical generation probe prompt
pub const SKY_PROMPT: &str = "why is the sky blue?";

/// Terms accepted as evidence the generation probe was answered sensibly
pub const EXPECTED_SKY_TERMS: [&str; 5] =
    ["rayleigh", "scattering", "atmosphere", "nitrogen", "oxygen"];

/// Seed pinning the decoding parameters of every probe
pub const GENERATION_SEED: u32 = 123;

/// Chat models served by the native engine
const NATIVE_ENGINE_MODELS: &[&str] = &[
    "gemma3:1b",
    "llama3.2:1b",
    "qwen2.5:0.5b",
    "qwen3:0.6b",
    "granite3.3:2b",
];

/// Chat models still handled by the legacy runner
const LEGACY_RUNNER_MODELS: &[&str] = &["llama3.2", "phi3:mini", "orca-mini", "mistral:7b"];

/// What a passing response must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum Acceptance {
    /// Output must contain at least one of these terms (case-insensitive)
    AnyTerm(Vec<String>),
    /// Response vector must match this reference by cosine similarity
    Reference(Vec<f64>),
}

/// Which validator a case dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CaseKind {
    /// Generation probe
    Generate,
    /// Embedding probe
    Embedding,
}

impl std::fmt::Display for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Embedding => write!(f, "embedding"),
        }
    }
}

/// A declared test case, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Model exercised by this case
    pub model: String,
    /// Probe prompt
    pub prompt: String,
    /// Pinned decoding options
    pub options: GenerateOptions,
    /// Acceptance criterion
    pub acceptance: Acceptance,
}

impl TestCase {
    /// Declare the canonical generation probe for `model`
    #[must_use]
    pub fn generation(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: SKY_PROMPT.to_string(),
            options: GenerateOptions::deterministic(GENERATION_SEED),
            acceptance: Acceptance::AnyTerm(
                EXPECTED_SKY_TERMS.into_iter().map(String::from).collect(),
            ),
        }
    }

    /// Declare the embedding probe for `model` against `reference`
    #[must_use]
    pub fn embedding(model: impl Into<String>, reference: Vec<f64>) -> Self {
        Self {
            model: model.into(),
            prompt: SKY_PROMPT.to_string(),
            options: GenerateOptions::deterministic(GENERATION_SEED),
            acceptance: Acceptance::Reference(reference),
        }
    }

    /// Which validator this case dispatches to
    #[must_use]
    pub fn kind(&self) -> CaseKind {
        match self.acceptance {
            Acceptance::AnyTerm(_) => CaseKind::Generate,
            Acceptance::Reference(_) => CaseKind::Embedding,
        }
    }
}

/// The chat-model set for `variant`
#[must_use]
pub fn chat_models(variant: EngineVariant) -> Vec<&'static str> {
    match variant {
        EngineVariant::Native => NATIVE_ENGINE_MODELS.to_vec(),
        EngineVariant::All => {
            let mut models = NATIVE_ENGINE_MODELS.to_vec();
            models.extend_from_slice(LEGACY_RUNNER_MODELS);
            models
        }
    }
}

/// Declare the full case set for a run
///
/// Generation probes for the selected chat models, then embedding probes for
/// every model in the reference table (the table's sorted order keeps runs
/// deterministic).
#[must_use]
pub fn declare_cases(variant: EngineVariant, references: &ReferenceVectors) -> Vec<TestCase> {
    let mut cases: Vec<TestCase> = chat_models(variant)
        .into_iter()
        .map(TestCase::generation)
        .collect();
    cases.extend(
        references
            .iter()
            .map(|(model, reference)| TestCase::embedding(model.clone(), reference.clone())),
    );
    cases
}
