//! Mock service for testing
//!
//! A scriptable in-memory [`ModelService`] so the harness logic can be
//! exercised without a live endpoint: configurable model listings, pull
//! outcomes, fragment scripts with an optional inter-fragment delay, and
//! per-model embedding vectors. Call counters expose what the harness
//! actually did.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::error::{ApiError, Result};
use crate::service::{ModelService, TokenStream};
use crate::types::{
    same_model, EmbeddingsRequest, EmbeddingsResponse, GenerateChunk, GenerateRequest, ModelList,
    ModelSummary,
};

/// Size assigned to models created by a successful mock pull
const PULLED_SIZE: u64 = 1_000_000_000;

/// A scripted generation response
#[derive(Debug, Clone)]
pub struct ScriptedGeneration {
    /// Fragments yielded in order
    pub fragments: Vec<String>,
    /// Delay before each fragment (drives idle-timeout tests)
    pub fragment_delay: Duration,
    /// Error yielded after the fragments instead of the terminal chunk
    pub trailing_error: Option<String>,
}

impl ScriptedGeneration {
    /// Script that yields `fragments` then completes
    #[must_use]
    pub fn completing<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            fragment_delay: Duration::ZERO,
            trailing_error: None,
        }
    }

    /// Add a delay before every fragment
    #[must_use]
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    /// Fail mid-stream after the scripted fragments
    #[must_use]
    pub fn with_trailing_error(mut self, message: impl Into<String>) -> Self {
        self.trailing_error = Some(message.into());
        self
    }
}

impl Default for ScriptedGeneration {
    fn default() -> Self {
        Self::completing(["The sky appears blue because of Rayleigh ", "scattering."])
    }
}

/// Scriptable in-memory model service
#[derive(Debug, Default)]
pub struct MockModelService {
    models: Mutex<Vec<ModelSummary>>,
    script: Mutex<ScriptedGeneration>,
    embeddings: Mutex<HashMap<String, Vec<f64>>>,
    pull_error: Mutex<Option<String>>,
    list_error: Mutex<Option<String>>,
    pull_log: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
}

impl MockModelService {
    /// Create an empty mock
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a model into the listing
    #[must_use]
    pub fn with_model(self, name: impl Into<String>, size: u64) -> Self {
        self.models
            .lock()
            .expect("mock lock")
            .push(ModelSummary::new(name, size));
        self
    }

    /// Set the generation script
    #[must_use]
    pub fn with_script(self, script: ScriptedGeneration) -> Self {
        *self.script.lock().expect("mock lock") = script;
        self
    }

    /// Make pulls fail with `message`
    #[must_use]
    pub fn with_pull_error(self, message: impl Into<String>) -> Self {
        *self.pull_error.lock().expect("mock lock") = Some(message.into());
        self
    }

    /// Make listings fail with `message`
    #[must_use]
    pub fn with_list_error(self, message: impl Into<String>) -> Self {
        *self.list_error.lock().expect("mock lock") = Some(message.into());
        self
    }

    /// Set the embedding returned for `model`
    #[must_use]
    pub fn with_embedding(self, model: impl Into<String>, vector: Vec<f64>) -> Self {
        self.embeddings
            .lock()
            .expect("mock lock")
            .insert(model.into(), vector);
        self
    }

    /// Names pulled so far, in call order
    #[must_use]
    pub fn pull_log(&self) -> Vec<String> {
        self.pull_log.lock().expect("mock lock").clone()
    }

    /// How many times `name` was pulled
    #[must_use]
    pub fn pull_count(&self, name: &str) -> usize {
        self.pull_log
            .lock()
            .expect("mock lock")
            .iter()
            .filter(|n| same_model(n, name))
            .count()
    }

    /// How many listing calls were made
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelService for MockModelService {
    async fn list_models(&self) -> Result<ModelList> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.list_error.lock().expect("mock lock").clone() {
            return Err(ApiError::Service(message));
        }
        Ok(ModelList {
            models: self.models.lock().expect("mock lock").clone(),
        })
    }

    async fn pull_model(&self, name: &str) -> Result<()> {
        self.pull_log
            .lock()
            .expect("mock lock")
            .push(name.to_string());
        if let Some(message) = self.pull_error.lock().expect("mock lock").clone() {
            return Err(ApiError::Service(message));
        }
        let mut models = self.models.lock().expect("mock lock");
        if !models.iter().any(|m| m.matches(name)) {
            models.push(ModelSummary::new(name, PULLED_SIZE));
        }
        Ok(())
    }

    async fn generate(&self, _request: GenerateRequest) -> Result<TokenStream> {
        let script = self.script.lock().expect("mock lock").clone();
        let stream = futures_util::stream::unfold((script, 0usize), |(script, idx)| async move {
            if idx < script.fragments.len() {
                if !script.fragment_delay.is_zero() {
                    tokio::time::sleep(script.fragment_delay).await;
                }
                let chunk = GenerateChunk {
                    response: script.fragments[idx].clone(),
                    done: false,
                    eval_count: idx + 1,
                    error: None,
                };
                return Some((Ok(chunk), (script, idx + 1)));
            }
            if idx == script.fragments.len() {
                let item = match &script.trailing_error {
                    Some(message) => Err(ApiError::Service(message.clone())),
                    None => Ok(GenerateChunk {
                        response: String::new(),
                        done: true,
                        eval_count: idx,
                        error: None,
                    }),
                };
                return Some((item, (script, idx + 1)));
            }
            None
        });
        Ok(stream.boxed())
    }

    async fn embeddings(&self, request: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        let embeddings = self.embeddings.lock().expect("mock lock");
        let vector = embeddings
            .iter()
            .find(|(name, _)| same_model(name, &request.model))
            .map(|(_, v)| v.clone());
        match vector {
            Some(embedding) => Ok(EmbeddingsResponse { embedding }),
            None => Err(ApiError::Service(format!(
                "no embedding scripted for model {}",
                request.model
            ))),
        }
    }
}
