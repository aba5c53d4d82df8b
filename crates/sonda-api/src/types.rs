//! Wire types for the model-serving API
//!
//! Request and response shapes for the four endpoints the harness exercises:
//! list-models, pull-model, generate, and embeddings.

use serde::{Deserialize, Serialize};

use crate::options::GenerateOptions;

/// Generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model name
    pub model: String,
    /// Input prompt
    pub prompt: String,
    /// Whether the service should stream incremental fragments
    pub stream: bool,
    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    /// Build a streaming generation request
    #[must_use]
    pub fn streaming(
        model: impl Into<String>,
        prompt: impl Into<String>,
        options: GenerateOptions,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
            options: Some(options),
        }
    }
}

/// One incremental fragment of a streamed generation response
///
/// The final fragment carries `done == true` and, depending on the service
/// version, token accounting fields.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateChunk {
    /// Text fragment (may be empty on the terminal chunk)
    #[serde(default)]
    pub response: String,
    /// Whether generation has finished
    #[serde(default)]
    pub done: bool,
    /// Tokens generated so far, when reported
    #[serde(default)]
    pub eval_count: usize,
    /// Error reported in-band by the service, if any
    #[serde(default)]
    pub error: Option<String>,
}

/// Embeddings request
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingsRequest {
    /// Model name
    pub model: String,
    /// Input prompt
    pub prompt: String,
    /// Generation options (the service accepts the same set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Embeddings response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsResponse {
    /// The embedding vector
    #[serde(default)]
    pub embedding: Vec<f64>,
}

/// A model known to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model name (unique key)
    pub name: String,
    /// Reported size in bytes
    #[serde(default)]
    pub size: u64,
}

impl ModelSummary {
    /// Create a summary
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Whether this entry names the same artifact as `other`
    ///
    /// The service lists bare names under an implicit `:latest` tag, so
    /// `gemma3` and `gemma3:latest` refer to the same model.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        same_model(&self.name, other)
    }
}

/// Compare two model names, treating a bare name and `name:latest` as equal
#[must_use]
pub fn same_model(a: &str, b: &str) -> bool {
    canonical(a) == canonical(b)
}

fn canonical(name: &str) -> &str {
    name.strip_suffix(":latest").unwrap_or(name)
}

/// Model listing response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelList {
    /// Known models
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

impl ModelList {
    /// Find the entry for `name`, honoring `:latest` equivalence
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ModelSummary> {
        self.models.iter().find(|m| m.matches(name))
    }
}

/// Pull request
#[derive(Debug, Clone, Serialize)]
pub struct PullRequest {
    /// Model name to pull
    pub name: String,
    /// Pull without streaming progress updates
    pub stream: bool,
}

impl PullRequest {
    /// Build a non-streaming pull request
    #[must_use]
    pub fn blocking(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: false,
        }
    }
}

/// Terminal pull status
#[derive(Debug, Clone, Deserialize)]
pub struct PullStatus {
    /// Status string; `"success"` on completion
    #[serde(default)]
    pub status: String,
    /// Error reported in-band by the service, if any
    #[serde(default)]
    pub error: Option<String>,
}

impl PullStatus {
    /// Whether the pull completed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status == "success"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_streaming() {
        let req = GenerateRequest::streaming(
            "gemma3",
            "why is the sky blue?",
            GenerateOptions::deterministic(123),
        );
        assert!(req.stream);
        let json = serde_json::to_string(&req).expect("serialize");
        assert!(json.contains("\"model\":\"gemma3\""));
        assert!(json.contains("\"stream\":true"));
        assert!(json.contains("\"seed\":123"));
    }

    #[test]
    fn test_chunk_deserialize_fragment() {
        let chunk: GenerateChunk =
            serde_json::from_str(r#"{"model":"gemma3","response":"Ray","done":false}"#)
                .expect("deserialize");
        assert_eq!(chunk.response, "Ray");
        assert!(!chunk.done);
        assert!(chunk.error.is_none());
    }

    #[test]
    fn test_chunk_deserialize_terminal() {
        let chunk: GenerateChunk =
            serde_json::from_str(r#"{"response":"","done":true,"eval_count":32}"#)
                .expect("deserialize");
        assert!(chunk.done);
        assert_eq!(chunk.eval_count, 32);
    }

    #[test]
    fn test_embeddings_response_defaults_empty() {
        let resp: EmbeddingsResponse = serde_json::from_str("{}").expect("deserialize");
        assert!(resp.embedding.is_empty());
    }

    #[test]
    fn test_same_model_latest_equivalence() {
        assert!(same_model("gemma3", "gemma3:latest"));
        assert!(same_model("gemma3:latest", "gemma3"));
        assert!(same_model("gemma3", "gemma3"));
        assert!(!same_model("gemma3", "gemma3:2b"));
        assert!(!same_model("gemma3", "llama3.2"));
    }

    #[test]
    fn test_model_list_find() {
        let list = ModelList {
            models: vec![
                ModelSummary::new("llama3.2:latest", 2_000_000_000),
                ModelSummary::new("all-minilm", 46_000_000),
            ],
        };
        assert!(list.find("llama3.2").is_some());
        assert!(list.find("all-minilm:latest").is_some());
        assert!(list.find("qwen2.5").is_none());
    }

    #[test]
    fn test_pull_status_success() {
        let status: PullStatus =
            serde_json::from_str(r#"{"status":"success"}"#).expect("deserialize");
        assert!(status.is_success());
    }

    #[test]
    fn test_pull_status_error() {
        let status: PullStatus =
            serde_json::from_str(r#"{"status":"error","error":"manifest unknown"}"#)
                .expect("deserialize");
        assert!(!status.is_success());
        assert_eq!(status.error.as_deref(), Some("manifest unknown"));
    }

    #[test]
    fn test_model_list_deserialize() {
        let list: ModelList = serde_json::from_str(
            r#"{"models":[{"name":"gemma3:latest","size":3338801804}]}"#,
        )
        .expect("deserialize");
        assert_eq!(list.models.len(), 1);
        assert_eq!(list.models[0].size, 3_338_801_804);
    }
}
