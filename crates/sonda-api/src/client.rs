//! HTTP implementation of [`ModelService`]
//!
//! Talks to an Ollama-compatible endpoint: `/api/tags`, `/api/pull`,
//! `/api/generate` (NDJSON streaming), `/api/embeddings`. Generation spawns a
//! reader task feeding a bounded channel; dropping the returned stream aborts
//! the task and with it the in-flight request.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::service::{ModelService, TokenStream};
use crate::types::{
    EmbeddingsRequest, EmbeddingsResponse, GenerateChunk, GenerateRequest, ModelList,
    PullRequest, PullStatus,
};

/// Fragments buffered between the reader task and the consumer
const CHANNEL_CAPACITY: usize = 16;

/// Connection establishment budget; request bodies are bounded by the
/// harness's own per-call timeouts, not by the client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a model-serving endpoint
#[derive(Debug, Clone)]
pub struct HttpModelService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpModelService {
    /// Create a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url: String = base_url.into();
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The endpoint this client targets
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Probe the endpoint's model listing; `true` when it answers
    pub async fn reachable(&self) -> bool {
        let url = self.endpoint("/api/tags");
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
        let resp = check_status(&url, resp).await?;
        decode_body(&url, resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
        let resp = check_status(&url, resp).await?;
        decode_body(&url, resp).await
    }
}

async fn check_status(url: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

async fn decode_body<T: serde::de::DeserializeOwned>(
    url: &str,
    resp: reqwest::Response,
) -> Result<T> {
    let text = resp.text().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl ModelService for HttpModelService {
    async fn list_models(&self) -> Result<ModelList> {
        self.get_json("/api/tags").await
    }

    async fn pull_model(&self, name: &str) -> Result<()> {
        debug!(model = name, "pulling model");
        let status: PullStatus = self
            .post_json("/api/pull", &PullRequest::blocking(name))
            .await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Service(status.error.unwrap_or(status.status)))
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<TokenStream> {
        let url = self.endpoint("/api/generate");
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
        let resp = check_status(&url, resp).await?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(read_chunks(url, resp, tx));
        Ok(Box::pin(ChunkStream {
            receiver: rx,
            handle,
        }))
    }

    async fn embeddings(&self, request: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        self.post_json("/api/embeddings", &request).await
    }
}

/// Reader task: split the response body into NDJSON lines and forward parsed
/// fragments until the terminal chunk, EOF, an error, or consumer disconnect.
async fn read_chunks(
    url: String,
    mut resp: reqwest::Response,
    tx: mpsc::Sender<Result<GenerateChunk>>,
) {
    let mut buf: Vec<u8> = Vec::new();
    loop {
        match resp.chunk().await {
            Ok(Some(bytes)) => {
                buf.extend_from_slice(&bytes);
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = &line[..line.len() - 1];
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    match serde_json::from_slice::<GenerateChunk>(line) {
                        Ok(mut chunk) => {
                            if let Some(message) = chunk.error.take() {
                                let _ = tx.send(Err(ApiError::Service(message))).await;
                                return;
                            }
                            let done = chunk.done;
                            if tx.send(Ok(chunk)).await.is_err() {
                                debug!("consumer dropped, cancelling generation read");
                                return;
                            }
                            if done {
                                return;
                            }
                        }
                        Err(source) => {
                            let _ = tx
                                .send(Err(ApiError::Decode {
                                    url: url.clone(),
                                    source,
                                }))
                                .await;
                            return;
                        }
                    }
                }
            }
            Ok(None) => return,
            Err(source) => {
                let _ = tx
                    .send(Err(ApiError::Transport {
                        url: url.clone(),
                        source,
                    }))
                    .await;
                return;
            }
        }
    }
}

/// Consumer side of a streamed generation
///
/// Dropping it aborts the reader task, which drops the HTTP response and
/// cancels the request on the wire.
struct ChunkStream {
    receiver: mpsc::Receiver<Result<GenerateChunk>>,
    handle: JoinHandle<()>,
}

impl Stream for ChunkStream {
    type Item = Result<GenerateChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
