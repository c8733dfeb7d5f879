//! Text generation backends used by the chunk and synthesis stages.
//!
//! Both stages talk to the model through [`InferenceBackend`]. A [`BackendLoader`] turns a model
//! identifier into a ready backend handle; stages load once and share that handle across every
//! call they make. The Ollama adapter issues HTTP requests directly to the local runtime.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default base URL of a local Ollama runtime.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const REPEAT_PENALTY: f32 = 1.05;

/// Errors surfaced while generating text.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Provider was unreachable or the model could not be loaded.
    #[error("Inference provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// A single generation call exceeded the configured time limit.
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Decoding parameters shared by every call within a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on generated tokens.
    pub max_new_tokens: usize,
    /// Sampling temperature; `0` selects greedy decoding.
    pub temperature: f32,
    /// Nucleus sampling mass, only consulted when sampling.
    pub top_p: f32,
}

impl GenerationParams {
    /// Whether these parameters request deterministic greedy decoding.
    pub fn is_greedy(&self) -> bool {
        self.temperature <= 0.0
    }
}

/// One generation call: a prompt plus its decoding parameters.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Decoding parameters for this call.
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Build a request for `prompt` using `params`.
    pub fn new(prompt: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            params,
        }
    }
}

/// A loaded model that can complete prompts.
///
/// Implementations may echo the prompt at the start of their output; callers strip it.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String, InferenceError>;

    /// Whether concurrent `generate` calls on the same handle are safe.
    ///
    /// Backends returning `false` are driven with a single in-flight request.
    fn supports_concurrent_requests(&self) -> bool {
        true
    }
}

/// Loads a model and hands back a shareable backend handle.
#[async_trait]
pub trait BackendLoader: Send + Sync {
    /// Load `model` and return a handle usable from many tasks.
    async fn load(&self, model: &str) -> Result<Arc<dyn InferenceBackend>, InferenceError>;
}

/// Run `request` against `backend`, failing with [`InferenceError::Timeout`] when `limit` elapses.
pub async fn generate_with_timeout(
    backend: &dyn InferenceBackend,
    request: GenerationRequest,
    limit: Option<Duration>,
) -> Result<String, InferenceError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, backend.generate(request))
            .await
            .map_err(|_| InferenceError::Timeout(limit))?,
        None => backend.generate(request).await,
    }
}

/// Loader backed by a local Ollama runtime.
pub struct OllamaLoader {
    http: Client,
    base_url: String,
}

impl OllamaLoader {
    /// Build a loader targeting the Ollama instance at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .user_agent("resume-digest/inference")
            .build()
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl BackendLoader for OllamaLoader {
    async fn load(&self, model: &str) -> Result<Arc<dyn InferenceBackend>, InferenceError> {
        let backend = OllamaBackend {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        };
        tracing::info!(model, base_url = %self.base_url, "Loading model");
        // Ollama loads the model into memory when asked to complete an empty prompt.
        backend.post(json!({ "model": model, "prompt": "", "stream": false })).await?;
        tracing::debug!(model, "Model ready");
        Ok(Arc::new(backend))
    }
}

struct OllamaBackend {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaBackend {
    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn options(params: &GenerationParams) -> Value {
        if params.is_greedy() {
            json!({
                "num_predict": params.max_new_tokens,
                "temperature": 0.0,
                "top_k": 1,
                "repeat_penalty": REPEAT_PENALTY,
            })
        } else {
            json!({
                "num_predict": params.max_new_tokens,
                "temperature": params.temperature,
                "top_p": params.top_p,
                "repeat_penalty": REPEAT_PENALTY,
            })
        }
    }

    async fn post(&self, payload: Value) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::ProviderUnavailable(format!(
                "Ollama does not know model '{}': {body}",
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            InferenceError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(InferenceError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InferenceError> {
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": Self::options(&request.params),
        });
        self.post(payload).await
    }
}
