//! Map stage: summarize every chunk with bounded concurrency.
//!
//! One backend is loaded per stage and shared by all chunk calls. At most
//! [`ExecutionLimits::max_workers`] calls are in flight; completions arrive in any order and are
//! written into a pre-sized vector at their chunk's index, so the output order always matches the
//! input order. The first failure aborts the stage and drops every outstanding call.

use super::types::ExecutionLimits;
use crate::inference::{
    BackendLoader, GenerationParams, GenerationRequest, InferenceBackend, InferenceError,
    generate_with_timeout,
};
use crate::prompts::{build_chunk_prompt, strip_prompt_echo};
use futures_util::stream::{self, StreamExt};
use std::time::Duration;

/// Summarize `chunks` in parallel, returning one summary per chunk at the same index.
///
/// An empty input returns immediately without loading the model.
pub async fn summarize_chunks(
    loader: &dyn BackendLoader,
    chunks: &[String],
    model_id: &str,
    params: GenerationParams,
    limits: &ExecutionLimits,
) -> Result<Vec<String>, InferenceError> {
    if chunks.is_empty() {
        tracing::debug!("No chunks to summarize");
        return Ok(Vec::new());
    }

    let backend = loader.load(model_id).await?;
    let workers = if backend.supports_concurrent_requests() {
        limits.max_workers.max(1)
    } else {
        1
    };
    let total = chunks.len();
    tracing::info!(chunks = total, workers, model = model_id, "Summarizing chunks");

    let mut summaries = vec![String::new(); total];
    let backend = backend.as_ref();
    let timeout = limits.call_timeout;
    let mut pending = stream::iter(chunks.iter().enumerate())
        .map(|(index, chunk)| summarize_one(backend, index, chunk, params, timeout))
        .buffer_unordered(workers);

    let mut completed = 0usize;
    while let Some(result) = pending.next().await {
        let (index, summary) = result?;
        summaries[index] = summary;
        completed += 1;
        tracing::info!(completed, total, chunk = index, "Chunk summarized");
    }

    Ok(summaries)
}

async fn summarize_one(
    backend: &dyn InferenceBackend,
    index: usize,
    chunk: &str,
    params: GenerationParams,
    timeout: Option<Duration>,
) -> Result<(usize, String), InferenceError> {
    let prompt = build_chunk_prompt(chunk);
    let request = GenerationRequest::new(prompt.clone(), params);
    let generated = generate_with_timeout(backend, request, timeout)
        .await
        .inspect_err(|error| {
            tracing::error!(chunk = index, %error, "Chunk summarization failed");
        })?;
    Ok((index, strip_prompt_echo(&prompt, &generated).to_string()))
}
