//! Reduce stage: merge chunk summaries into the final narrative.

use super::types::ExecutionLimits;
use crate::inference::{
    BackendLoader, GenerationParams, GenerationRequest, InferenceError, generate_with_timeout,
};
use crate::prompts::{build_synthesis_prompt, strip_prompt_echo};

/// Produce the final summary with exactly one backend call.
///
/// Blank summaries are left out of the prompt. When none remain the backend is still asked,
/// with an empty list of partial summaries.
pub async fn synthesize(
    loader: &dyn BackendLoader,
    chunk_summaries: &[String],
    model_id: &str,
    params: GenerationParams,
    limits: &ExecutionLimits,
) -> Result<String, InferenceError> {
    let usable = chunk_summaries
        .iter()
        .filter(|summary| !summary.trim().is_empty())
        .count();
    if usable == 0 {
        tracing::warn!("No chunk summaries available; synthesizing from an empty list");
    }

    let backend = loader.load(model_id).await?;
    let prompt = build_synthesis_prompt(chunk_summaries);
    tracing::info!(
        summaries = usable,
        max_new_tokens = params.max_new_tokens,
        "Synthesizing final summary"
    );
    let request = GenerationRequest::new(prompt.clone(), params);
    let generated = generate_with_timeout(backend.as_ref(), request, limits.call_timeout).await?;
    Ok(strip_prompt_echo(&prompt, &generated).to_string())
}
