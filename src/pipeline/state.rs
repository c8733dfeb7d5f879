//! Run configuration and the state record threaded through the stages.

use super::types::PipelineError;
use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::inference::GenerationParams;
use std::path::PathBuf;
use std::sync::Arc;

/// Default chunk-level generation budget.
pub const DEFAULT_MAX_NEW_TOKENS: usize = 256;
/// Default sampling temperature (greedy).
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
/// Default nucleus sampling mass.
pub const DEFAULT_TOP_P: f32 = 0.9;
/// Minimum generation budget for the synthesis call.
pub const MIN_SYNTHESIS_TOKENS: usize = 384;

/// Settings fixed for the lifetime of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Resume document to summarize.
    pub document_path: PathBuf,
    /// Model identifier handed to the backend loader.
    pub model_id: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated from the end of each chunk at the start of the next.
    pub chunk_overlap: usize,
    /// Token budget for each chunk summary.
    pub max_new_tokens: usize,
    /// Sampling temperature; `0` is greedy.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
}

impl RunConfig {
    /// Configuration with default chunking and decoding settings.
    pub fn new(document_path: impl Into<PathBuf>, model_id: impl Into<String>) -> Self {
        Self {
            document_path: document_path.into(),
            model_id: model_id.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    /// Decoding parameters for chunk summaries.
    pub fn chunk_params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    /// Decoding parameters for synthesis; the budget never drops below the chunk budget.
    pub fn synthesis_params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens.max(MIN_SYNTHESIS_TOKENS),
            ..self.chunk_params()
        }
    }
}

/// Accumulated result of a run.
///
/// Stages take the state by value and return a new one with their field added. Every derived
/// field is written once; a second write is rejected.
#[derive(Debug, Clone)]
pub struct RunState {
    config: Arc<RunConfig>,
    raw_text: Option<String>,
    chunks: Option<Vec<String>>,
    chunk_summaries: Option<Vec<String>>,
    final_summary: Option<String>,
}

impl RunState {
    /// Fresh state holding only the run configuration.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config: Arc::new(config),
            raw_text: None,
            chunks: None,
            chunk_summaries: None,
            final_summary: None,
        }
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Extracted document text, once the extract stage has run.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    /// Ordered chunks, once the split stage has run.
    pub fn chunks(&self) -> Option<&[String]> {
        self.chunks.as_deref()
    }

    /// Chunk summaries aligned with [`RunState::chunks`], once the map stage has run.
    pub fn chunk_summaries(&self) -> Option<&[String]> {
        self.chunk_summaries.as_deref()
    }

    /// Final synthesized summary, once the synthesize stage has run.
    pub fn final_summary(&self) -> Option<&str> {
        self.final_summary.as_deref()
    }

    /// Record the extracted text.
    pub fn with_raw_text(self, raw_text: String) -> Result<Self, PipelineError> {
        if self.raw_text.is_some() {
            return Err(PipelineError::FieldAlreadySet("raw_text"));
        }
        Ok(Self {
            raw_text: Some(raw_text),
            ..self
        })
    }

    /// Record the chunk sequence.
    pub fn with_chunks(self, chunks: Vec<String>) -> Result<Self, PipelineError> {
        if self.chunks.is_some() {
            return Err(PipelineError::FieldAlreadySet("chunks"));
        }
        Ok(Self {
            chunks: Some(chunks),
            ..self
        })
    }

    /// Record chunk summaries; there must be exactly one per chunk.
    pub fn with_chunk_summaries(self, summaries: Vec<String>) -> Result<Self, PipelineError> {
        if self.chunk_summaries.is_some() {
            return Err(PipelineError::FieldAlreadySet("chunk_summaries"));
        }
        let chunks = self.chunks.as_ref().map_or(0, Vec::len);
        if summaries.len() != chunks {
            return Err(PipelineError::MisalignedSummaries {
                chunks,
                summaries: summaries.len(),
            });
        }
        Ok(Self {
            chunk_summaries: Some(summaries),
            ..self
        })
    }

    /// Record the final summary.
    pub fn with_final_summary(self, summary: String) -> Result<Self, PipelineError> {
        if self.final_summary.is_some() {
            return Err(PipelineError::FieldAlreadySet("final_summary"));
        }
        Ok(Self {
            final_summary: Some(summary),
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RunState {
        RunState::new(RunConfig::new("resume.pdf", "llama3"))
    }

    #[test]
    fn new_state_has_only_config() {
        let state = state();
        assert_eq!(state.config().chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(state.raw_text().is_none());
        assert!(state.chunks().is_none());
        assert!(state.chunk_summaries().is_none());
        assert!(state.final_summary().is_none());
    }

    #[test]
    fn builders_preserve_earlier_fields() {
        let state = state()
            .with_raw_text("text".into())
            .and_then(|s| s.with_chunks(vec!["a".into(), "b".into()]))
            .and_then(|s| s.with_chunk_summaries(vec!["sa".into(), String::new()]))
            .and_then(|s| s.with_final_summary("done".into()))
            .expect("state");

        assert_eq!(state.raw_text(), Some("text"));
        assert_eq!(state.chunks().map(<[String]>::len), Some(2));
        assert_eq!(state.chunk_summaries().map(<[String]>::len), Some(2));
        assert_eq!(state.final_summary(), Some("done"));
        assert_eq!(state.config().model_id, "llama3");
    }

    #[test]
    fn fields_are_written_once() {
        let error = state()
            .with_raw_text("one".into())
            .and_then(|s| s.with_raw_text("two".into()))
            .unwrap_err();
        assert!(matches!(error, PipelineError::FieldAlreadySet("raw_text")));
    }

    #[test]
    fn summaries_must_align_with_chunks() {
        let error = state()
            .with_chunks(vec!["a".into(), "b".into()])
            .and_then(|s| s.with_chunk_summaries(vec!["only one".into()]))
            .unwrap_err();
        assert!(matches!(
            error,
            PipelineError::MisalignedSummaries {
                chunks: 2,
                summaries: 1
            }
        ));
    }

    #[test]
    fn synthesis_budget_has_a_floor() {
        let mut config = RunConfig::new("r.pdf", "m");
        config.max_new_tokens = 128;
        assert_eq!(config.synthesis_params().max_new_tokens, MIN_SYNTHESIS_TOKENS);
        config.max_new_tokens = 1024;
        assert_eq!(config.synthesis_params().max_new_tokens, 1024);
        assert_eq!(config.synthesis_params().top_p, config.top_p);
    }
}
