//! Resume summarization pipeline: extract, split, map-summarize, synthesize.
//!
//! The controller walks a fixed, linear list of stages. Each stage consumes the [`RunState`]
//! by value and returns a new one carrying its own field; the first error ends the run.

mod state;
mod summarize;
mod synthesize;
mod types;

pub use state::{
    DEFAULT_MAX_NEW_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, MIN_SYNTHESIS_TOKENS, RunConfig,
    RunState,
};
pub use summarize::summarize_chunks;
pub use synthesize::synthesize;
pub use types::{ExecutionLimits, MAX_CHUNK_WORKERS, PipelineError, default_worker_limit};

use crate::chunking::split_text;
use crate::extract::TextExtractor;
use crate::inference::BackendLoader;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Read raw text from the document.
    Extract,
    /// Cut raw text into overlapping chunks.
    Split,
    /// Summarize each chunk.
    MapSummarize,
    /// Merge chunk summaries into the final summary.
    Synthesize,
}

impl Stage {
    /// Stable name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Split => "split",
            Self::MapSummarize => "map_summarize",
            Self::Synthesize => "synthesize",
        }
    }
}

/// The fixed stage sequence.
pub const STAGES: [Stage; 4] = [
    Stage::Extract,
    Stage::Split,
    Stage::MapSummarize,
    Stage::Synthesize,
];

/// Runs the four stages against an extractor and an inference backend.
///
/// Construct once and reuse; every [`Pipeline::run`] starts from a fresh [`RunState`].
pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    loader: Arc<dyn BackendLoader>,
    limits: ExecutionLimits,
}

impl Pipeline {
    /// Build a pipeline with default execution limits.
    pub fn new(extractor: Arc<dyn TextExtractor>, loader: Arc<dyn BackendLoader>) -> Self {
        Self {
            extractor,
            loader,
            limits: ExecutionLimits::default(),
        }
    }

    /// Replace the execution limits.
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Execution limits in effect.
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Run every stage in order and return the completed state.
    ///
    /// Fails before any stage runs when the document does not exist.
    pub async fn run(&self, config: RunConfig) -> Result<RunState, PipelineError> {
        if !config.document_path.exists() {
            return Err(PipelineError::DocumentNotFound(config.document_path));
        }

        let started = Instant::now();
        let mut state = RunState::new(config);
        for stage in STAGES {
            state = self.run_stage(stage, state).await?;
        }

        tracing::info!(
            chunks = state.chunks().map_or(0, <[String]>::len),
            summary_chars = state.final_summary().map_or(0, |s| s.chars().count()),
            elapsed_ms = elapsed_ms(started),
            "Pipeline finished"
        );
        Ok(state)
    }

    /// Run a single stage.
    pub async fn run_stage(
        &self,
        stage: Stage,
        state: RunState,
    ) -> Result<RunState, PipelineError> {
        let span = tracing::info_span!("stage", name = stage.name());
        async move {
            let started = Instant::now();
            let next = match stage {
                Stage::Extract => self.extract(state).await,
                Stage::Split => Self::split(state),
                Stage::MapSummarize => self.map_summarize(state).await,
                Stage::Synthesize => self.synthesize(state).await,
            }?;
            tracing::debug!(
                elapsed_ms = elapsed_ms(started),
                "Stage complete"
            );
            Ok(next)
        }
        .instrument(span)
        .await
    }

    async fn extract(&self, state: RunState) -> Result<RunState, PipelineError> {
        let extractor = Arc::clone(&self.extractor);
        let path = state.config().document_path.clone();
        let raw_text = tokio::task::spawn_blocking(move || extractor.extract(&path)).await??;
        tracing::info!(chars = raw_text.chars().count(), "Extracted text");
        state.with_raw_text(raw_text)
    }

    fn split(state: RunState) -> Result<RunState, PipelineError> {
        let config = state.config();
        let chunks = split_text(
            state.raw_text().unwrap_or_default(),
            config.chunk_size,
            config.chunk_overlap,
        )?;
        tracing::info!(
            chunks = chunks.len(),
            chunk_size = config.chunk_size,
            overlap = config.chunk_overlap,
            "Split text"
        );
        state.with_chunks(chunks)
    }

    async fn map_summarize(&self, state: RunState) -> Result<RunState, PipelineError> {
        let config = state.config();
        let summaries = summarize_chunks(
            self.loader.as_ref(),
            state.chunks().unwrap_or_default(),
            &config.model_id,
            config.chunk_params(),
            &self.limits,
        )
        .await?;
        state.with_chunk_summaries(summaries)
    }

    async fn synthesize(&self, state: RunState) -> Result<RunState, PipelineError> {
        let config = state.config();
        let summary = synthesize(
            self.loader.as_ref(),
            state.chunk_summaries().unwrap_or_default(),
            &config.model_id,
            config.synthesis_params(),
            &self.limits,
        )
        .await?;
        state.with_final_summary(summary)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
