//! Error and execution-limit types for the pipeline.

use crate::{chunking::ChunkingError, extract::ExtractionError, inference::InferenceError};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Hard ceiling on concurrent chunk summarizations.
pub const MAX_CHUNK_WORKERS: usize = 4;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input document does not exist; raised before any stage runs.
    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),
    /// The extract stage could not read the document.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// The split stage rejected its parameters.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The inference backend failed during summarization or synthesis.
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
    /// A blocking stage task panicked or was cancelled.
    #[error("Stage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// A stage tried to overwrite a field another stage already wrote.
    #[error("Run state field '{0}' is already populated")]
    FieldAlreadySet(&'static str),
    /// Chunk summaries do not line up with chunks.
    #[error("Chunk summaries misaligned: {chunks} chunks but {summaries} summaries")]
    MisalignedSummaries {
        /// Number of chunks in the state.
        chunks: usize,
        /// Number of summaries offered.
        summaries: usize,
    },
}

/// Resource limits applied to backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum concurrent chunk summarizations.
    pub max_workers: usize,
    /// Optional per-call time limit for backend generation.
    pub call_timeout: Option<Duration>,
}

impl ExecutionLimits {
    /// Limits derived from an optional worker override and call timeout.
    ///
    /// The worker count is always within `1..=min(4, available_parallelism)`; an override can
    /// only lower it.
    pub fn new(max_workers: Option<usize>, call_timeout: Option<Duration>) -> Self {
        let ceiling = default_worker_limit();
        Self {
            max_workers: max_workers.map_or(ceiling, |requested| requested.clamp(1, ceiling)),
            call_timeout,
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `min(4, max(1, available_parallelism))`.
pub fn default_worker_limit() -> usize {
    let available = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    MAX_CHUNK_WORKERS.min(available.max(1))
}
