#![deny(missing_docs)]

//! Core library for Resume Digest: map-reduce summarization of resumes.

/// Boundary-aware chunking with overlap.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Document text extraction.
pub mod extract;
/// Inference backend abstraction and the Ollama adapter.
pub mod inference;
/// Structured logging and tracing setup.
pub mod logging;
/// Stage orchestration and concurrency control.
pub mod pipeline;
/// Prompt templates and output cleanup.
pub mod prompts;
