use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use resume_digest::{
    extract::DocumentExtractor,
    inference::{BackendLoader, GenerationRequest, InferenceBackend, InferenceError},
    pipeline::{ExecutionLimits, Pipeline, PipelineError, RunConfig},
};
use tempfile::NamedTempFile;

const CHUNK_FRAMING: &str = "You are an expert technical recruiter";
const SYNTHESIS_FRAMING: &str = "You are an expert resume analyst";

/// Echoes every prompt; chunk prompts answer `CHUNK SUMMARY`, synthesis answers `FINAL`.
#[derive(Default)]
struct RecordingBackend {
    fail_on: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    fn synthesis_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|prompt| prompt.starts_with(SYNTHESIS_FRAMING))
            .collect()
    }
}

#[async_trait]
impl InferenceBackend for RecordingBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InferenceError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(request.prompt.clone());

        if let Some(needle) = self.fail_on {
            if request.prompt.contains(needle) {
                return Err(InferenceError::GenerationFailed(format!(
                    "backend exploded on {needle}"
                )));
            }
        }

        let answer = if request.prompt.starts_with(CHUNK_FRAMING) {
            "CHUNK SUMMARY"
        } else {
            "FINAL"
        };
        Ok(format!("{}{answer}", request.prompt))
    }
}

struct RecordingLoader {
    backend: Arc<RecordingBackend>,
    loads: AtomicUsize,
}

impl RecordingLoader {
    fn new(backend: RecordingBackend) -> Arc<Self> {
        Arc::new(Self {
            backend: Arc::new(backend),
            loads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl BackendLoader for RecordingLoader {
    async fn load(&self, _model: &str) -> Result<Arc<dyn InferenceBackend>, InferenceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let backend: Arc<dyn InferenceBackend> = self.backend.clone();
        Ok(backend)
    }
}

fn resume_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write resume");
    file
}

fn pipeline(loader: Arc<RecordingLoader>) -> Pipeline {
    Pipeline::new(Arc::new(DocumentExtractor), loader)
        .with_limits(ExecutionLimits::new(Some(4), None))
}

#[tokio::test]
async fn single_chunk_resume_flows_through_every_stage() {
    let resume = resume_file("A. B. C.");
    let loader = RecordingLoader::new(RecordingBackend::default());

    let state = pipeline(loader.clone())
        .run(RunConfig::new(resume.path(), "test-model"))
        .await
        .expect("run");

    assert_eq!(state.raw_text(), Some("A. B. C."));
    assert_eq!(state.chunks(), Some(&["A. B. C.".to_string()][..]));
    assert_eq!(
        state.chunk_summaries(),
        Some(&["CHUNK SUMMARY".to_string()][..])
    );
    assert_eq!(state.final_summary(), Some("FINAL"));

    let synthesis = loader.backend.synthesis_prompts();
    assert_eq!(synthesis.len(), 1);
    assert!(synthesis[0].contains("Partial summaries:\n- CHUNK SUMMARY\n\n"));
    assert_eq!(loader.backend.prompts().len(), 2);
}

#[tokio::test]
async fn empty_resume_still_reaches_synthesis() {
    let resume = resume_file("   \n\n  ");
    let loader = RecordingLoader::new(RecordingBackend::default());

    let state = pipeline(loader.clone())
        .run(RunConfig::new(resume.path(), "test-model"))
        .await
        .expect("run");

    assert_eq!(state.raw_text(), Some(""));
    assert_eq!(state.chunks().map(<[String]>::len), Some(0));
    assert_eq!(state.chunk_summaries().map(<[String]>::len), Some(0));
    assert_eq!(state.final_summary(), Some("FINAL"));

    let prompts = loader.backend.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Partial summaries:\n\n\nRequirements:"));
    // Only the synthesis stage loads a model when there are no chunks.
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chunk_failure_aborts_without_partial_results() {
    let resume = resume_file("alpha\n\nbravo\n\ncharlie\n\ndelta\n\necho");
    let loader = RecordingLoader::new(RecordingBackend {
        fail_on: Some("charlie"),
        ..RecordingBackend::default()
    });
    let mut config = RunConfig::new(resume.path(), "test-model");
    config.chunk_size = 9;
    config.chunk_overlap = 0;

    let error = pipeline(loader.clone()).run(config).await.unwrap_err();

    assert!(matches!(
        error,
        PipelineError::Inference(InferenceError::GenerationFailed(ref message))
            if message == "backend exploded on charlie"
    ));
    assert!(loader.backend.synthesis_prompts().is_empty());
}

#[tokio::test]
async fn multi_chunk_summaries_keep_document_order() {
    let sections = [
        "Experience: built payment rails at Acme for five years.",
        "Skills: Rust, Kubernetes, PostgreSQL, and distributed tracing.",
        "Education: BSc Computer Science, University of Somewhere.",
    ];
    let resume = resume_file(&sections.join("\n\n"));
    let loader = RecordingLoader::new(RecordingBackend::default());
    let mut config = RunConfig::new(resume.path(), "test-model");
    config.chunk_size = 80;
    config.chunk_overlap = 10;

    let state = pipeline(loader.clone()).run(config).await.expect("run");

    let chunks = state.chunks().expect("chunks");
    assert_eq!(chunks.len(), 3);
    for (chunk, section) in chunks.iter().zip(sections) {
        assert!(chunk.ends_with(section), "{chunk:?} should end with {section:?}");
    }
    let summaries = state.chunk_summaries().expect("summaries");
    assert_eq!(summaries.len(), chunks.len());
    assert!(summaries.iter().all(|summary| summary == "CHUNK SUMMARY"));
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_resume_is_reported_before_any_stage() {
    let loader = RecordingLoader::new(RecordingBackend::default());
    let error = pipeline(loader.clone())
        .run(RunConfig::new("/no/such/resume.pdf", "test-model"))
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::DocumentNotFound(_)));
    assert!(error.to_string().contains("/no/such/resume.pdf"));
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
}
