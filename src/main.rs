//! Command-line entrypoint: summarize one resume and print or save the result.
use anyhow::{Context, Result};
use clap::Parser;
use resume_digest::{
    chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    config, logging,
    extract::DocumentExtractor,
    inference::OllamaLoader,
    pipeline::{
        DEFAULT_MAX_NEW_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, ExecutionLimits, Pipeline,
        RunConfig,
    },
};
use std::{fs, path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(
    name = "resume-digest",
    about = "Summarize a resume through a local language model"
)]
struct Cli {
    /// Path to the resume (PDF or plain text).
    #[arg(long = "pdf", value_name = "DOCUMENT")]
    document: PathBuf,
    /// Model identifier (defaults to RESUME_SUMMARY_MODEL, then the built-in default).
    #[arg(long)]
    model: Option<String>,
    /// Chunk size in characters.
    #[arg(long = "max-chunk", default_value_t = DEFAULT_CHUNK_SIZE)]
    max_chunk: usize,
    /// Overlap between chunks in characters.
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,
    /// Max new tokens for chunk summaries.
    #[arg(long, default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    max_new_tokens: usize,
    /// Sampling temperature (0 = greedy).
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,
    /// Top-p nucleus sampling.
    #[arg(long, default_value_t = DEFAULT_TOP_P)]
    top_p: f32,
    /// Optional path to write the final summary.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load configuration")?;
    logging::init_tracing();
    tracing::debug!(
        ollama_url = %config.ollama_url,
        model = %config.model,
        request_timeout = ?config.request_timeout,
        max_workers = ?config.max_workers,
        "Loaded configuration"
    );

    let loader = OllamaLoader::new(config.ollama_url.clone())
        .context("failed to initialize inference backend")?;
    let pipeline = Pipeline::new(Arc::new(DocumentExtractor), Arc::new(loader)).with_limits(
        ExecutionLimits::new(config.max_workers, config.request_timeout),
    );

    let run_config = RunConfig {
        document_path: cli.document,
        model_id: cli.model.unwrap_or(config.model),
        chunk_size: cli.max_chunk,
        chunk_overlap: cli.overlap,
        max_new_tokens: cli.max_new_tokens,
        temperature: cli.temperature,
        top_p: cli.top_p,
    };

    let state = pipeline.run(run_config).await?;
    let summary = state.final_summary().unwrap_or_default();
    if summary.is_empty() {
        println!("No summary produced.");
        return Ok(());
    }

    match cli.output {
        Some(path) => {
            fs::write(&path, summary)
                .with_context(|| format!("failed to write summary to {}", path.display()))?;
            println!("Summary written to: {}", path.display());
        }
        None => {
            println!("\n===== Comprehensive Resume Summary =====\n");
            println!("{summary}");
        }
    }

    Ok(())
}
