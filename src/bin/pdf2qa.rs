//! CLI binary for pdf2qa.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, renders progress events, and prints artifact paths.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2qa::progress::{Progress, ProgressReporter};
use pdf2qa::{run, Capabilities, NoopProgress, PipelineConfig, RunInput};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress reporter using indicatif ────────────────────────────────────

/// Terminal progress reporter: renders the orchestrator's `(message,
/// percent)` events as a live 0–100 bar with the current stage message.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:42.green/238}] {pos:>3}%  {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn report(&self, message: &str, percent: u8) {
        self.bar.set_position(percent as u64);
        self.bar.set_message(message.to_string());
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build a QA dataset from two PDFs
  pdf2qa manual.pdf appendix.pdf

  # Re-annotate an existing cleaned artifact (skips OCR)
  pdf2qa --cleaned data/cleaned/combined_cleaned.json

  # No inputs: reuse the most recent cleaned artifact in the store
  pdf2qa

  # Stricter filtering
  pdf2qa --min-answer-score 0.8 --min-answer-length 5 manual.pdf

ENVIRONMENT VARIABLES:
  PDF2QA_INFERENCE_ENDPOINT  Base URL of the hosted inference endpoint
  PDF2QA_API_TOKEN           Bearer token for the endpoint (optional)
  PDF2QA_GENERATOR_MODEL     Question-generation model id
  PDF2QA_DATA_DIR            Data store root (default: data)
  PDF2QA_MIN_ANSWER_SCORE    Quality filter score threshold
  PDF2QA_MIN_ANSWER_LENGTH   Quality filter answer-length threshold
  PDFIUM_LIB_PATH            Path to an existing libpdfium

SETUP:
  1. Point at an inference endpoint:
       export PDF2QA_INFERENCE_ENDPOINT=https://api-inference.example.net
  2. Run:
       pdf2qa manual.pdf

  OCR requires building with `--features tesseract` (needs libtesseract),
  or embedding the library and injecting your own TextRecognizer.
"#;

/// Convert PDF documents into a question-answer training dataset.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2qa",
    version,
    about = "Convert PDF documents into a question-answer training dataset",
    long_about = "Convert uploaded PDF documents into a QA training dataset: rasterise \
pages, detect figure regions, OCR and normalise the text, merge the batch, and generate \
filtered question-answer pairs via external model capabilities.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to ingest. Empty: reuse a cleaned artifact instead.
    pdfs: Vec<PathBuf>,

    /// Annotate this cleaned-pages artifact instead of ingesting PDFs.
    #[arg(long, conflicts_with = "pdfs")]
    cleaned: Option<PathBuf>,

    /// Data store root directory.
    #[arg(long, env = "PDF2QA_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "PDF2QA_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Minimum figure-region area in px².
    #[arg(long, env = "PDF2QA_MIN_REGION_AREA", default_value_t = 5000)]
    min_region_area: u32,

    /// Maximum chunk size in characters.
    #[arg(long, env = "PDF2QA_CHUNK_MAX_CHARS", default_value_t = 1000)]
    chunk_max_chars: usize,

    /// Candidate questions requested per chunk.
    #[arg(long, env = "PDF2QA_QUESTIONS_PER_CHUNK", default_value_t = 3)]
    questions_per_chunk: usize,

    /// Minimum answer confidence score for a pair to be kept.
    #[arg(long, env = "PDF2QA_MIN_ANSWER_SCORE", default_value_t = 0.5)]
    min_answer_score: f32,

    /// Minimum trimmed answer length in characters.
    #[arg(long, env = "PDF2QA_MIN_ANSWER_LENGTH", default_value_t = 3)]
    min_answer_length: usize,

    /// Base URL of the inference endpoint.
    #[arg(long, env = "PDF2QA_INFERENCE_ENDPOINT")]
    endpoint: Option<String>,

    /// Question-generation model id.
    #[arg(long, env = "PDF2QA_GENERATOR_MODEL", default_value = "t5-base-qg")]
    model: String,

    /// Print the run summary as JSON instead of human-readable text.
    #[arg(long, env = "PDF2QA_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2QA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2QA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2QA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = PipelineConfig::builder()
        .dpi(cli.dpi)
        .min_region_area(cli.min_region_area)
        .chunk_max_chars(cli.chunk_max_chars)
        .questions_per_chunk(cli.questions_per_chunk)
        .min_answer_score(cli.min_answer_score)
        .min_answer_length(cli.min_answer_length)
        .generator_model(cli.model.clone())
        .data_dir(cli.data_dir.clone());
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.inference_endpoint(endpoint.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let capabilities = Capabilities::from_config(&config)
        .context("Cannot initialise model capabilities")?;

    // ── Select invocation mode ───────────────────────────────────────────
    let input = if !cli.pdfs.is_empty() {
        if cfg!(not(feature = "tesseract")) {
            eprintln!(
                "{} built without the `tesseract` feature — ingested pages will have \
                 empty OCR text",
                yellow("⚠")
            );
        }
        RunInput::Documents(cli.pdfs.clone())
    } else if let Some(ref cleaned) = cli.cleaned {
        RunInput::CleanedArtifact(cleaned.clone())
    } else {
        RunInput::Latest
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let cli_progress = if show_progress { Some(CliProgress::new()) } else { None };
    let progress: Progress = match &cli_progress {
        Some(p) => Arc::clone(p) as Progress,
        None => Arc::new(NoopProgress) as Progress,
    };

    let output = run(input, &config, &capabilities, progress)
        .await
        .context("Pipeline run failed")?;

    if let Some(p) = &cli_progress {
        p.finish();
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let summary = serde_json::json!({
            "artifacts": output.artifacts,
            "accepted_pairs": output.accepted_pairs,
            "skipped_chunks": output.skipped_chunks,
            "warning": output.warning,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{} {} QA pair(s) accepted",
            green("✔"),
            bold(&output.accepted_pairs.to_string())
        );
        if !output.skipped_chunks.is_empty() {
            eprintln!(
                "{} {} chunk(s) skipped during synthesis",
                yellow("⚠"),
                output.skipped_chunks.len()
            );
        }
        if let Some(ref warning) = output.warning {
            eprintln!("{} {}", yellow("⚠"), warning);
        }
        for (name, path) in &output.artifacts {
            eprintln!("   {}  {}", dim(name), path.display());
        }
    }

    Ok(())
}
