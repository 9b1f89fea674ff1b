//! # pdf2qa
//!
//! Convert PDF documents into question-answer training datasets.
//!
//! ## Why this crate?
//!
//! Fine-tuning a QA model needs (question, answer, context) triples, and
//! most source material is locked up in PDFs — often scanned ones. This
//! crate turns an uploaded batch of PDFs into a clean JSON dataset through
//! a deterministic batch pipeline: rasterise pages, detect and export
//! figure regions, OCR the text, normalise and merge it, chunk it, and
//! drive external question-generation and answer-extraction capabilities
//! over the chunks, keeping only the pairs that pass a quality filter.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Ingest    rasterise pages via pdfium (CPU-bound, spawn_blocking),
//!  │               detect figure regions, OCR each page
//!  ├─ 2. Clean     normalise text, merge documents into one numbered batch
//!  ├─ 3. Annotate  chunk each page, generate questions, extract answers
//!  ├─ 4. Filter    keep pairs with score ≥ threshold and non-trivial answers
//!  └─ 5. Export    cleaned-pages artifact + QA dataset artifact (JSON)
//! ```
//!
//! Execution is strictly sequential — one page, one chunk, one capability
//! call at a time. The pipeline is inference-bound, and sequential
//! processing keeps ordering and failure semantics simple: fatal errors
//! abort the run, everything else (a failed OCR, an unreadable page image,
//! a chunk whose synthesis errored) is contained and reported.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2qa::{run, Capabilities, PipelineConfig, RunInput};
//! use pdf2qa::progress::{FnProgress, Progress};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::from_env()?;
//!     let capabilities = Capabilities::from_config(&config)?;
//!     let progress: Progress =
//!         Arc::new(FnProgress::new(|msg, pct| eprintln!("[{pct:>3}%] {msg}")));
//!
//!     let output = run(
//!         RunInput::Documents(vec!["manual.pdf".into()]),
//!         &config,
//!         &capabilities,
//!         progress,
//!     )
//!     .await?;
//!
//!     println!("{} QA pairs → {:?}", output.accepted_pairs, output.artifacts["qa"]);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `pdf2qa` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `tesseract` | off     | Local Tesseract OCR backend via leptess (needs system libtesseract) |
//!
//! Without `tesseract`, inject your own [`capability::TextRecognizer`] —
//! the pipeline is backend-agnostic by design.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod capability;
pub mod config;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod qa;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{CleanedPage, OcrPageRecord, QaRecord};
pub use config::{DataLayout, PipelineConfig, PipelineConfigBuilder};
pub use error::{ChunkSkip, PipelineError};
pub use progress::{NoopProgress, Progress, ProgressReporter};
pub use run::{run, store_uploads, Capabilities, RunInput, RunOutput, Stage};
