//! Error types for the pdf2qa library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot proceed at all (corrupt
//!   source PDF, no cleaned artifact to fall back on, output write failure).
//!   Returned as `Err(PipelineError)` from the top-level [`crate::run::run`]
//!   entry points.
//!
//! * [`ChunkSkip`] — **Recovered**: one chunk's QA synthesis failed, was
//!   abandoned, and the run continued with the next chunk. Collected into
//!   [`crate::run::RunOutput::skipped_chunks`] so callers can inspect what
//!   was dropped instead of losing that information to a log line.
//!
//! OCR failures and unreadable page images are also recovered, but carry no
//! payload worth returning: the page simply gets empty text or an empty
//! region list, and the event is logged with the page number.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2qa library.
///
/// Per-chunk synthesis failures use [`ChunkSkip`] and are collected in
/// [`crate::run::RunOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Ingestion errors ──────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The source document could not be parsed (corrupt or not a PDF).
    ///
    /// Fatal for the run: a batch that cannot be rasterised produces no
    /// pages to clean or annotate.
    #[error("Cannot ingest '{path}': {detail}")]
    Ingestion { path: PathBuf, detail: String },

    /// A page failed to rasterise.
    #[error("Rasterisation failed for page {page} of '{path}': {detail}")]
    RasterisationFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    // ── Artifact errors ───────────────────────────────────────────────────
    /// No documents were supplied and no cleaned artifact exists on disk.
    #[error(
        "No cleaned artifact found in '{dir}'\n\
         Upload documents first, or point the run at an existing *_cleaned.json."
    )]
    NoCleanedArtifact { dir: PathBuf },

    /// A cleaned-pages artifact exists but could not be read or parsed.
    #[error("Failed to read cleaned artifact '{path}': {detail}")]
    ArtifactRead { path: PathBuf, detail: String },

    /// Could not create or write an output artifact.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
         Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Record of one chunk whose QA synthesis was abandoned.
///
/// The synthesiser never aborts a document on a single bad chunk; it emits
/// one of these and moves on. The orchestrator aggregates them so the final
/// report can say *which* chunks were dropped and why.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Page {page_number}, chunk {chunk_index}: {reason}")]
pub struct ChunkSkip {
    /// Batch-wide page number the chunk came from.
    pub page_number: u32,
    /// Zero-based chunk ordinal within the page.
    pub chunk_index: usize,
    /// Human-readable failure description from the capability call.
    pub reason: String,
}
