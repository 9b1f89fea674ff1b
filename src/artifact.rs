//! Persisted artifact types and JSON I/O.
//!
//! Three artifacts leave the pipeline, all JSON arrays:
//!
//! * **OCR-per-page** ([`OcrPageRecord`]) — one file per uploaded document,
//!   written during ingestion; records the page image, its OCR text, and any
//!   exported figure crops.
//! * **Cleaned pages** ([`CleanedPage`]) — the canonical merged batch; the
//!   only artifact downstream QA stages ever read.
//! * **QA dataset** ([`QaRecord`]) — the final training data.
//!
//! Every write is atomic (temp file + rename) so a crash mid-export never
//! leaves a truncated artifact that a later run would pick up as "latest".

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One merged, normalised page — element of the cleaned-pages artifact.
///
/// Immutable once written: downstream stages treat the cleaned artifact as
/// read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedPage {
    /// Batch-wide page number, strictly increasing across all documents.
    pub page_number: u32,
    /// Raw OCR output, whitespace-trimmed with newlines flattened.
    pub raw_text: String,
    /// Deterministically normalised text; the chunker's input.
    pub clean_text: String,
    /// Whitespace-delimited token count of `raw_text`.
    pub word_count: usize,
    /// Name of the uploaded PDF this page came from.
    pub source_pdf: String,
}

/// One page of the per-document ingestion artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrPageRecord {
    /// Page number within the source document (1-indexed).
    pub page_number: u32,
    /// Rasterised page image path.
    pub page_image: PathBuf,
    /// Raw OCR text for the page (may be empty if OCR failed).
    pub ocr_text: String,
    /// Exported figure-crop paths, in detection order.
    pub detected_images: Vec<PathBuf>,
}

/// One accepted question-answer pair — element of the final dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    /// Batch-wide page number of the source chunk.
    pub page_number: u32,
    pub question: String,
    pub answer: String,
    /// The chunk text the question was generated from.
    pub context: String,
}

/// Serialise `value` as pretty JSON and write it atomically to `path`.
///
/// Writes to `<path>.tmp` first, then renames. The parent directory is
/// created if missing (idempotently).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| PipelineError::Internal(format!("JSON serialise: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::ArtifactWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| PipelineError::ArtifactWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| PipelineError::ArtifactWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Load and parse a cleaned-pages artifact.
pub fn read_cleaned(path: &Path) -> Result<Vec<CleanedPage>, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::ArtifactRead {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::ArtifactRead {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
