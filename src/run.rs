//! Orchestrator: sequence the full document-to-dataset pipeline.
//!
//! One call to [`run`] drives a whole batch through
//! `Idle → Ingest → Clean → Annotate → Export → Done`, with a terminal
//! `Failed` reachable from any stage on an unrecovered error. Stage
//! transitions emit `(message, percent)` events through the injected
//! [`ProgressReporter`]; the orchestrator guards the percent sequence so it
//! never decreases within a run (0 → 20 → 50 → 70 → 95 → 100 by default).
//!
//! ## Invocation modes
//!
//! Exactly one of three, chosen by [`RunInput`]:
//!
//! * **Documents** — raw PDFs: runs every stage.
//! * **CleanedArtifact** — an existing cleaned-pages file: skips
//!   Ingest/Clean.
//! * **Latest** — neither: falls back to the most recently modified
//!   `*_cleaned.json` in the store. Note this silently reuses prior data;
//!   the chosen path is reported so callers can surface it.
//!
//! ## Execution model
//!
//! Fully sequential and blocking: pages one at a time, chunks within a page
//! one at a time, capability calls awaited before the next begins. There is
//! no cancellation mid-run — a long capability call cannot be interrupted.
//! The pipeline is I/O- and inference-bound, and one run serves one small
//! uploaded batch, so sequential execution keeps the failure and ordering
//! semantics trivial to reason about.

use crate::artifact::{self, CleanedPage, OcrPageRecord, QaRecord};
use crate::capability::{AnswerExtractor, QuestionGenerator, TextRecognizer};
use crate::config::PipelineConfig;
use crate::error::{ChunkSkip, PipelineError};
use crate::merge::{self, DocumentPages, MergeState};
use crate::pipeline::chunk::Chunker;
use crate::pipeline::regions::RegionFilter;
use crate::pipeline::{extract, rasterize, regions};
use crate::progress::{Progress, ProgressGuard};
use crate::qa::filter::QualityFilter;
use crate::qa::{ChunkOutcome, QaSynthesizer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What the run starts from. The three modes are mutually exclusive by
/// construction.
#[derive(Debug, Clone)]
pub enum RunInput {
    /// Raw uploaded PDFs, processed in the given (upload) order.
    Documents(Vec<PathBuf>),
    /// An existing cleaned-pages artifact; Ingest/Clean are skipped.
    CleanedArtifact(PathBuf),
    /// Auto-select the latest cleaned artifact from the store.
    Latest,
}

/// Pipeline stages, in order. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Ingest,
    Clean,
    Annotate,
    Export,
    Done,
    Failed,
}

impl Stage {
    /// Default progress percentage reported on entering the stage.
    pub fn percent(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::Ingest => 20,
            Stage::Clean => 50,
            Stage::Annotate => 70,
            Stage::Export => 95,
            Stage::Done => 100,
            Stage::Failed => 100,
        }
    }
}

/// Default extractive-QA model used by [`Capabilities::from_config`].
const DEFAULT_EXTRACTOR_MODEL: &str = "deberta-v3-base-squad2";

/// The external capabilities a run needs.
///
/// All three are trait objects so tests and embedded deployments can inject
/// stubs; [`Capabilities::from_config`] wires up the HTTP/Tesseract
/// defaults for production use.
#[derive(Clone)]
pub struct Capabilities {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub extractor: Arc<dyn AnswerExtractor>,
}

impl Capabilities {
    /// Build the default capability set from configuration.
    ///
    /// Question generation and answer extraction need
    /// `config.inference_endpoint`. OCR uses Tesseract when the `tesseract`
    /// feature is enabled; otherwise a placeholder recognizer whose
    /// failures the OCR adapter contains into empty page text — fine for
    /// runs that start from an existing cleaned artifact.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let endpoint = config.inference_endpoint.as_deref().ok_or_else(|| {
            PipelineError::InvalidConfig(
                "no inference endpoint configured; set PDF2QA_INFERENCE_ENDPOINT \
                 or inject capabilities directly"
                    .into(),
            )
        })?;
        let token = std::env::var("PDF2QA_API_TOKEN").ok().filter(|t| !t.is_empty());

        let generator = crate::capability::http::HttpQuestionGenerator::new(
            endpoint,
            &config.generator_model,
            token.clone(),
            config.questions_per_chunk,
            config.api_timeout_secs,
            config.max_retries,
            config.retry_backoff_ms,
        )
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

        let extractor = crate::capability::http::HttpAnswerExtractor::new(
            endpoint,
            DEFAULT_EXTRACTOR_MODEL,
            token,
            config.api_timeout_secs,
            config.max_retries,
            config.retry_backoff_ms,
        )
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

        #[cfg(feature = "tesseract")]
        let recognizer: Arc<dyn TextRecognizer> =
            Arc::new(crate::capability::tesseract::TesseractOcr::default());
        #[cfg(not(feature = "tesseract"))]
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(crate::capability::NoOcr);

        Ok(Self {
            recognizer,
            generator: Arc::new(generator),
            extractor: Arc::new(extractor),
        })
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutput {
    /// Named output artifacts: `"cleaned"` and `"qa"`.
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Number of QA pairs that passed the quality filter.
    pub accepted_pairs: usize,
    /// Chunks abandoned during synthesis, with reasons.
    pub skipped_chunks: Vec<ChunkSkip>,
    /// Set when the run succeeded but produced zero QA pairs.
    pub warning: Option<String>,
}

/// Run the full pipeline for one batch.
///
/// Returns `Ok` even when individual pages or chunks were recovered
/// (empty OCR text, skipped chunks, zero accepted pairs — see
/// [`RunOutput::warning`]). Returns `Err` only on fatal conditions: a
/// document that cannot be ingested, a missing cleaned artifact in
/// [`RunInput::Latest`] mode, or an artifact write failure.
pub async fn run(
    input: RunInput,
    config: &PipelineConfig,
    capabilities: &Capabilities,
    progress: Progress,
) -> Result<RunOutput, PipelineError> {
    let guard = ProgressGuard::new(progress);
    match run_inner(input, config, capabilities, &guard).await {
        Ok(output) => Ok(output),
        Err(e) => {
            // Terminal Failed state: report at the current high-water mark
            // (percent 0 is clamped up), then surface the error.
            guard.report(&format!("Run failed: {e}"), 0);
            Err(e)
        }
    }
}

async fn run_inner(
    input: RunInput,
    config: &PipelineConfig,
    capabilities: &Capabilities,
    guard: &ProgressGuard,
) -> Result<RunOutput, PipelineError> {
    let mut stage = Stage::Idle;
    guard.report("Starting annotation and QA pipeline", stage.percent());

    let layout = config.layout();
    layout.ensure().map_err(|e| PipelineError::ArtifactWrite {
        path: config.data_dir.clone(),
        source: e,
    })?;

    let mut artifacts = BTreeMap::new();

    // ── Ingest + Clean (or artifact lookup) ──────────────────────────────
    let (pages, cleaned_path) = match input {
        RunInput::Documents(docs) => {
            stage = Stage::Ingest;
            guard.report("Running OCR and PDF ingestion", stage.percent());
            let ingested = ingest_documents(&docs, config, capabilities).await?;

            stage = Stage::Clean;
            let mut state = MergeState::new();
            let pages = merge::merge_documents(&ingested, &mut state);
            let cleaned_path = merge::write_cleaned(&pages, &layout.cleaned_dir)?;
            guard.report(
                "PDF ingestion and text cleaning completed",
                stage.percent(),
            );
            (pages, cleaned_path)
        }
        RunInput::CleanedArtifact(path) => {
            stage = Stage::Clean;
            guard.report("Using provided cleaned artifact", Stage::Ingest.percent());
            let pages = artifact::read_cleaned(&path)?;
            guard.report("Cleaned pages loaded", stage.percent());
            (pages, path)
        }
        RunInput::Latest => {
            stage = Stage::Clean;
            let path = merge::latest_cleaned_file(&layout.cleaned_dir)?;
            info!("auto-selected cleaned artifact: {}", path.display());
            guard.report(
                &format!("Using latest cleaned artifact: {}", path.display()),
                Stage::Ingest.percent(),
            );
            let pages = artifact::read_cleaned(&path)?;
            guard.report("Cleaned pages loaded", stage.percent());
            (pages, path)
        }
    };
    artifacts.insert("cleaned".to_string(), cleaned_path.clone());

    // ── Annotate ─────────────────────────────────────────────────────────
    stage = Stage::Annotate;
    guard.report("Running annotation and QA generation", stage.percent());

    let (records, skipped_chunks) = annotate_pages(&pages, config, capabilities).await;

    // ── Export ───────────────────────────────────────────────────────────
    stage = Stage::Export;
    guard.report(
        "Annotation and QA generation completed",
        stage.percent(),
    );

    let qa_path = qa_artifact_path(&cleaned_path, &layout.final_dir);
    artifact::write_json(&qa_path, &records)?;
    artifacts.insert("qa".to_string(), qa_path);

    let warning = if records.is_empty() {
        let msg = "No QA pairs passed the quality filter. \
                   Try adjusting the thresholds or check the input data."
            .to_string();
        warn!("{msg}");
        guard.report(&msg, stage.percent());
        Some(msg)
    } else {
        None
    };

    info!(
        "run complete: {} QA pair(s) accepted, {} chunk(s) skipped",
        records.len(),
        skipped_chunks.len()
    );

    stage = Stage::Done;
    guard.report("Finalizing outputs", stage.percent());

    Ok(RunOutput {
        artifacts,
        accepted_pairs: records.len(),
        skipped_chunks,
        warning,
    })
}

/// Ingest each document: rasterise, detect regions, OCR, and write the
/// per-document OCR artifact. Returns the raw page texts in upload order.
async fn ingest_documents(
    docs: &[PathBuf],
    config: &PipelineConfig,
    capabilities: &Capabilities,
) -> Result<Vec<DocumentPages>, PipelineError> {
    let layout = config.layout();
    let region_filter = RegionFilter {
        min_area: config.min_region_area,
        min_width: config.min_region_width,
        min_height: config.min_region_height,
    };

    let mut ingested = Vec::with_capacity(docs.len());

    for doc_path in docs {
        let name = doc_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        let stem = doc_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        keep_raw_copy(doc_path, &layout.raw_dir, &name);

        let page_images = rasterize::rasterize(
            doc_path,
            &layout.pages_dir,
            config.dpi,
            config.max_rendered_pixels,
        )
        .await?;
        info!("'{name}': rasterised {} page(s)", page_images.len());

        let crops_dir = layout.crops_for(&stem);
        let mut raw_pages = Vec::with_capacity(page_images.len());
        let mut ocr_records = Vec::with_capacity(page_images.len());

        for page in &page_images {
            let detected = regions::detect_regions(
                &page.path,
                &crops_dir,
                &format!("{stem}_p{}", page.page_number),
                region_filter,
            )
            .await;
            info!(
                "'{name}' page {}: {} region(s) detected",
                page.page_number,
                detected.len()
            );

            let ocr_text =
                extract::extract_text(&capabilities.recognizer, &page.path, page.page_number)
                    .await;

            ocr_records.push(OcrPageRecord {
                page_number: page.page_number,
                page_image: page.path.clone(),
                ocr_text: ocr_text.clone(),
                detected_images: detected.into_iter().map(|r| r.crop_path).collect(),
            });
            raw_pages.push(ocr_text);
        }

        let ocr_path = layout.ocr_json_dir.join(format!("{stem}.json"));
        artifact::write_json(&ocr_path, &ocr_records)?;

        ingested.push(DocumentPages { name, raw_pages });
    }

    Ok(ingested)
}

/// Chunk every page, synthesise candidates, and filter. Chunks are
/// processed strictly one at a time; a skipped chunk never affects its
/// siblings.
async fn annotate_pages(
    pages: &[CleanedPage],
    config: &PipelineConfig,
    capabilities: &Capabilities,
) -> (Vec<QaRecord>, Vec<ChunkSkip>) {
    let chunker = Chunker::new(config.chunk_max_chars);
    let synthesizer = QaSynthesizer::new(
        Arc::clone(&capabilities.generator),
        Arc::clone(&capabilities.extractor),
        config.questions_per_chunk,
    );
    let filter = QualityFilter::new(config.min_answer_score, config.min_answer_length);

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for page in pages {
        for (chunk_index, chunk) in chunker.chunks(&page.clean_text).enumerate() {
            match synthesizer
                .synthesize_chunk(page.page_number, chunk_index, chunk)
                .await
            {
                ChunkOutcome::Candidates(candidates) => {
                    for candidate in candidates {
                        if filter.accepts(&candidate) {
                            records.push(QualityFilter::into_record(candidate));
                        }
                    }
                }
                ChunkOutcome::Skipped(skip) => skipped.push(skip),
            }
        }
    }

    (records, skipped)
}

/// Derive the QA artifact path from the cleaned artifact's name:
/// `combined_cleaned.json` → `combined_qa.json`.
fn qa_artifact_path(cleaned_path: &Path, final_dir: &Path) -> PathBuf {
    let stem = cleaned_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "combined".to_string());
    let base = stem.strip_suffix("_cleaned").unwrap_or(&stem);
    final_dir.join(format!("{base}_qa.json"))
}

/// Keep a copy of the upload in the raw store. Best-effort: a failed copy
/// is logged, not fatal, since the pipeline reads the original path.
fn keep_raw_copy(doc_path: &Path, raw_dir: &Path, name: &str) {
    let dest = raw_dir.join(name);
    if dest == doc_path {
        return;
    }
    if let Err(e) = std::fs::copy(doc_path, &dest) {
        warn!("could not copy '{name}' into raw store: {e}");
    }
}

/// Persist in-memory uploads into the raw store.
///
/// Front-ends receive uploads as `(filename, bytes)` pairs; this writes each
/// into the configured raw directory and returns the paths, ready to feed
/// to [`RunInput::Documents`] in the same order.
pub fn store_uploads(
    uploads: &[(String, Vec<u8>)],
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>, PipelineError> {
    let raw_dir = config.layout().raw_dir;
    std::fs::create_dir_all(&raw_dir).map_err(|e| PipelineError::ArtifactWrite {
        path: raw_dir.clone(),
        source: e,
    })?;

    let mut paths = Vec::with_capacity(uploads.len());
    for (name, bytes) in uploads {
        let path = raw_dir.join(name);
        std::fs::write(&path, bytes).map_err(|e| PipelineError::ArtifactWrite {
            path: path.clone(),
            source: e,
        })?;
        paths.push(path);
    }
    Ok(paths)
}
