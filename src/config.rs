//! Configuration types for the PDF-to-QA-dataset pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`] or loaded from `PDF2QA_*` environment
//! variables. Keeping every knob in one struct makes it trivial to share
//! configs across runs, serialise them for logging, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`], [`PipelineConfig::default()`], or
/// [`PipelineConfig::from_env()`].
///
/// # Example
/// ```rust
/// use pdf2qa::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .dpi(300)
///     .chunk_max_chars(800)
///     .min_answer_score(0.6)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// OCR engines want more pixel density than a human reader: 300 DPI keeps
    /// 9-pt body text legible to Tesseract-class recognisers. Lower it for
    /// born-digital PDFs with large type if rasterisation time matters.
    pub dpi: u32,

    /// Maximum rendered page dimension (width or height) in pixels. Default: 4000.
    ///
    /// A safety cap independent of DPI. A 300-DPI render of an A0 poster
    /// would produce a 28 000 px wide image and exhaust memory. This caps
    /// either dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Minimum bounding-box area (px²) for a detected figure region. Default: 5000.
    ///
    /// Anything smaller is edge noise: stray marks, bullet glyphs, speckle
    /// from scanning. 5000 px² at 300 DPI is roughly a 6 mm square.
    pub min_region_area: u32,

    /// Minimum region width in pixels. Default: 50.
    pub min_region_width: u32,

    /// Minimum region height in pixels. Default: 50.
    ///
    /// The width/height floors reject thin rules and table borders that pass
    /// the area test but are not figures.
    pub min_region_height: u32,

    /// Maximum chunk size in characters. Default: 1000.
    ///
    /// Sized to fit the generation capability's input window with headroom.
    /// The capability truncates internally as a last resort; the chunker is
    /// what keeps questions anchored to a focused span of text.
    pub chunk_max_chars: usize,

    /// Maximum candidate questions requested per chunk (K). Default: 3.
    pub questions_per_chunk: usize,

    /// Minimum answer confidence score for a QA pair to be kept. Default: 0.5.
    ///
    /// Compared against the extraction capability's confidence, which for
    /// extractive QA models lives in [0, 1].
    pub min_answer_score: f32,

    /// Minimum trimmed answer length in characters. Default: 3.
    ///
    /// Extractive models occasionally return a bare punctuation mark or a
    /// single stopword with high confidence; the length floor drops those.
    pub min_answer_length: usize,

    /// Identifier of the question-generation capability (model name or
    /// endpoint-specific id). Default: "t5-base-qg".
    pub generator_model: String,

    /// Base URL of the inference endpoint hosting the generation and
    /// extraction capabilities. `None` means the caller injects capability
    /// implementations directly (tests, embedded backends).
    pub inference_endpoint: Option<String>,

    /// Per-capability-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Maximum retry attempts on a transient capability failure. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient. Permanent errors are not
    /// retried; after the last attempt the chunk is skipped, never the run.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Root of the on-disk data store. Default: `data/`.
    ///
    /// See [`DataLayout`] for the directory convention underneath.
    pub data_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 4000,
            min_region_area: 5000,
            min_region_width: 50,
            min_region_height: 50,
            chunk_max_chars: 1000,
            questions_per_chunk: 3,
            min_answer_score: 0.5,
            min_answer_length: 3,
            generator_model: "t5-base-qg".to_string(),
            inference_endpoint: None,
            api_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from `PDF2QA_*` environment variables, falling back
    /// to defaults for anything unset.
    ///
    /// Recognised variables:
    /// `PDF2QA_DPI`, `PDF2QA_MIN_REGION_AREA`, `PDF2QA_MIN_REGION_DIM`,
    /// `PDF2QA_CHUNK_MAX_CHARS`, `PDF2QA_QUESTIONS_PER_CHUNK`,
    /// `PDF2QA_MIN_ANSWER_SCORE`, `PDF2QA_MIN_ANSWER_LENGTH`,
    /// `PDF2QA_GENERATOR_MODEL`, `PDF2QA_INFERENCE_ENDPOINT`,
    /// `PDF2QA_DATA_DIR`.
    ///
    /// A variable that is set but unparsable is an error, not a silent
    /// default: a typo in `PDF2QA_MIN_ANSWER_SCORE` must not quietly accept
    /// every candidate.
    pub fn from_env() -> Result<Self, PipelineError> {
        let mut builder = Self::builder();

        if let Some(v) = env_parse::<u32>("PDF2QA_DPI")? {
            builder = builder.dpi(v);
        }
        if let Some(v) = env_parse::<u32>("PDF2QA_MIN_REGION_AREA")? {
            builder = builder.min_region_area(v);
        }
        if let Some(v) = env_parse::<u32>("PDF2QA_MIN_REGION_DIM")? {
            builder = builder.min_region_dimensions(v, v);
        }
        if let Some(v) = env_parse::<usize>("PDF2QA_CHUNK_MAX_CHARS")? {
            builder = builder.chunk_max_chars(v);
        }
        if let Some(v) = env_parse::<usize>("PDF2QA_QUESTIONS_PER_CHUNK")? {
            builder = builder.questions_per_chunk(v);
        }
        if let Some(v) = env_parse::<f32>("PDF2QA_MIN_ANSWER_SCORE")? {
            builder = builder.min_answer_score(v);
        }
        if let Some(v) = env_parse::<usize>("PDF2QA_MIN_ANSWER_LENGTH")? {
            builder = builder.min_answer_length(v);
        }
        if let Ok(v) = std::env::var("PDF2QA_GENERATOR_MODEL") {
            if !v.is_empty() {
                builder = builder.generator_model(v);
            }
        }
        if let Ok(v) = std::env::var("PDF2QA_INFERENCE_ENDPOINT") {
            if !v.is_empty() {
                builder = builder.inference_endpoint(v);
            }
        }
        if let Ok(v) = std::env::var("PDF2QA_DATA_DIR") {
            if !v.is_empty() {
                builder = builder.data_dir(v);
            }
        }

        builder.build()
    }

    /// Resolve the on-disk directory layout rooted at [`Self::data_dir`].
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }
}

/// Parse an environment variable if present and non-empty.
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, PipelineError> {
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => raw.parse::<T>().map(Some).map_err(|_| {
            PipelineError::InvalidConfig(format!("{name}: cannot parse '{raw}'"))
        }),
        _ => Ok(None),
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn min_region_area(mut self, area: u32) -> Self {
        self.config.min_region_area = area;
        self
    }

    pub fn min_region_dimensions(mut self, width: u32, height: u32) -> Self {
        self.config.min_region_width = width;
        self.config.min_region_height = height;
        self
    }

    pub fn chunk_max_chars(mut self, n: usize) -> Self {
        self.config.chunk_max_chars = n.max(1);
        self
    }

    pub fn questions_per_chunk(mut self, k: usize) -> Self {
        self.config.questions_per_chunk = k.max(1);
        self
    }

    pub fn min_answer_score(mut self, score: f32) -> Self {
        self.config.min_answer_score = score;
        self
    }

    pub fn min_answer_length(mut self, len: usize) -> Self {
        self.config.min_answer_length = len;
        self
    }

    pub fn generator_model(mut self, model: impl Into<String>) -> Self {
        self.config.generator_model = model.into();
        self
    }

    pub fn inference_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.inference_endpoint = Some(url.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(PipelineError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if !c.min_answer_score.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "min_answer_score must be a finite number".into(),
            ));
        }
        if c.questions_per_chunk == 0 {
            return Err(PipelineError::InvalidConfig(
                "questions_per_chunk must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── On-disk layout ───────────────────────────────────────────────────────

/// Directory convention underneath the data root.
///
/// ```text
/// data/
/// ├── raw/                  uploaded PDFs, verbatim
/// ├── processed/
/// │   ├── pages/            rasterised page PNGs
/// │   └── crops/<stem>/     exported figure crops per document
/// ├── output/ocr_json/      per-document OCR artifacts
/// ├── cleaned/              merged cleaned-pages artifacts (*_cleaned.json)
/// └── final/                QA dataset artifacts (*_qa.json)
/// ```
///
/// All directories are created idempotently; creating one that already
/// exists is not an error.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub raw_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub crops_dir: PathBuf,
    pub ocr_json_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub final_dir: PathBuf,
}

impl DataLayout {
    /// Resolve the layout under `root` without touching the filesystem.
    pub fn new(root: &Path) -> Self {
        Self {
            raw_dir: root.join("raw"),
            pages_dir: root.join("processed").join("pages"),
            crops_dir: root.join("processed").join("crops"),
            ocr_json_dir: root.join("output").join("ocr_json"),
            cleaned_dir: root.join("cleaned"),
            final_dir: root.join("final"),
        }
    }

    /// Create every directory in the layout.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            &self.raw_dir,
            &self.pages_dir,
            &self.crops_dir,
            &self.ocr_json_dir,
            &self.cleaned_dir,
            &self.final_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Crop directory for one document, keyed by its file stem.
    pub fn crops_for(&self, doc_stem: &str) -> PathBuf {
        self.crops_dir.join(doc_stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.questions_per_chunk, 3);
        assert_eq!(config.min_answer_length, 3);
    }

    #[test]
    fn dpi_is_clamped() {
        let config = PipelineConfig::builder().dpi(10_000).build().unwrap();
        assert_eq!(config.dpi, 600);
        let config = PipelineConfig::builder().dpi(1).build().unwrap();
        assert_eq!(config.dpi, 72);
    }

    #[test]
    fn zero_questions_per_chunk_is_raised_to_one() {
        let config = PipelineConfig::builder()
            .questions_per_chunk(0)
            .build()
            .unwrap();
        assert_eq!(config.questions_per_chunk, 1);
    }

    #[test]
    fn nan_score_rejected() {
        let err = PipelineConfig::builder()
            .min_answer_score(f32::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn layout_paths() {
        let layout = DataLayout::new(Path::new("store"));
        assert_eq!(layout.cleaned_dir, Path::new("store/cleaned"));
        assert_eq!(
            layout.crops_for("manual"),
            Path::new("store/processed/crops/manual")
        );
    }

    #[test]
    fn ensure_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(tmp.path());
        layout.ensure().unwrap();
        layout.ensure().unwrap();
        assert!(layout.pages_dir.is_dir());
        assert!(layout.final_dir.is_dir());
    }
}
