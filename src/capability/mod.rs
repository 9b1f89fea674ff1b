//! External model capabilities: question generation, answer extraction, OCR.
//!
//! The pipeline never embeds an inference backend. Each capability is an
//! object-safe async trait, and the orchestrator works against
//! `Arc<dyn …>` — the same seam the rest of the stack uses for its model
//! providers. That keeps the deterministic plumbing testable with stubs and
//! lets deployments swap backends (hosted endpoint, local process, mock)
//! without touching pipeline logic.
//!
//! Contracts, as the pipeline relies on them:
//!
//! * [`QuestionGenerator::generate`] returns **up to K** candidate question
//!   strings for a chunk of context. It may be non-deterministic — the same
//!   chunk may yield different candidates across calls (beam search plus
//!   sampling); that is expected, not a bug. Implementations must tolerate
//!   arbitrarily long input by truncating internally.
//! * [`AnswerExtractor::extract`] returns an answer span/paraphrase and a
//!   confidence score comparable against the configured threshold.
//! * [`TextRecognizer::recognize`] returns the raw text of one page image.
//!   Failures are contained by the adapter in [`crate::pipeline::extract`];
//!   implementations just report them honestly.

pub mod http;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced by capability implementations.
///
/// These never cross a stage boundary: the synthesiser converts them into
/// per-chunk skips and the OCR adapter into empty page text.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The backing endpoint or process rejected or failed the call.
    #[error("capability call failed: {0}")]
    CallFailed(String),

    /// The call did not complete within the configured timeout.
    #[error("capability call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The backend answered, but with a payload we cannot interpret.
    #[error("unexpected capability response: {0}")]
    BadResponse(String),
}

/// An extracted answer with its confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub answer: String,
    /// Confidence in the extraction; extractive-QA backends report [0, 1].
    pub score: f32,
}

/// Question-generation capability: chunk text → candidate questions.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Generate up to K candidate questions for `context`.
    ///
    /// May return fewer than K (or none) for thin context. Call-to-call
    /// variation on identical input is permitted.
    async fn generate(&self, context: &str) -> Result<Vec<String>, CapabilityError>;
}

/// Answer-extraction capability: (question, context) → scored answer.
#[async_trait]
pub trait AnswerExtractor: Send + Sync {
    async fn extract(
        &self,
        question: &str,
        context: &str,
    ) -> Result<ScoredAnswer, CapabilityError>;
}

/// OCR capability: page image → raw text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String, CapabilityError>;
}

/// Placeholder recognizer for builds without an OCR backend.
///
/// Every call fails, which the OCR adapter contains into empty page text —
/// runs that only consume an existing cleaned artifact never notice, and
/// ingestion runs get a per-page warning instead of a crash.
pub struct NoOcr;

#[async_trait]
impl TextRecognizer for NoOcr {
    async fn recognize(&self, _image: &Path) -> Result<String, CapabilityError> {
        Err(CapabilityError::CallFailed(
            "no OCR backend compiled in (enable the `tesseract` feature or inject a TextRecognizer)"
                .into(),
        ))
    }
}
