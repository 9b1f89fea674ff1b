//! QA synthesis: chunk text → candidate question-answer triples.
//!
//! For each chunk the synthesiser asks the question-generation capability
//! for up to K candidate questions, then scores each against the chunk via
//! the answer-extraction capability. The capabilities are opaque; this
//! module owns only the plumbing around them.
//!
//! ## Failure containment
//!
//! Any error while processing one chunk — from either capability — abandons
//! that chunk and only that chunk. The outcome is an explicit value
//! ([`ChunkOutcome::Skipped`]) rather than a swallowed exception, so the
//! orchestrator can aggregate skip reasons into the final report. A chunk
//! failure never aborts the document, let alone the batch.

pub mod filter;

use crate::capability::{AnswerExtractor, QuestionGenerator};
use crate::error::ChunkSkip;
use std::sync::Arc;
use tracing::{debug, warn};

/// An unfiltered question-answer triple tied to one chunk.
#[derive(Debug, Clone)]
pub struct QaCandidate {
    /// Batch-wide page number of the source chunk.
    pub page_number: u32,
    pub question: String,
    pub answer: String,
    /// Confidence reported by the extraction capability.
    pub score: f32,
    /// The chunk text the candidates were generated from.
    pub context: String,
}

/// Result of synthesising one chunk.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// The chunk produced candidates (possibly zero, if the generator
    /// returned no questions).
    Candidates(Vec<QaCandidate>),
    /// The chunk was abandoned after a capability failure.
    Skipped(ChunkSkip),
}

/// Drives the generation and extraction capabilities for one run.
pub struct QaSynthesizer {
    generator: Arc<dyn QuestionGenerator>,
    extractor: Arc<dyn AnswerExtractor>,
    /// Hard cap on candidates per chunk (K).
    max_questions: usize,
}

impl QaSynthesizer {
    pub fn new(
        generator: Arc<dyn QuestionGenerator>,
        extractor: Arc<dyn AnswerExtractor>,
        max_questions: usize,
    ) -> Self {
        Self {
            generator,
            extractor,
            max_questions: max_questions.max(1),
        }
    }

    /// Synthesise candidates for one chunk.
    ///
    /// Questions beyond K are discarded even if the generator over-delivers;
    /// the per-chunk candidate count never exceeds `max_questions`.
    pub async fn synthesize_chunk(
        &self,
        page_number: u32,
        chunk_index: usize,
        chunk: &str,
    ) -> ChunkOutcome {
        let questions = match self.generator.generate(chunk).await {
            Ok(qs) => qs,
            Err(e) => {
                warn!(
                    "page {}, chunk {}: question generation failed: {e}",
                    page_number, chunk_index
                );
                return ChunkOutcome::Skipped(ChunkSkip {
                    page_number,
                    chunk_index,
                    reason: format!("question generation failed: {e}"),
                });
            }
        };

        let mut candidates = Vec::new();

        for question in questions.into_iter().take(self.max_questions) {
            match self.extractor.extract(&question, chunk).await {
                Ok(scored) => {
                    debug!(
                        "page {}, chunk {}: '{}' → score {:.3}",
                        page_number, chunk_index, question, scored.score
                    );
                    candidates.push(QaCandidate {
                        page_number,
                        question,
                        answer: scored.answer,
                        score: scored.score,
                        context: chunk.to_string(),
                    });
                }
                Err(e) => {
                    // One failed extraction abandons the whole chunk: a
                    // partially scored chunk would bias the dataset toward
                    // whichever questions happened to come back first.
                    warn!(
                        "page {}, chunk {}: answer extraction failed: {e}",
                        page_number, chunk_index
                    );
                    return ChunkOutcome::Skipped(ChunkSkip {
                        page_number,
                        chunk_index,
                        reason: format!("answer extraction failed: {e}"),
                    });
                }
            }
        }

        ChunkOutcome::Candidates(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, ScoredAnswer};
    use async_trait::async_trait;

    struct FixedGenerator(Vec<String>);

    #[async_trait]
    impl QuestionGenerator for FixedGenerator {
        async fn generate(&self, _context: &str) -> Result<Vec<String>, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    struct FixedExtractor(f32);

    #[async_trait]
    impl AnswerExtractor for FixedExtractor {
        async fn extract(
            &self,
            _question: &str,
            context: &str,
        ) -> Result<ScoredAnswer, CapabilityError> {
            Ok(ScoredAnswer {
                answer: context.split(' ').next().unwrap_or("").to_string(),
                score: self.0,
            })
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl QuestionGenerator for FailingGenerator {
        async fn generate(&self, _context: &str) -> Result<Vec<String>, CapabilityError> {
            Err(CapabilityError::CallFailed("model not loaded".into()))
        }
    }

    #[tokio::test]
    async fn candidates_capped_at_k() {
        let synth = QaSynthesizer::new(
            Arc::new(FixedGenerator(
                (0..7).map(|i| format!("Question {i}?")).collect(),
            )),
            Arc::new(FixedExtractor(0.9)),
            3,
        );

        match synth.synthesize_chunk(1, 0, "Paris is the capital of France.").await {
            ChunkOutcome::Candidates(cands) => assert_eq!(cands.len(), 3),
            ChunkOutcome::Skipped(s) => panic!("unexpected skip: {s}"),
        }
    }

    #[tokio::test]
    async fn candidate_carries_page_and_context() {
        let synth = QaSynthesizer::new(
            Arc::new(FixedGenerator(vec!["What is the capital?".into()])),
            Arc::new(FixedExtractor(1.0)),
            3,
        );

        let chunk = "Paris is the capital of France.";
        match synth.synthesize_chunk(4, 2, chunk).await {
            ChunkOutcome::Candidates(cands) => {
                assert_eq!(cands.len(), 1);
                assert_eq!(cands[0].page_number, 4);
                assert_eq!(cands[0].context, chunk);
                assert_eq!(cands[0].answer, "Paris");
            }
            ChunkOutcome::Skipped(s) => panic!("unexpected skip: {s}"),
        }
    }

    #[tokio::test]
    async fn generator_failure_skips_chunk() {
        let synth = QaSynthesizer::new(
            Arc::new(FailingGenerator),
            Arc::new(FixedExtractor(1.0)),
            3,
        );

        match synth.synthesize_chunk(2, 1, "some text").await {
            ChunkOutcome::Skipped(skip) => {
                assert_eq!(skip.page_number, 2);
                assert_eq!(skip.chunk_index, 1);
                assert!(skip.reason.contains("question generation"));
            }
            ChunkOutcome::Candidates(_) => panic!("expected skip"),
        }
    }

    #[tokio::test]
    async fn empty_generation_is_zero_candidates_not_a_skip() {
        let synth = QaSynthesizer::new(
            Arc::new(FixedGenerator(vec![])),
            Arc::new(FixedExtractor(1.0)),
            3,
        );

        match synth.synthesize_chunk(1, 0, "thin context").await {
            ChunkOutcome::Candidates(cands) => assert!(cands.is_empty()),
            ChunkOutcome::Skipped(s) => panic!("unexpected skip: {s}"),
        }
    }
}
