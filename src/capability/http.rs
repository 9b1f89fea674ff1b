//! HTTP inference-endpoint implementations of the QA capabilities.
//!
//! Targets the de-facto hosted-inference contract for text2text generation
//! and extractive question answering: POST a JSON body to
//! `{base}/models/{model}`, get JSON back. Works against the Hugging Face
//! Inference API and any self-hosted server that mirrors it (TEI/TGI-style
//! gateways do).
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx from inference endpoints are transient and frequent while
//! a model is cold-loading. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) avoids hammering a recovering backend:
//! with 500 ms base and 3 retries the wait sequence is 500 ms → 1 s → 2 s.
//! After the last attempt the error is returned to the synthesiser, which
//! skips the chunk — a capability failure never aborts the run.

use crate::capability::{AnswerExtractor, CapabilityError, QuestionGenerator, ScoredAnswer};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Shared HTTP plumbing for both capabilities.
#[derive(Debug, Clone)]
struct InferenceClient {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout_secs: u64,
}

impl InferenceClient {
    fn new(
        base_url: &str,
        model: &str,
        api_token: Option<String>,
        timeout_secs: u64,
        max_retries: u32,
        retry_backoff_ms: u64,
    ) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CapabilityError::CallFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}/models/{}", base_url.trim_end_matches('/'), model),
            api_token,
            max_retries,
            retry_backoff_ms,
            timeout_secs,
        })
    }

    /// POST `body` with retry/backoff, deserialising the response as `T`.
    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        body: &serde_json::Value,
    ) -> Result<T, CapabilityError> {
        let mut last_err: Option<CapabilityError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "inference call: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let mut req = self.client.post(&self.url).json(body);
            if let Some(ref token) = self.api_token {
                req = req.bearer_auth(token);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .await
                            .map_err(|e| CapabilityError::BadResponse(e.to_string()));
                    }
                    let detail = resp.text().await.unwrap_or_default();
                    let err = CapabilityError::CallFailed(format!("HTTP {status}: {detail}"));
                    // 4xx other than 429 will not improve with retries.
                    if status.is_client_error() && status.as_u16() != 429 {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(CapabilityError::Timeout {
                        secs: self.timeout_secs,
                    });
                }
                Err(e) => {
                    last_err = Some(CapabilityError::CallFailed(e.to_string()));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CapabilityError::CallFailed("unknown".into())))
    }
}

// ── Question generation ──────────────────────────────────────────────────

/// Question generation backed by a hosted text2text-generation model.
///
/// Sends `"generate question: <context>"` with beam search plus sampled
/// decoding, so repeated calls on the same chunk can (and should) surface
/// different candidates.
#[derive(Debug, Clone)]
pub struct HttpQuestionGenerator {
    inner: InferenceClient,
    num_questions: usize,
}

/// One generated sequence in the endpoint's response array.
#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl HttpQuestionGenerator {
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: Option<String>,
        num_questions: usize,
        timeout_secs: u64,
        max_retries: u32,
        retry_backoff_ms: u64,
    ) -> Result<Self, CapabilityError> {
        Ok(Self {
            inner: InferenceClient::new(
                base_url,
                model,
                api_token,
                timeout_secs,
                max_retries,
                retry_backoff_ms,
            )?,
            num_questions,
        })
    }
}

#[async_trait]
impl QuestionGenerator for HttpQuestionGenerator {
    async fn generate(&self, context: &str) -> Result<Vec<String>, CapabilityError> {
        let body = json!({
            "inputs": format!("generate question: {context}"),
            "parameters": {
                "max_length": 64,
                "num_beams": 5,
                "num_return_sequences": self.num_questions,
                "do_sample": true,
                "temperature": 0.9,
                // The endpoint truncates over-long context itself; we still
                // declare it so the server doesn't reject big chunks.
                "truncation": "only_first",
            },
        });

        let sequences: Vec<GeneratedText> = self.inner.post(&body).await?;
        debug!("generated {} candidate question(s)", sequences.len());

        Ok(sequences
            .into_iter()
            .map(|s| s.generated_text.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect())
    }
}

// ── Answer extraction ────────────────────────────────────────────────────

/// Answer extraction backed by a hosted extractive-QA model.
#[derive(Debug, Clone)]
pub struct HttpAnswerExtractor {
    inner: InferenceClient,
}

/// Extractive-QA response shape: answer span plus confidence.
#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    answer: String,
    score: f32,
}

impl HttpAnswerExtractor {
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: Option<String>,
        timeout_secs: u64,
        max_retries: u32,
        retry_backoff_ms: u64,
    ) -> Result<Self, CapabilityError> {
        Ok(Self {
            inner: InferenceClient::new(
                base_url,
                model,
                api_token,
                timeout_secs,
                max_retries,
                retry_backoff_ms,
            )?,
        })
    }
}

#[async_trait]
impl AnswerExtractor for HttpAnswerExtractor {
    async fn extract(
        &self,
        question: &str,
        context: &str,
    ) -> Result<ScoredAnswer, CapabilityError> {
        let body = json!({
            "inputs": { "question": question, "context": context },
        });

        let resp: ExtractionResponse = self.inner.post(&body).await?;
        Ok(ScoredAnswer {
            answer: resp.answer,
            score: resp.score,
        })
    }
}
