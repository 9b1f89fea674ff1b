//! Pipeline stages for PDF-to-QA-dataset conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the OCR backend) without touching
//! other stages. Data flows strictly left-to-right; no stage mutates
//! another's output after handoff.
//!
//! ## Data Flow
//!
//! ```text
//! PDF ──▶ rasterize ──▶ regions ──▶ extract ──▶ normalize ──▶ chunk
//!          (pdfium)    (imageproc)   (OCR)      (cleanup)    (spans)
//! ```
//!
//! 1. [`rasterize`] — render each page to a PNG; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 2. [`regions`]   — detect and export figure regions on each page image;
//!    best-effort, never aborts page processing
//! 3. [`extract`]   — OCR the full page through a [`crate::capability::TextRecognizer`]
//!    with failure containment
//! 4. [`normalize`] — deterministic text cleanup + raw word count
//! 5. [`chunk`]     — partition cleaned text into bounded spans for the
//!    QA synthesiser
//!
//! Merging the per-document page lists into one batch lives in
//! [`crate::merge`]; QA synthesis and filtering in [`crate::qa`].

pub mod chunk;
pub mod extract;
pub mod normalize;
pub mod rasterize;
pub mod regions;
