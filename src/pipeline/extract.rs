//! OCR adapter: run a [`TextRecognizer`] over a page with failure containment.
//!
//! OCR failure is non-fatal by contract. A page whose recognition fails gets
//! an empty string and the batch moves on — a single unreadable scan must
//! never cost the caller the other ninety-nine pages. The failure is logged
//! with the page number so quality problems remain diagnosable.
//!
//! The adapter also owns the raw-text shape guarantee: leading/trailing
//! whitespace removed and internal newlines flattened to single spaces, so
//! every downstream consumer sees one-line page text regardless of which
//! recognizer produced it.

use crate::capability::TextRecognizer;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// OCR one page image, containing any recognizer failure.
///
/// Returns the flattened raw text, or `""` if recognition failed.
pub async fn extract_text(
    recognizer: &Arc<dyn TextRecognizer>,
    page_image: &Path,
    page_number: u32,
) -> String {
    match recognizer.recognize(page_image).await {
        Ok(text) => {
            let flattened = flatten(&text);
            debug!(
                "page {}: OCR produced {} chars",
                page_number,
                flattened.len()
            );
            flattened
        }
        Err(e) => {
            warn!(
                "page {}: OCR failed on '{}', substituting empty text: {e}",
                page_number,
                page_image.display()
            );
            String::new()
        }
    }
}

/// Trim and flatten internal newlines to single spaces.
///
/// CRLF is normalised first so it flattens to one space, not two.
fn flatten(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}
