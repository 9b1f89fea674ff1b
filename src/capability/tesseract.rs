//! Local Tesseract OCR backend (feature `tesseract`).
//!
//! Wraps `leptess` behind the [`TextRecognizer`] trait. Tesseract's C API is
//! blocking and not thread-safe per instance, so each call constructs a
//! fresh engine inside `spawn_blocking` — page OCR takes seconds, engine
//! init takes milliseconds, and a fresh instance per page sidesteps the
//! thread-affinity rules entirely.
//!
//! Requires `libtesseract` and `libleptonica` on the build host, which is
//! why the feature is off by default.

use crate::capability::{CapabilityError, TextRecognizer};
use async_trait::async_trait;
use std::path::Path;

/// Tesseract-backed OCR for page images.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// ISO-639-3 language code(s), e.g. `"eng"` or `"eng+deu"`.
    lang: String,
    /// Optional tessdata directory; `None` uses the system default.
    datapath: Option<String>,
}

impl TesseractOcr {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            datapath: None,
        }
    }

    pub fn with_datapath(mut self, datapath: impl Into<String>) -> Self {
        self.datapath = Some(datapath.into());
        self
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl TextRecognizer for TesseractOcr {
    async fn recognize(&self, image: &Path) -> Result<String, CapabilityError> {
        let lang = self.lang.clone();
        let datapath = self.datapath.clone();
        let image = image.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut engine = leptess::LepTess::new(datapath.as_deref(), &lang)
                .map_err(|e| CapabilityError::CallFailed(format!("tesseract init: {e}")))?;
            engine
                .set_image(&image)
                .map_err(|e| CapabilityError::CallFailed(format!("set_image: {e}")))?;
            engine
                .get_utf8_text()
                .map_err(|e| CapabilityError::CallFailed(format!("get_utf8_text: {e}")))
        })
        .await
        .map_err(|e| CapabilityError::CallFailed(format!("OCR task panicked: {e}")))?
    }
}
