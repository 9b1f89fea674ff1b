//! PDF rasterisation: render every page to a PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a dedicated
//! thread designed for blocking operations, preventing the runtime's worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## DPI vs pixel cap
//!
//! The target width is computed from the page's physical size in PDF points
//! (1/72 inch) times the configured DPI, so a Letter page at 300 DPI renders
//! at ~2550 px. `max_pixels` caps the longest edge regardless of physical
//! size — an A0 poster must not allocate a 28 000 px bitmap.

use crate::error::PipelineError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rasterised page, on disk.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number within the source document.
    pub page_number: u32,
    /// Path of the exported PNG, named to preserve page order.
    pub path: PathBuf,
}

/// Rasterise every page of `pdf_path` into `pages_dir`.
///
/// Output files are named `{stem}_page_{n}.png` with `n` starting at 1, so
/// lexical grouping by stem preserves upload association and `n` preserves
/// page order.
///
/// # Errors
/// [`PipelineError::FileNotFound`] if the PDF does not exist, and
/// [`PipelineError::Ingestion`] if pdfium cannot parse it — both fatal to
/// the run for this document.
pub async fn rasterize(
    pdf_path: &Path,
    pages_dir: &Path,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<PageImage>, PipelineError> {
    if !pdf_path.exists() {
        return Err(PipelineError::FileNotFound {
            path: pdf_path.to_path_buf(),
        });
    }

    let path = pdf_path.to_path_buf();
    let out_dir = pages_dir.to_path_buf();

    tokio::task::spawn_blocking(move || rasterize_blocking(&path, &out_dir, dpi, max_pixels))
        .await
        .map_err(|e| PipelineError::Internal(format!("Render task panicked: {e}")))?
}

/// Blocking implementation of page rasterisation.
fn rasterize_blocking(
    pdf_path: &Path,
    pages_dir: &Path,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<PageImage>, PipelineError> {
    std::fs::create_dir_all(pages_dir).map_err(|e| PipelineError::ArtifactWrite {
        path: pages_dir.to_path_buf(),
        source: e,
    })?;

    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PipelineError::Ingestion {
                path: pdf_path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages from {}", total_pages, pdf_path.display());

    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page_number = (idx + 1) as u32;

        let page = pages
            .get(idx as u16)
            .map_err(|e| PipelineError::RasterisationFailed {
                path: pdf_path.to_path_buf(),
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        // Points are 1/72 inch; width at the requested DPI, capped.
        let target_width = ((page.width().value / 72.0) * dpi as f32) as i32;
        let target_width = target_width.clamp(1, max_pixels as i32);

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_maximum_height(max_pixels as i32);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| PipelineError::RasterisationFailed {
                    path: pdf_path.to_path_buf(),
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;

        let image = bitmap.as_image();
        let out_path = pages_dir.join(format!("{stem}_page_{page_number}.png"));
        image
            .save(&out_path)
            .map_err(|e| PipelineError::ArtifactWrite {
                path: out_path.clone(),
                source: std::io::Error::other(e),
            })?;

        debug!(
            "Rendered page {} → {}x{} px → {}",
            page_number,
            image.width(),
            image.height(),
            out_path.display()
        );

        results.push(PageImage {
            page_number,
            path: out_path,
        });
    }

    Ok(results)
}
