//! Figure-region detection: find and export image regions on a page.
//!
//! Scanned manuals mix body text with photos, diagrams, and charts. OCR
//! turns the figures into garbage tokens, so we detect them separately and
//! export the crops for downstream use; the QA stages never read them.
//!
//! ## Algorithm
//!
//! Grayscale → Canny edge map → two passes of 5×5 dilation (merges nearby
//! edge fragments into connected blobs) → external contours of the dilated
//! map → bounding box per contour → size filter → crop the *original*
//! image (not the edge map) and export.
//!
//! The size filter rejects `area < min_area` and anything narrower or
//! shorter than the dimension floors; that removes speckle and thin rule
//! lines, not genuine figures.
//!
//! Output order is contour discovery order. It is stable for a given image
//! but carries no spatial meaning — callers must not assume reading order.
//!
//! Region detection is best-effort: an unreadable page image yields an
//! empty list (logged), never an error, so one bad image cannot abort page
//! processing.

use image::GenericImageView;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Canny hysteresis thresholds, tuned for 300-DPI document scans.
const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;

/// Pixel bounding box of a detected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// One detected and exported figure region.
#[derive(Debug, Clone)]
pub struct Region {
    /// Discovery-order index (also used in the crop filename).
    pub index: usize,
    pub bbox: BoundingBox,
    /// Path of the exported crop PNG.
    pub crop_path: PathBuf,
}

/// Size thresholds for accepting a candidate region.
#[derive(Debug, Clone, Copy)]
pub struct RegionFilter {
    pub min_area: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            min_area: 5000,
            min_width: 50,
            min_height: 50,
        }
    }
}

impl RegionFilter {
    fn accepts(&self, bbox: &BoundingBox) -> bool {
        bbox.area() >= self.min_area
            && bbox.width >= self.min_width
            && bbox.height >= self.min_height
    }
}

/// Detect figure regions on `page_image` and export crops into `crops_dir`.
///
/// Crops are named `{prefix}_crop_{k}.png`, `k` counting accepted regions
/// from 0 in discovery order. Runs the pixel work in `spawn_blocking`.
pub async fn detect_regions(
    page_image: &Path,
    crops_dir: &Path,
    prefix: &str,
    filter: RegionFilter,
) -> Vec<Region> {
    let page_image = page_image.to_path_buf();
    let crops_dir = crops_dir.to_path_buf();
    let prefix = prefix.to_string();

    match tokio::task::spawn_blocking(move || {
        detect_regions_blocking(&page_image, &crops_dir, &prefix, filter)
    })
    .await
    {
        Ok(regions) => regions,
        Err(e) => {
            warn!("region detection task panicked: {e}");
            Vec::new()
        }
    }
}

/// Blocking implementation of region detection.
pub fn detect_regions_blocking(
    page_image: &Path,
    crops_dir: &Path,
    prefix: &str,
    filter: RegionFilter,
) -> Vec<Region> {
    let image = match image::open(page_image) {
        Ok(img) => img,
        Err(e) => {
            warn!(
                "cannot read page image '{}' for region detection: {e}",
                page_image.display()
            );
            return Vec::new();
        }
    };

    if let Err(e) = std::fs::create_dir_all(crops_dir) {
        warn!("cannot create crops dir '{}': {e}", crops_dir.display());
        return Vec::new();
    }

    let gray = image.to_luma8();
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);

    // Two 5×5 passes, so edge fragments within ~4 px of each other join
    // into one blob.
    let dilated = dilate(&dilate(&edges, Norm::LInf, 2), Norm::LInf, 2);

    let contours: Vec<Contour<i32>> = find_contours(&dilated);

    let (img_w, img_h) = image.dimensions();
    let mut regions = Vec::new();

    for contour in &contours {
        // Only external contours: a figure's internal structure must not
        // spawn nested regions.
        if contour.border_type != BorderType::Outer {
            continue;
        }

        let Some(bbox) = contour_bbox(contour, img_w, img_h) else {
            continue;
        };

        if !filter.accepts(&bbox) {
            continue;
        }

        let crop = image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
        let crop_path = crops_dir.join(format!("{prefix}_crop_{}.png", regions.len()));

        if let Err(e) = crop.save(&crop_path) {
            warn!("cannot export crop '{}': {e}", crop_path.display());
            continue;
        }

        debug!(
            "region {} at ({}, {}) {}x{} → {}",
            regions.len(),
            bbox.x,
            bbox.y,
            bbox.width,
            bbox.height,
            crop_path.display()
        );

        regions.push(Region {
            index: regions.len(),
            bbox,
            crop_path,
        });
    }

    regions
}

/// Axis-aligned bounding box of a contour, clamped to the image.
fn contour_bbox(contour: &Contour<i32>, img_w: u32, img_h: u32) -> Option<BoundingBox> {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;

    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    if min_x > max_x || min_y > max_y {
        return None;
    }

    let x = min_x.max(0) as u32;
    let y = min_y.max(0) as u32;
    let width = ((max_x - min_x + 1) as u32).min(img_w.saturating_sub(x));
    let height = ((max_y - min_y + 1) as u32).min(img_h.saturating_sub(y));

    if width == 0 || height == 0 {
        return None;
    }

    Some(BoundingBox {
        x,
        y,
        width,
        height,
    })
}
