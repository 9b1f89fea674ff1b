//! Document merging: per-upload page lists → one globally numbered batch.
//!
//! Several PDFs are uploaded together; downstream stages want a single
//! ordered page list. The merger assigns one batch-wide, strictly
//! increasing `page_number` spanning all documents in upload order, tagging
//! each page with its `source_pdf` for traceability, and persists the
//! result as the canonical cleaned-pages artifact.
//!
//! Page numbering goes through an explicit [`MergeState`] owned by the
//! caller — one per run, never shared — so two runs in the same process can
//! never interleave their counters.

use crate::artifact::{self, CleanedPage};
use crate::error::PipelineError;
use crate::pipeline::normalize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Filename of the merged artifact. Ends in `_cleaned.json` so it matches
/// the same convention [`latest_cleaned_file`] scans for.
pub const COMBINED_CLEANED_NAME: &str = "combined_cleaned.json";

/// One ingested document, reduced to its per-page raw OCR text in page order.
#[derive(Debug, Clone)]
pub struct DocumentPages {
    /// Uploaded file name, kept as the `source_pdf` tag.
    pub name: String,
    /// Raw page texts, index 0 = page 1 of the document.
    pub raw_pages: Vec<String>,
}

/// Batch-wide page counter. One per run.
#[derive(Debug)]
pub struct MergeState {
    next: u32,
}

impl MergeState {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    fn take(&mut self) -> u32 {
        let n = self.next;
        self.next += 1;
        n
    }
}

impl Default for MergeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge documents into one cleaned page list.
///
/// Pages are numbered `1..` across the whole batch in upload order, each
/// normalised via [`normalize::clean_text`] with the word count taken from
/// the raw text.
pub fn merge_documents(documents: &[DocumentPages], state: &mut MergeState) -> Vec<CleanedPage> {
    let mut pages = Vec::new();

    for doc in documents {
        for raw in &doc.raw_pages {
            let page_number = state.take();
            pages.push(CleanedPage {
                page_number,
                raw_text: raw.clone(),
                clean_text: normalize::clean_text(raw),
                word_count: normalize::count_words(raw),
                source_pdf: doc.name.clone(),
            });
        }
        debug!(
            "merged {} page(s) from '{}' (batch counter now {})",
            doc.raw_pages.len(),
            doc.name,
            state.next
        );
    }

    pages
}

/// Persist the merged batch as `combined_cleaned.json` in `cleaned_dir`.
///
/// Returns the artifact path. The write is atomic.
pub fn write_cleaned(
    pages: &[CleanedPage],
    cleaned_dir: &Path,
) -> Result<PathBuf, PipelineError> {
    let path = cleaned_dir.join(COMBINED_CLEANED_NAME);
    artifact::write_json(&path, &pages)?;
    info!("cleaned artifact written: {} ({} pages)", path.display(), pages.len());
    Ok(path)
}

/// Pick the most recently modified `*_cleaned.json` in `cleaned_dir`.
///
/// This is the fallback when a run is started with no uploads and no
/// explicit artifact path. **It silently selects whatever prior batch was
/// cleaned last** — callers that care about provenance should surface the
/// returned path to the user rather than assume it belongs to the current
/// session.
///
/// # Errors
/// [`PipelineError::NoCleanedArtifact`] if the directory contains no
/// matching file (or does not exist).
pub fn latest_cleaned_file(cleaned_dir: &Path) -> Result<PathBuf, PipelineError> {
    let entries = std::fs::read_dir(cleaned_dir).map_err(|_| PipelineError::NoCleanedArtifact {
        dir: cleaned_dir.to_path_buf(),
    })?;

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_cleaned = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_cleaned.json"));
        if !is_cleaned {
            continue;
        }

        let Ok(meta) = entry.metadata() else { continue };
        let Ok(mtime) = meta.modified() else { continue };

        match &newest {
            Some((best, _)) if *best >= mtime => {}
            _ => newest = Some((mtime, path)),
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| PipelineError::NoCleanedArtifact {
            dir: cleaned_dir.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn doc(name: &str, pages: &[&str]) -> DocumentPages {
        DocumentPages {
            name: name.to_string(),
            raw_pages: pages.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn merge_numbers_pages_across_documents() {
        let mut state = MergeState::new();
        let pages = merge_documents(
            &[doc("a.pdf", &["one", "two"]), doc("b.pdf", &["three", "four", "five"])],
            &mut state,
        );

        let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

        // Source boundaries preserved in upload order.
        let sources: Vec<&str> = pages.iter().map(|p| p.source_pdf.as_str()).collect();
        assert_eq!(sources, vec!["a.pdf", "a.pdf", "b.pdf", "b.pdf", "b.pdf"]);
    }

    #[test]
    fn merge_is_strictly_increasing() {
        let mut state = MergeState::new();
        let pages = merge_documents(
            &[doc("x.pdf", &["p"]), doc("y.pdf", &["q"]), doc("z.pdf", &["r"])],
            &mut state,
        );
        for pair in pages.windows(2) {
            assert!(pair[0].page_number < pair[1].page_number);
        }
    }

    #[test]
    fn merge_cleans_and_counts_from_raw() {
        let mut state = MergeState::new();
        let pages = merge_documents(&[doc("m.pdf", &["hello   world\n..... done"])], &mut state);
        assert_eq!(pages[0].clean_text, "hello world done");
        assert_eq!(pages[0].word_count, 4); // raw tokens: hello world ..... done
    }

    #[test]
    fn no_documents_yields_empty_batch() {
        let mut state = MergeState::new();
        assert!(merge_documents(&[], &mut state).is_empty());
    }

    #[test]
    fn write_cleaned_matches_latest_convention() {
        let tmp = tempfile::tempdir().unwrap();
        let mut state = MergeState::new();
        let pages = merge_documents(&[doc("a.pdf", &["text"])], &mut state);
        let path = write_cleaned(&pages, tmp.path()).unwrap();
        assert_eq!(latest_cleaned_file(tmp.path()).unwrap(), path);
    }

    #[test]
    fn latest_picks_newest_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        for (name, secs) in [("a_cleaned.json", 10), ("b_cleaned.json", 30), ("c_cleaned.json", 20)]
        {
            let path = tmp.path().join(name);
            let file = File::create(&path).unwrap();
            file.set_modified(base + Duration::from_secs(secs)).unwrap();
        }

        let latest = latest_cleaned_file(tmp.path()).unwrap();
        assert_eq!(latest.file_name().unwrap(), "b_cleaned.json");
    }

    #[test]
    fn non_matching_files_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("notes.json")).unwrap();
        File::create(tmp.path().join("cleaned.txt")).unwrap();
        let err = latest_cleaned_file(tmp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::NoCleanedArtifact { .. }));
    }

    #[test]
    fn missing_dir_is_no_artifact() {
        let err = latest_cleaned_file(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, PipelineError::NoCleanedArtifact { .. }));
    }
}
