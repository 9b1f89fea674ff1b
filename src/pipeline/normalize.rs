//! Text normalisation: deterministic cleanup of raw OCR output.
//!
//! ## Why is normalisation necessary?
//!
//! OCR output is *textually correct* but *structurally noisy* — scanner
//! speckle becomes stray pipes and tildes, table-of-contents leader dots
//! arrive as `........`, and line wrapping scatters hard newlines through
//! sentences. Downstream question generation wants plain running prose.
//!
//! This module applies cheap, deterministic rules in a fixed order. The
//! rule set is the pluggable policy; the hard requirement is determinism:
//! `clean_text` is a pure function, and the same raw text always yields the
//! same clean text. Each rule is a pure `&str → String` pass with no shared
//! state, independently testable.
//!
//! ## Rule Order
//!
//! Invisible-character removal runs before noise stripping so zero-width
//! joiners cannot hide a noise run; whitespace collapsing runs last so
//! every earlier rule may freely substitute spaces.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise raw OCR text.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Drop non-whitespace control characters
/// 3. Replace common OCR noise glyphs (`| ¦ ~ ^ \`` and the replacement
///    character) with spaces
/// 4. Collapse leader-dot and dash runs (3+) into a single space
/// 5. Collapse all whitespace — including newlines — into single spaces
/// 6. Trim
pub fn clean_text(raw: &str) -> String {
    let s = remove_invisible_chars(raw);
    let s = remove_control_chars(&s);
    let s = strip_noise_glyphs(&s);
    let s = collapse_leader_runs(&s);
    collapse_whitespace(&s)
}

/// Count whitespace-delimited tokens in the **raw** text.
///
/// Word counts are reported against what the OCR engine actually produced,
/// not against the cleaned text, so they stay comparable across changes to
/// the cleaning policy.
pub fn count_words(raw: &str) -> usize {
    raw.split_whitespace().count()
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Drop control characters ──────────────────────────────────────

fn remove_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}

// ── Rule 3: Replace OCR noise glyphs ─────────────────────────────────────

fn strip_noise_glyphs(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '|' | '¦' | '~' | '^' | '`' | '\u{FFFD}' => ' ',
            other => other,
        })
        .collect()
}

// ── Rule 4: Collapse leader runs ─────────────────────────────────────────

static RE_LEADER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\-_]{3,}").unwrap());

fn collapse_leader_runs(input: &str) -> String {
    RE_LEADER_RUN.replace_all(input, " ").to_string()
}

// ── Rule 5 + 6: Collapse whitespace and trim ─────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────
