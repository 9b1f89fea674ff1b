//! Chunking: partition cleaned page text into bounded-size spans.
//!
//! The generation capability has a finite input window, so page text is cut
//! into chunks of at most `max_chars` characters. Cut points prefer sentence
//! boundaries (`. `, `! `, `? `), then any space, then a hard cut at a
//! character boundary when a single token exceeds the bound.
//!
//! Two invariants downstream code relies on:
//!
//! * every chunk is a **literal substring** of the input (`&str` slices,
//!   never copies), and
//! * concatenating the chunks in order reconstructs the input byte-for-byte
//!   — no trimming, no separators.
//!
//! [`Chunker::chunks`] returns a lazy iterator; calling it again restarts
//! from the beginning. Empty input yields an empty iterator.

/// Splits text into bounded chunks. Cheap to construct and reuse.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    /// `max_chars` is a character (not byte) bound; values below 1 are
    /// raised to 1.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Lazily iterate the chunks of `text`.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            rest: text,
            max_chars: self.max_chars,
        }
    }
}

/// Iterator state: the unconsumed tail of the input.
pub struct Chunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let at = split_point(self.rest, self.max_chars);
        let (chunk, rest) = self.rest.split_at(at);
        self.rest = rest;
        Some(chunk)
    }
}

/// Byte index to split `text` at, in `1..=text.len()`.
fn split_point(text: &str, max_chars: usize) -> usize {
    // Byte index of the boundary after `max_chars` characters.
    let limit = match text.char_indices().nth(max_chars) {
        Some((i, _)) => i,
        None => return text.len(), // whole remainder fits
    };

    let window = &text[..limit];

    if let Some(at) = last_sentence_boundary(window) {
        return at;
    }
    if let Some(space) = window.rfind(' ') {
        if space > 0 {
            return space + 1;
        }
    }
    // No boundary inside the window: hard cut at the char boundary.
    limit
}

/// Index just past the last `. `, `! `, or `? ` in `window`, if any.
fn last_sentence_boundary(window: &str) -> Option<usize> {
    let bytes = window.as_bytes();
    (1..bytes.len())
        .rev()
        .find(|&i| bytes[i] == b' ' && matches!(bytes[i - 1], b'.' | b'!' | b'?'))
        .map(|i| i + 1)
}
