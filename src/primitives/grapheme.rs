//! Grapheme cluster helpers for caret movement and deletion
//!
//! The caret moves over what the user perceives as one character, so a
//! backspace after "é" written as `e` + combining accent removes both code
//! points at once.

use unicode_segmentation::UnicodeSegmentation;

/// Byte offset where the grapheme before `pos` starts.
///
/// Scanning starts at `floor`, which must be a grapheme boundary (the
/// history/pending boundary in practice), so long histories are not rescanned.
pub fn prev_grapheme_boundary(s: &str, floor: usize, pos: usize) -> usize {
    let pos = pos.min(s.len());
    if pos <= floor {
        return pos;
    }

    let mut last_boundary = floor;
    for (idx, _) in s[floor..pos].grapheme_indices(true) {
        last_boundary = floor + idx;
    }
    last_boundary
}

/// Byte offset just after the grapheme that starts at or contains `pos`.
pub fn next_grapheme_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }

    match s[pos..].graphemes(true).next() {
        Some(grapheme) => pos + grapheme.len(),
        None => s.len(),
    }
}
