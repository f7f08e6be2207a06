//! Append-only text log split by a single boundary offset
//!
//! Everything before `boundary` is history: process output and lines that were
//! already submitted. Everything from `boundary` to the end is the pending input
//! line, which stays editable until the next output batch freezes it.
//!
//! Offsets are byte offsets into the UTF-8 text and always sit on char
//! boundaries.

use std::fmt;
use std::ops::Range;

/// Errors returned by tail edits that would break the history invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The edit touches `[0, boundary)`
    HistoryEdit { offset: usize, boundary: usize },
    /// The offset is past the end of the buffer
    OutOfBounds { offset: usize, len: usize },
    /// The offset splits a UTF-8 sequence
    NotCharBoundary(usize),
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::HistoryEdit { offset, boundary } => {
                write!(f, "edit at {offset} is inside history (boundary {boundary})")
            }
            BufferError::OutOfBounds { offset, len } => {
                write!(f, "offset {offset} is past the end of the buffer ({len})")
            }
            BufferError::NotCharBoundary(offset) => {
                write!(f, "offset {offset} is not on a char boundary")
            }
        }
    }
}

impl std::error::Error for BufferError {}

/// Text store with an immutable history prefix and an editable tail
#[derive(Debug, Clone, Default)]
pub struct BoundaryBuffer {
    text: String,
    /// First byte of the pending region
    boundary: usize,
    /// Byte ranges of status lines, rendered with emphasis
    emphasis: Vec<Range<usize>>,
}

impl BoundaryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn boundary(&self) -> usize {
        self.boundary
    }

    /// Offset one past the last byte
    pub fn end(&self) -> usize {
        self.text.len()
    }

    /// Frozen prefix `[0, boundary)`
    pub fn history(&self) -> &str {
        &self.text[..self.boundary]
    }

    /// Text composed by the user but not yet frozen, `[boundary, len)`
    pub fn pending_region(&self) -> &str {
        &self.text[self.boundary..]
    }

    pub fn emphasis(&self) -> &[Range<usize>] {
        &self.emphasis
    }

    /// Clamp an offset to the text and back onto a char boundary.
    pub fn snap_offset(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Append process output and freeze everything written so far.
    ///
    /// A pending line that was not terminated gets a line break first so the
    /// output starts on its own line. Appending an empty batch changes nothing.
    pub fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.terminate_pending();
        self.text.push_str(text);
        self.boundary = self.text.len();
    }

    /// Move the pending line into history without adding output.
    ///
    /// Used when a process batch arrived but nothing of it is left to show,
    /// such as an echo that was stripped entirely.
    pub fn freeze(&mut self) {
        self.terminate_pending();
        self.boundary = self.text.len();
    }

    fn terminate_pending(&mut self) {
        if !self.pending_region().is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    /// Append a status line on its own line and mark it for emphasis.
    pub fn append_formatted_line(&mut self, line: &str) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        let start = self.text.len();
        self.text.push_str(line);
        self.emphasis.push(start..self.text.len());
        self.text.push('\n');
        self.boundary = self.text.len();
    }

    /// Insert text into the pending region.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
        self.check_offset(offset)?;
        self.text.insert_str(offset, text);
        Ok(())
    }

    /// Remove a range of the pending region, returning the removed text.
    pub fn delete(&mut self, range: Range<usize>) -> Result<String, BufferError> {
        self.check_offset(range.start)?;
        self.check_offset(range.end)?;
        if range.start >= range.end {
            return Ok(String::new());
        }
        Ok(self.text.drain(range).collect())
    }

    /// Drop all content, history included.
    pub fn clear(&mut self) {
        self.text.clear();
        self.emphasis.clear();
        self.boundary = 0;
    }

    fn check_offset(&self, offset: usize) -> Result<(), BufferError> {
        if offset > self.text.len() {
            return Err(BufferError::OutOfBounds {
                offset,
                len: self.text.len(),
            });
        }
        if offset < self.boundary {
            return Err(BufferError::HistoryEdit {
                offset,
                boundary: self.boundary,
            });
        }
        if !self.text.is_char_boundary(offset) {
            return Err(BufferError::NotCharBoundary(offset));
        }
        Ok(())
    }
}
