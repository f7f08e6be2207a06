//! Editing surface contract used by the session controller
//!
//! The controller never edits text directly: it queries the caret and the
//! boundary, relocates the caret, and asks the surface to append output or
//! fall back to its own default handling for events it lets through.

use crossterm::event::{KeyEvent, MouseEvent};
use std::ops::Range;

pub trait EditorSurface {
    /// Caret byte offset
    fn cursor_position(&self) -> usize;

    /// Move the caret; any selection collapses.
    fn set_cursor_position(&mut self, offset: usize);

    /// Selected byte range, never empty
    fn selection(&self) -> Option<Range<usize>>;

    fn boundary(&self) -> usize;

    fn end(&self) -> usize;

    fn pending_region(&self) -> &str;

    fn insert_text_at_cursor(&mut self, text: &str);

    /// Append process output, moving the boundary to the end.
    fn append_text(&mut self, text: &str);

    /// Move the pending region into history, leaving nothing editable.
    fn freeze_pending(&mut self);

    /// Append an emphasized status line, moving the boundary to the end.
    fn append_formatted_line(&mut self, text: &str);

    fn clear_all(&mut self);

    fn select_all(&mut self);

    fn copy_selection(&mut self);

    fn has_pasteable_content(&mut self) -> bool;

    fn paste_at_cursor(&mut self);

    /// Default behavior for a key the interceptor let through.
    ///
    /// Returns true when the surface changed.
    fn handle_default_key(&mut self, key: &KeyEvent) -> bool;

    /// Default behavior for a pointer event the interceptor let through.
    fn handle_default_pointer(&mut self, event: &MouseEvent) -> bool;
}
