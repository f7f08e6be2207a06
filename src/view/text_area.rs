//! Text area backed by a [`BoundaryBuffer`]
//!
//! Owns the caret, the selection anchor, the clipboard and the scroll state.
//! It knows nothing about processes: the session controller drives it through
//! [`EditorSurface`] and lets it handle plain editing on its own.

use crate::model::buffer::BoundaryBuffer;
use crate::primitives::grapheme::{next_grapheme_boundary, prev_grapheme_boundary};
use crate::services::clipboard::Clipboard;
use crate::view::surface::EditorSurface;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::ops::Range;
use unicode_width::UnicodeWidthChar;

pub const TAB_WIDTH: usize = 8;

#[derive(Debug)]
pub struct TextArea {
    buffer: BoundaryBuffer,
    cursor: usize,
    /// Other end of the selection; the selection is `anchor..cursor` sorted
    anchor: Option<usize>,
    clipboard: Clipboard,
    /// First visible line
    top_line: usize,
    /// First visible display column
    left_column: usize,
    /// Keep the caret in view on the next layout
    follow_cursor: bool,
    /// Screen area used by the last layout, for pointer hit-testing
    viewport: Rect,
    scroll_lines: usize,
    dragging: bool,
}

impl Default for TextArea {
    fn default() -> Self {
        Self::new(Clipboard::new())
    }
}

impl TextArea {
    pub fn new(clipboard: Clipboard) -> Self {
        Self {
            buffer: BoundaryBuffer::new(),
            cursor: 0,
            anchor: None,
            clipboard,
            top_line: 0,
            left_column: 0,
            follow_cursor: true,
            viewport: Rect::default(),
            scroll_lines: 3,
            dragging: false,
        }
    }

    pub fn with_scroll_lines(mut self, lines: usize) -> Self {
        self.scroll_lines = lines.max(1);
        self
    }

    pub fn buffer(&self) -> &BoundaryBuffer {
        &self.buffer
    }

    pub fn clipboard_mut(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    pub fn top_line(&self) -> usize {
        self.top_line
    }

    pub fn left_column(&self) -> usize {
        self.left_column
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn line_count(&self) -> usize {
        self.buffer.text().split('\n').count()
    }

    /// Byte offset of the start of every line
    pub fn line_starts(&self) -> Vec<usize> {
        let mut starts = vec![0];
        starts.extend(
            self.buffer
                .text()
                .match_indices('\n')
                .map(|(idx, _)| idx + 1),
        );
        starts
    }

    /// Line index and byte offset within that line
    pub fn line_and_offset(&self, offset: usize) -> (usize, usize) {
        let text = self.buffer.text();
        let offset = offset.min(text.len());
        let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line = text[..line_start].matches('\n').count();
        (line, offset - line_start)
    }

    /// Record the screen area and scroll so the caret is visible if it moved.
    pub fn set_viewport(&mut self, area: Rect) {
        self.viewport = area;
        if !self.follow_cursor {
            return;
        }
        self.follow_cursor = false;

        let height = area.height as usize;
        let width = area.width as usize;
        let (line, byte_in_line) = self.line_and_offset(self.cursor);

        if height > 0 {
            if line < self.top_line {
                self.top_line = line;
            } else if line >= self.top_line + height {
                self.top_line = line + 1 - height;
            }
        }

        if width > 0 {
            let line_text = self.line_text(line);
            let column = display_column(line_text, byte_in_line);
            if column < self.left_column {
                self.left_column = column;
            } else if column >= self.left_column + width {
                self.left_column = column + 1 - width;
            }
        }
    }

    /// Scroll the view by `delta` lines without moving the caret.
    pub fn scroll_by(&mut self, delta: isize) {
        let max_top = self.line_count().saturating_sub(1);
        self.top_line = self.top_line.saturating_add_signed(delta).min(max_top);
        self.follow_cursor = false;
    }

    /// Screen cell of the caret relative to the viewport, if it is visible.
    pub fn cursor_cell(&self) -> Option<(u16, u16)> {
        let (line, byte_in_line) = self.line_and_offset(self.cursor);
        let column = display_column(self.line_text(line), byte_in_line);
        let row = line.checked_sub(self.top_line)?;
        let column = column.checked_sub(self.left_column)?;
        if row >= self.viewport.height as usize || column >= self.viewport.width as usize {
            return None;
        }
        Some((column as u16, row as u16))
    }

    pub fn line_text(&self, line: usize) -> &str {
        self.buffer.text().split('\n').nth(line).unwrap_or("")
    }

    /// Byte offset under a screen cell, clamped to the text.
    pub fn offset_at_cell(&self, column: u16, row: u16) -> usize {
        let starts = self.line_starts();
        let row = row.saturating_sub(self.viewport.y) as usize;
        let line = (self.top_line + row).min(starts.len() - 1);
        let column = column.saturating_sub(self.viewport.x) as usize + self.left_column;
        starts[line] + byte_at_column(self.line_text(line), column)
    }

    fn move_cursor(&mut self, offset: usize, extend: bool) {
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
        self.cursor = offset;
        self.follow_cursor = true;
    }

    /// Remove the part of the selection that lies in the pending region.
    fn delete_selection(&mut self) -> bool {
        let Some(range) = self.selection() else {
            return false;
        };
        let start = range.start.max(self.buffer.boundary());
        self.anchor = None;
        if start >= range.end {
            return false;
        }
        match self.buffer.delete(start..range.end) {
            Ok(_) => {
                self.cursor = start;
                self.follow_cursor = true;
                true
            }
            Err(e) => {
                tracing::warn!("Rejected selection delete: {}", e);
                false
            }
        }
    }

    fn delete_range(&mut self, range: Range<usize>) -> bool {
        if range.is_empty() {
            return false;
        }
        let start = range.start;
        match self.buffer.delete(range) {
            Ok(_) => {
                self.cursor = start;
                self.follow_cursor = true;
                true
            }
            Err(e) => {
                tracing::warn!("Rejected delete: {}", e);
                false
            }
        }
    }

    fn backspace(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let start = prev_grapheme_boundary(self.buffer.text(), self.buffer.boundary(), self.cursor);
        self.delete_range(start..self.cursor)
    }

    fn delete_forward(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let end = next_grapheme_boundary(self.buffer.text(), self.cursor);
        self.delete_range(self.cursor..end)
    }

    fn page_height(&self) -> isize {
        self.viewport.height.max(1) as isize
    }
}

impl EditorSurface for TextArea {
    fn cursor_position(&self) -> usize {
        self.cursor
    }

    fn set_cursor_position(&mut self, offset: usize) {
        let offset = self.buffer.snap_offset(offset);
        self.move_cursor(offset, false);
    }

    fn selection(&self) -> Option<Range<usize>> {
        let anchor = self.anchor?;
        match anchor.cmp(&self.cursor) {
            std::cmp::Ordering::Less => Some(anchor..self.cursor),
            std::cmp::Ordering::Greater => Some(self.cursor..anchor),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn boundary(&self) -> usize {
        self.buffer.boundary()
    }

    fn end(&self) -> usize {
        self.buffer.end()
    }

    fn pending_region(&self) -> &str {
        self.buffer.pending_region()
    }

    fn insert_text_at_cursor(&mut self, text: &str) {
        self.delete_selection();
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        match self.buffer.insert(self.cursor, &text) {
            Ok(()) => {
                self.cursor += text.len();
                self.follow_cursor = true;
            }
            Err(e) => tracing::warn!("Rejected insert: {}", e),
        }
    }

    fn append_text(&mut self, text: &str) {
        self.buffer.append(text);
    }

    fn freeze_pending(&mut self) {
        self.buffer.freeze();
    }

    fn append_formatted_line(&mut self, text: &str) {
        self.buffer.append_formatted_line(text);
    }

    fn clear_all(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.anchor = None;
        self.top_line = 0;
        self.left_column = 0;
        self.follow_cursor = true;
    }

    fn select_all(&mut self) {
        self.anchor = Some(0);
        self.cursor = self.buffer.end();
        self.follow_cursor = true;
    }

    fn copy_selection(&mut self) {
        let Some(range) = self.selection() else {
            return;
        };
        let text = self.buffer.text()[range].to_string();
        tracing::debug!("Copied {} bytes", text.len());
        self.clipboard.copy(text);
    }

    fn has_pasteable_content(&mut self) -> bool {
        self.clipboard.has_content()
    }

    fn paste_at_cursor(&mut self) {
        if let Some(text) = self.clipboard.paste() {
            self.insert_text_at_cursor(&text);
        }
    }

    fn handle_default_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char(c) if ctrl && shift && c.eq_ignore_ascii_case(&'c') => {
                self.copy_selection();
                false
            }
            KeyCode::Insert if ctrl => {
                self.copy_selection();
                false
            }
            KeyCode::Char(c) if ctrl && c.eq_ignore_ascii_case(&'a') => {
                self.select_all();
                true
            }
            KeyCode::Char(c) if !ctrl && !alt => {
                let mut utf8 = [0u8; 4];
                self.insert_text_at_cursor(c.encode_utf8(&mut utf8));
                true
            }
            KeyCode::Tab => {
                self.insert_text_at_cursor("\t");
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => {
                let floor = self.buffer.boundary().min(self.cursor);
                let target = prev_grapheme_boundary(self.buffer.text(), floor, self.cursor);
                self.move_cursor(target, shift);
                true
            }
            KeyCode::Right => {
                let target = next_grapheme_boundary(self.buffer.text(), self.cursor);
                self.move_cursor(target, shift);
                true
            }
            KeyCode::PageUp => {
                self.scroll_by(-self.page_height());
                true
            }
            KeyCode::PageDown => {
                self.scroll_by(self.page_height());
                true
            }
            _ => false,
        }
    }

    fn handle_default_pointer(&mut self, event: &MouseEvent) -> bool {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let offset = self.offset_at_cell(event.column, event.row);
                let extend = event.modifiers.contains(KeyModifiers::SHIFT);
                self.move_cursor(offset, extend);
                if !extend {
                    self.anchor = Some(offset);
                }
                self.dragging = true;
                true
            }
            MouseEventKind::Drag(MouseButton::Left) if self.dragging => {
                let offset = self.offset_at_cell(event.column, event.row);
                self.move_cursor(offset, true);
                true
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.dragging = false;
                false
            }
            MouseEventKind::ScrollUp => {
                self.scroll_by(-(self.scroll_lines as isize));
                true
            }
            MouseEventKind::ScrollDown => {
                self.scroll_by(self.scroll_lines as isize);
                true
            }
            _ => false,
        }
    }
}

/// Display column of a byte offset within one line, with tab stops.
pub fn display_column(line: &str, byte_in_line: usize) -> usize {
    let mut column = 0;
    for (idx, ch) in line.char_indices() {
        if idx >= byte_in_line {
            break;
        }
        column += char_width(ch, column);
    }
    column
}

/// Byte offset within one line of the character drawn at `column`.
pub fn byte_at_column(line: &str, column: usize) -> usize {
    let mut current = 0;
    for (idx, ch) in line.char_indices() {
        let width = char_width(ch, current);
        if column < current + width.max(1) {
            return idx;
        }
        current += width;
    }
    line.len()
}

/// Cells taken by `ch` when drawn at `column`
pub fn char_width(ch: char, column: usize) -> usize {
    if ch == '\t' {
        TAB_WIDTH - column % TAB_WIDTH
    } else {
        ch.width().unwrap_or(0)
    }
}
