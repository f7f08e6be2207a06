//! Keystroke and pointer decisions at the history/pending boundary
//!
//! `decide_key` is a pure function of the key and the caret's position
//! relative to the boundary. It never touches the buffer; the session applies
//! the returned decision. Rules are evaluated in order and the first match
//! wins:
//!
//! 1. Up/Down are swallowed (there is no history recall).
//! 2. Backspace/Left only act when the caret is past the boundary.
//! 3. Delete/Right only act when the caret is at or past the boundary.
//! 4. Enter submits the pending line.
//! 5. Home jumps to the boundary when the caret is past it.
//! 6. End jumps to the end when the caret is at or past the boundary.
//! 7. Modifier-only keys and viewport scrolling keys pass through.
//! 8. Paste shortcuts run the paste procedure, copy shortcuts pass through,
//!    any other Insert is swallowed.
//! 9. Anything else passes through, after moving the caret to the end if it
//!    sits inside history.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Caret position relative to the buffer regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorContext {
    pub cursor: usize,
    pub boundary: usize,
    pub end: usize,
}

/// What to do with a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    /// Swallow the event
    Consume,
    /// Move the caret, then swallow the event
    Relocate(usize),
    /// Swallow the event and submit the pending line
    Submit,
    /// Swallow the event and run the paste procedure
    Paste,
    /// Let the editing surface handle the event
    PassThrough,
    /// Move the caret, then let the editing surface handle the event
    RelocateThenPassThrough(usize),
}

impl KeyDecision {
    /// Whether the event is handled without the surface's default behavior
    pub fn is_consumed(self) -> bool {
        !matches!(
            self,
            KeyDecision::PassThrough | KeyDecision::RelocateThenPassThrough(_)
        )
    }
}

/// What to do with a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDecision {
    OpenContextMenu { column: u16, row: u16 },
    PassThrough,
}

pub fn decide_key(key: &KeyEvent, ctx: CursorContext) -> KeyDecision {
    let CursorContext {
        cursor,
        boundary,
        end,
    } = ctx;

    match key.code {
        KeyCode::Up | KeyCode::Down => KeyDecision::Consume,

        KeyCode::Backspace | KeyCode::Left => {
            if cursor > boundary {
                KeyDecision::PassThrough
            } else {
                KeyDecision::Consume
            }
        }

        KeyCode::Delete | KeyCode::Right => {
            if cursor >= boundary {
                KeyDecision::PassThrough
            } else {
                KeyDecision::Consume
            }
        }

        KeyCode::Enter => KeyDecision::Submit,

        KeyCode::Home => {
            if cursor > boundary {
                KeyDecision::Relocate(boundary)
            } else {
                KeyDecision::Consume
            }
        }

        KeyCode::End => {
            if cursor >= boundary {
                KeyDecision::Relocate(end)
            } else {
                KeyDecision::Consume
            }
        }

        KeyCode::Modifier(_) | KeyCode::PageUp | KeyCode::PageDown => KeyDecision::PassThrough,

        KeyCode::Insert => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                KeyDecision::PassThrough
            } else if key.modifiers.contains(KeyModifiers::SHIFT) {
                KeyDecision::Paste
            } else {
                KeyDecision::Consume
            }
        }

        _ if is_paste_shortcut(key) => KeyDecision::Paste,
        _ if is_copy_shortcut(key) => KeyDecision::PassThrough,

        _ => {
            if cursor < boundary {
                KeyDecision::RelocateThenPassThrough(end)
            } else {
                KeyDecision::PassThrough
            }
        }
    }
}

pub fn decide_pointer(event: &MouseEvent) -> PointerDecision {
    match event.kind {
        MouseEventKind::Down(MouseButton::Right) => PointerDecision::OpenContextMenu {
            column: event.column,
            row: event.row,
        },
        _ => PointerDecision::PassThrough,
    }
}

/// Ctrl+Shift+V
pub fn is_paste_shortcut(key: &KeyEvent) -> bool {
    is_ctrl_shift_char(key, 'v')
}

/// Ctrl+Insert or Ctrl+Shift+C
pub fn is_copy_shortcut(key: &KeyEvent) -> bool {
    (key.code == KeyCode::Insert && key.modifiers.contains(KeyModifiers::CONTROL))
        || is_ctrl_shift_char(key, 'c')
}

fn is_ctrl_shift_char(key: &KeyEvent, target: char) -> bool {
    let KeyCode::Char(c) = key.code else {
        return false;
    };
    key.modifiers.contains(KeyModifiers::CONTROL)
        && key.modifiers.contains(KeyModifiers::SHIFT)
        && c.eq_ignore_ascii_case(&target)
}
