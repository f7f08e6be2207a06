//! Clipboard shared by the context menu and the copy/paste shortcuts
//!
//! Copies go to an internal buffer and, unless disabled, to the system
//! clipboard: OSC 52 for terminals that understand it, arboard for the X11,
//! Wayland, macOS and Windows clipboards. Pastes prefer the system clipboard
//! and fall back to the internal buffer.

use crossterm::clipboard::CopyToClipboard;
use crossterm::execute;
use std::io::{stdout, Write};
use std::sync::Mutex;

/// Kept alive for the whole run: on X11 the owner must stay around to answer
/// paste requests from other applications.
static SYSTEM_CLIPBOARD: Mutex<Option<arboard::Clipboard>> = Mutex::new(None);

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    internal: String,
    /// Never touch the system clipboard (tests, headless runs)
    internal_only: bool,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that never reads or writes the system clipboard
    pub fn internal_only() -> Self {
        Self {
            internal: String::new(),
            internal_only: true,
        }
    }

    pub fn copy(&mut self, text: String) {
        if self.internal_only {
            self.internal = text;
            return;
        }

        if let Err(e) = execute!(stdout(), CopyToClipboard::to_clipboard_from(&text)) {
            tracing::debug!("OSC 52 clipboard copy failed: {}", e);
        }
        let _ = stdout().flush();

        with_system_clipboard(|clipboard| {
            if let Err(e) = clipboard.set_text(&text) {
                tracing::debug!("arboard copy failed: {}", e);
            }
        });
        self.internal = text;
    }

    /// Text to paste, or `None` when both clipboards are empty.
    pub fn paste(&mut self) -> Option<String> {
        if !self.internal_only {
            let system = with_system_clipboard(|clipboard| clipboard.get_text().ok()).flatten();
            if let Some(text) = system.filter(|text| !text.is_empty()) {
                self.internal = text.clone();
                return Some(text);
            }
        }

        if self.internal.is_empty() {
            None
        } else {
            Some(self.internal.clone())
        }
    }

    /// Whether a paste would insert anything
    pub fn has_content(&mut self) -> bool {
        if !self.internal.is_empty() {
            return true;
        }
        if self.internal_only {
            return false;
        }
        with_system_clipboard(|clipboard| clipboard.get_text().ok())
            .flatten()
            .is_some_and(|text| !text.is_empty())
    }

    pub fn get_internal(&self) -> &str {
        &self.internal
    }

    pub fn set_internal(&mut self, text: String) {
        self.internal = text;
    }
}

/// Run `f` against the process-wide arboard clipboard, creating it on first use.
fn with_system_clipboard<T>(f: impl FnOnce(&mut arboard::Clipboard) -> T) -> Option<T> {
    let mut guard = SYSTEM_CLIPBOARD.lock().ok()?;
    if guard.is_none() {
        match arboard::Clipboard::new() {
            Ok(clipboard) => *guard = Some(clipboard),
            Err(e) => {
                tracing::debug!("arboard clipboard init failed: {}", e);
                return None;
            }
        }
    }
    guard.as_mut().map(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_only_round_trip() {
        let mut clipboard = Clipboard::internal_only();
        assert!(!clipboard.has_content());
        assert_eq!(clipboard.paste(), None);

        clipboard.copy("ls -la".to_string());
        assert!(clipboard.has_content());
        assert_eq!(clipboard.paste(), Some("ls -la".to_string()));
    }

    #[test]
    fn test_set_internal() {
        let mut clipboard = Clipboard::internal_only();
        clipboard.set_internal("test".to_string());
        assert_eq!(clipboard.get_internal(), "test");
    }
}
