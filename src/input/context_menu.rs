//! Context menu opened by a secondary-button press
//!
//! The menu is plain state: the session feeds it keys and pointer events
//! while it is open and applies the chosen action. Layout lives here too so
//! that hit-testing and rendering agree on where each entry is drawn.

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Copy,
    Paste,
    SelectAll,
    Clear,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Copy => "Copy",
            MenuAction::Paste => "Paste",
            MenuAction::SelectAll => "Select All",
            MenuAction::Clear => "Clear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Action { action: MenuAction, enabled: bool },
    Separator,
}

impl MenuEntry {
    fn action(action: MenuAction, enabled: bool) -> Self {
        MenuEntry::Action { action, enabled }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self, MenuEntry::Action { enabled: true, .. })
    }
}

/// Result of feeding an event to an open menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Still open
    Pending,
    Chosen(MenuAction),
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    /// Screen cell the menu was opened at
    anchor: (u16, u16),
    entries: Vec<MenuEntry>,
    /// Index into `entries` of the highlighted entry, always selectable
    highlighted: Option<usize>,
}

impl ContextMenu {
    /// Copy is enabled iff there is a selection, Paste iff the clipboard
    /// holds something. Select All and Clear are always available.
    pub fn new(anchor: (u16, u16), can_copy: bool, can_paste: bool) -> Self {
        let entries = vec![
            MenuEntry::action(MenuAction::Copy, can_copy),
            MenuEntry::action(MenuAction::Paste, can_paste),
            MenuEntry::action(MenuAction::SelectAll, true),
            MenuEntry::Separator,
            MenuEntry::action(MenuAction::Clear, true),
        ];
        let highlighted = entries.iter().position(MenuEntry::is_selectable);
        Self {
            anchor,
            entries,
            highlighted,
        }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn anchor(&self) -> (u16, u16) {
        self.anchor
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_enabled(&self, action: MenuAction) -> bool {
        self.entries.iter().any(|entry| {
            matches!(entry, MenuEntry::Action { action: a, enabled: true } if *a == action)
        })
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> MenuOutcome {
        match key.code {
            KeyCode::Esc => MenuOutcome::Dismissed,
            KeyCode::Up => {
                self.move_highlight(-1);
                MenuOutcome::Pending
            }
            KeyCode::Down | KeyCode::Tab => {
                self.move_highlight(1);
                MenuOutcome::Pending
            }
            KeyCode::Enter => match self.highlighted.map(|i| self.entries[i]) {
                Some(MenuEntry::Action { action, .. }) => MenuOutcome::Chosen(action),
                _ => MenuOutcome::Dismissed,
            },
            _ => MenuOutcome::Pending,
        }
    }

    /// `bounds` is the area the menu is drawn in, see [`ContextMenu::area`].
    pub fn handle_mouse(&mut self, event: &MouseEvent, bounds: Rect) -> MenuOutcome {
        let hit = self.entry_at(event.column, event.row, bounds);
        match event.kind {
            MouseEventKind::Moved => {
                if let Some(index) = hit.filter(|&i| self.entries[i].is_selectable()) {
                    self.highlighted = Some(index);
                }
                MenuOutcome::Pending
            }
            MouseEventKind::Down(MouseButton::Left) => match hit.map(|i| self.entries[i]) {
                Some(MenuEntry::Action {
                    action,
                    enabled: true,
                }) => MenuOutcome::Chosen(action),
                // Disabled entries and separators keep the menu open
                Some(_) => MenuOutcome::Pending,
                None => MenuOutcome::Dismissed,
            },
            MouseEventKind::Down(_) if hit.is_none() => MenuOutcome::Dismissed,
            _ => MenuOutcome::Pending,
        }
    }

    /// Screen area of the menu, including its border, kept inside `bounds`.
    pub fn area(&self, bounds: Rect) -> Rect {
        let label_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                MenuEntry::Action { action, .. } => Some(action.label().len() as u16),
                MenuEntry::Separator => None,
            })
            .max()
            .unwrap_or(0);
        let width = (label_width + 4).min(bounds.width);
        let height = (self.entries.len() as u16 + 2).min(bounds.height);

        let max_x = (bounds.x + bounds.width).saturating_sub(width);
        let max_y = (bounds.y + bounds.height).saturating_sub(height);
        Rect {
            x: self.anchor.0.clamp(bounds.x, max_x.max(bounds.x)),
            y: self.anchor.1.clamp(bounds.y, max_y.max(bounds.y)),
            width,
            height,
        }
    }

    fn entry_at(&self, column: u16, row: u16, bounds: Rect) -> Option<usize> {
        let area = self.area(bounds);
        let inner_left = area.x + 1;
        let inner_right = (area.x + area.width).saturating_sub(1);
        let inner_top = area.y + 1;
        if column < inner_left || column >= inner_right || row < inner_top {
            return None;
        }
        let index = (row - inner_top) as usize;
        (index < self.entries.len() && row < (area.y + area.height).saturating_sub(1))
            .then_some(index)
    }

    fn move_highlight(&mut self, step: isize) {
        let Some(current) = self.highlighted else {
            return;
        };
        let count = self.entries.len() as isize;
        let mut index = current as isize;
        for _ in 0..count {
            index = (index + step).rem_euclid(count);
            if self.entries[index as usize].is_selectable() {
                self.highlighted = Some(index as usize);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 24,
    };

    #[test]
    fn test_enablement() {
        let menu = ContextMenu::new((0, 0), false, true);
        assert!(!menu.is_enabled(MenuAction::Copy));
        assert!(menu.is_enabled(MenuAction::Paste));
        assert!(menu.is_enabled(MenuAction::SelectAll));
        assert!(menu.is_enabled(MenuAction::Clear));
        assert_eq!(menu.entries()[3], MenuEntry::Separator);
    }

    #[test]
    fn test_highlight_skips_disabled_and_separator() {
        let mut menu = ContextMenu::new((0, 0), false, false);
        // Copy and Paste are disabled, so Select All is first
        assert_eq!(menu.highlighted(), Some(2));
        assert_eq!(menu.handle_key(&key(KeyCode::Down)), MenuOutcome::Pending);
        assert_eq!(menu.highlighted(), Some(4));
        menu.handle_key(&key(KeyCode::Down));
        assert_eq!(menu.highlighted(), Some(2));
        menu.handle_key(&key(KeyCode::Up));
        assert_eq!(menu.highlighted(), Some(4));
        assert_eq!(
            menu.handle_key(&key(KeyCode::Enter)),
            MenuOutcome::Chosen(MenuAction::Clear)
        );
    }

    #[test]
    fn test_escape_dismisses() {
        let mut menu = ContextMenu::new((0, 0), true, true);
        assert_eq!(menu.handle_key(&key(KeyCode::Esc)), MenuOutcome::Dismissed);
    }

    #[test]
    fn test_area_is_clamped_to_bounds() {
        let menu = ContextMenu::new((78, 22), true, true);
        let area = menu.area(SCREEN);
        assert_eq!(area.width, "Select All".len() as u16 + 4);
        assert_eq!(area.height, 7);
        assert_eq!(area.x + area.width, 80);
        assert_eq!(area.y + area.height, 24);
    }

    #[test]
    fn test_click_chooses_enabled_entry() {
        let mut menu = ContextMenu::new((10, 5), true, false);
        // Border at row 5, entries start at row 6
        assert_eq!(
            menu.handle_mouse(&click(12, 6), SCREEN),
            MenuOutcome::Chosen(MenuAction::Copy)
        );
        // Paste is disabled, the separator is inert
        assert_eq!(menu.handle_mouse(&click(12, 7), SCREEN), MenuOutcome::Pending);
        assert_eq!(menu.handle_mouse(&click(12, 9), SCREEN), MenuOutcome::Pending);
        assert_eq!(
            menu.handle_mouse(&click(12, 10), SCREEN),
            MenuOutcome::Chosen(MenuAction::Clear)
        );
    }

    #[test]
    fn test_click_outside_dismisses() {
        let mut menu = ContextMenu::new((10, 5), true, true);
        assert_eq!(menu.handle_mouse(&click(2, 2), SCREEN), MenuOutcome::Dismissed);
        // The border itself is outside every entry
        assert_eq!(menu.handle_mouse(&click(10, 5), SCREEN), MenuOutcome::Dismissed);
    }
}
