//! Drawing the session with ratatui
//!
//! Lines are never wrapped; the text area scrolls horizontally instead so that
//! byte offsets map to one screen row each.

use crate::input::context_menu::{ContextMenu, MenuEntry};
use crate::view::surface::EditorSurface;
use crate::view::text_area::{char_width, TextArea};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};
use std::ops::Range;

/// Split the screen into the text area and the one-row status bar.
pub fn layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);
    (chunks[0], chunks[1])
}

/// Draw one frame. `text_area` must already have been given the text
/// rectangle from [`layout`] through `set_viewport`.
pub fn draw(frame: &mut Frame, text_area: &TextArea, status: &str, menu: Option<&ContextMenu>) {
    let (text_rect, status_rect) = layout(frame.area());

    let lines = visible_lines(text_area, text_rect);
    frame.render_widget(Paragraph::new(lines), text_rect);

    let status_bar = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::raw(status.to_string()),
    ]))
    .style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(status_bar, status_rect);

    match menu {
        Some(menu) => draw_menu(frame, menu, text_rect),
        None => {
            if let Some((column, row)) = text_area.cursor_cell() {
                frame.set_cursor_position((text_rect.x + column, text_rect.y + row));
            }
        }
    }
}

fn visible_lines(text_area: &TextArea, rect: Rect) -> Vec<Line<'static>> {
    let buffer = text_area.buffer();
    let text = buffer.text();
    let selection = text_area.selection();
    let emphasis = buffer.emphasis();
    let left = text_area.left_column();
    let width = rect.width as usize;

    let mut lines = Vec::with_capacity(rect.height as usize);
    let mut line_start = 0;
    for (index, line) in text.split('\n').enumerate() {
        if index >= text_area.top_line() + rect.height as usize {
            break;
        }
        if index >= text_area.top_line() {
            lines.push(styled_line(
                line,
                line_start,
                left,
                width,
                emphasis,
                selection.as_ref(),
            ));
        }
        line_start += line.len() + 1;
    }
    lines
}

fn styled_line(
    line: &str,
    line_start: usize,
    left: usize,
    width: usize,
    emphasis: &[Range<usize>],
    selection: Option<&Range<usize>>,
) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut current_style = Style::default();
    let mut column = 0;

    for (idx, ch) in line.char_indices() {
        if column >= left + width {
            break;
        }
        let offset = line_start + idx;
        let cells = char_width(ch, column);

        let mut style = Style::default();
        if emphasis.iter().any(|span| span.contains(&offset)) {
            style = style.add_modifier(Modifier::BOLD);
        }
        if selection.is_some_and(|range| range.contains(&offset)) {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let visible = if column >= left {
            if ch == '\t' {
                " ".repeat(cells)
            } else {
                ch.to_string()
            }
        } else if column + cells > left {
            // Partially scrolled-off tab or wide char
            " ".repeat(column + cells - left)
        } else {
            String::new()
        };
        column += cells;

        if visible.is_empty() {
            continue;
        }
        if style != current_style && !current.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut current), current_style));
        }
        current_style = style;
        current.push_str(&visible);
    }

    if !current.is_empty() {
        spans.push(Span::styled(current, current_style));
    }
    Line::from(spans)
}

fn draw_menu(frame: &mut Frame, menu: &ContextMenu, bounds: Rect) {
    let area = menu.area(bounds);
    if area.width < 3 || area.height < 3 {
        return;
    }
    let inner_width = area.width.saturating_sub(2) as usize;

    let items: Vec<ListItem> = menu
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            MenuEntry::Separator => ListItem::new("─".repeat(inner_width))
                .style(Style::default().fg(Color::DarkGray)),
            MenuEntry::Action { action, enabled } => {
                let mut style = Style::default();
                if !enabled {
                    style = style.fg(Color::DarkGray);
                } else if menu.highlighted() == Some(index) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                ListItem::new(format!(" {:<width$}", action.label(), width = inner_width - 1))
                    .style(style)
            }
        })
        .collect();

    frame.render_widget(Clear, area);
    let list = List::new(items).block(Block::default().borders(Borders::ALL));
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clipboard::Clipboard;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn row_text(buffer: &Buffer, row: u16) -> String {
        (0..buffer.area.width)
            .filter_map(|x| buffer.cell((x, row)).map(|cell| cell.symbol().to_string()))
            .collect()
    }

    fn render(text_area: &mut TextArea, menu: Option<&ContextMenu>) -> Buffer {
        let backend = TestBackend::new(30, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                let (text_rect, _) = layout(frame.area());
                text_area.set_viewport(text_rect);
                draw(frame, text_area, "Running · /bin/sh", menu);
            })
            .unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn test_history_and_status_bar() {
        let mut area = TextArea::new(Clipboard::internal_only());
        area.append_text("hello\n");
        area.append_formatted_line("Process has finished with code 0");

        let buffer = render(&mut area, None);
        assert!(row_text(&buffer, 0).starts_with("hello"));
        assert!(row_text(&buffer, 1).starts_with("Process has finished with code"));
        assert!(row_text(&buffer, 9).contains("Running · /bin/sh"));

        let status_cell = buffer.cell((0, 1)).unwrap();
        assert!(status_cell.modifier.contains(Modifier::BOLD));
        let output_cell = buffer.cell((0, 0)).unwrap();
        assert!(!output_cell.modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_tabs_expand_to_spaces() {
        let mut area = TextArea::new(Clipboard::internal_only());
        area.append_text("a\tb\n");
        let buffer = render(&mut area, None);
        assert!(row_text(&buffer, 0).starts_with("a       b"));
    }

    #[test]
    fn test_selection_is_highlighted() {
        let mut area = TextArea::new(Clipboard::internal_only());
        area.append_text("abc\n");
        area.select_all();
        let buffer = render(&mut area, None);
        let cell = buffer.cell((1, 0)).unwrap();
        assert!(cell.modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn test_context_menu_is_drawn() {
        let mut area = TextArea::new(Clipboard::internal_only());
        area.append_text("output\n");
        let menu = ContextMenu::new((2, 0), false, false);
        let buffer = render(&mut area, Some(&menu));
        let rows: Vec<String> = (0..9).map(|row| row_text(&buffer, row)).collect();
        assert!(rows.iter().any(|row| row.contains("Select All")));
        assert!(rows.iter().any(|row| row.contains("Clear")));
    }
}
