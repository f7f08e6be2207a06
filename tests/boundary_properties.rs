// Property tests for the history/pending boundary under arbitrary input

mod common;

use common::running_session;
use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use proptest::prelude::*;
use ratatui::layout::Rect;
use shellpane::model::buffer::BoundaryBuffer;
use shellpane::view::surface::EditorSurface;

#[derive(Debug, Clone)]
enum Op {
    Output(String),
    /// Output that decodes to nothing visible
    SilentOutput(Vec<u8>),
    Key(KeyCode, KeyModifiers),
    MoveCursor(usize),
    Paste(String),
    SelectAll,
    Click(u16, u16),
    Drag(u16, u16),
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zé日 \\n\\t]{0,12}"
}

fn arb_key() -> impl Strategy<Value = (KeyCode, KeyModifiers)> {
    let codes = prop_oneof![
        any::<char>()
            .prop_filter("printable", |c| !c.is_control())
            .prop_map(KeyCode::Char),
        Just(KeyCode::Backspace),
        Just(KeyCode::Delete),
        Just(KeyCode::Left),
        Just(KeyCode::Right),
        Just(KeyCode::Home),
        Just(KeyCode::End),
        Just(KeyCode::Enter),
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::Tab),
        Just(KeyCode::Insert),
        Just(KeyCode::PageUp),
    ];
    let modifiers = prop_oneof![
        Just(KeyModifiers::NONE),
        Just(KeyModifiers::SHIFT),
        Just(KeyModifiers::CONTROL | KeyModifiers::SHIFT),
    ];
    (codes, modifiers)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_text().prop_map(Op::Output),
        arb_key().prop_map(|(code, modifiers)| Op::Key(code, modifiers)),
        (0..64usize).prop_map(Op::MoveCursor),
        arb_text().prop_map(Op::Paste),
        Just(Op::SelectAll),
        prop::sample::select(vec![
            b"\r".to_vec(),
            b"\x1b[0m".to_vec(),
            b"\x07".to_vec(),
            b"\r\n".to_vec(),
        ])
        .prop_map(Op::SilentOutput),
        (0..24u16, 0..12u16).prop_map(|(column, row)| Op::Click(column, row)),
        (0..24u16, 0..12u16).prop_map(|(column, row)| Op::Drag(column, row)),
    ]
}

fn pointer(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
    MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    }
}

proptest! {
    /// Boundary stays in range, never moves back, and history never changes
    #[test]
    fn prop_history_is_immutable(
        ops in prop::collection::vec(arb_op(), 1..40),
        strip_echo in any::<bool>(),
    ) {
        let mut session = running_session().with_strip_echo(strip_echo);
        session.surface_mut().set_viewport(Rect::new(0, 0, 20, 8));

        for op in ops {
            let before_boundary = session.surface().boundary();
            let before_history = session.surface().buffer().history().to_string();

            match op {
                Op::Output(text) => session.on_output(text.as_bytes()),
                Op::SilentOutput(bytes) => {
                    session.on_output(&bytes);
                    prop_assert_eq!(session.surface().pending_region(), "");
                }
                Op::Key(code, modifiers) => {
                    session.handle_key(&KeyEvent::new(code, modifiers));
                }
                Op::MoveCursor(offset) => session.surface_mut().set_cursor_position(offset),
                Op::Paste(text) => session.paste_text(&text),
                Op::SelectAll => session.surface_mut().select_all(),
                Op::Click(column, row) => {
                    let event = pointer(MouseEventKind::Down(MouseButton::Left), column, row);
                    session.handle_pointer(&event);
                }
                Op::Drag(column, row) => {
                    let event = pointer(MouseEventKind::Drag(MouseButton::Left), column, row);
                    session.handle_pointer(&event);
                }
            }

            let surface = session.surface();
            let text = surface.buffer().text();
            prop_assert!(surface.boundary() <= text.len());
            prop_assert!(surface.boundary() >= before_boundary);
            prop_assert!(text.starts_with(&before_history));
            prop_assert!(surface.cursor_position() <= text.len());
            prop_assert!(text.is_char_boundary(surface.cursor_position()));
        }
    }

    /// Appending nothing changes nothing
    #[test]
    fn prop_empty_append_is_idempotent(chunks in prop::collection::vec(arb_text(), 0..10), pending in arb_text()) {
        let mut buffer = BoundaryBuffer::new();
        for chunk in &chunks {
            buffer.append(chunk);
        }
        let end = buffer.end();
        buffer.insert(end, &pending).unwrap();

        let text = buffer.text().to_string();
        let boundary = buffer.boundary();
        buffer.append("");
        prop_assert_eq!(buffer.text(), text.as_str());
        prop_assert_eq!(buffer.boundary(), boundary);
    }

    /// Writes only ever carry pending text plus the terminator
    #[test]
    fn prop_submitted_bytes_end_with_terminator(lines in prop::collection::vec("[a-z ]{0,8}", 1..6)) {
        let mut session = running_session();
        for line in &lines {
            session.paste_text(line);
            session.handle_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
            session.on_output(b"$ ");
        }

        let expected: String = lines.iter().map(|line| format!("{line}\n")).collect();
        prop_assert_eq!(session.process().written_text(), expected);
    }
}
