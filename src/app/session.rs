//! Session controller: the boundary between the text surface and the shell
//!
//! Every key and pointer event goes through here. The controller asks the
//! interceptor what to do, relocates the caret when needed, submits the
//! pending line, and appends whatever the process produces. Lifecycle is an
//! explicit state machine:
//!
//! ```text
//! Starting ──spawn ok──▶ Running ──exit 0..N──▶ Finished { code }
//!     │                     │
//!     └──spawn failed──┐    └──signal / error──▶ Crashed { reason }
//!                      ▼
//!               Crashed { FailedToStart }
//! ```

use crate::config::{ConfigError, ShellConfig};
use crate::input::context_menu::{ContextMenu, MenuAction, MenuOutcome};
use crate::input::interceptor::{
    decide_key, decide_pointer, CursorContext, KeyDecision, PointerDecision,
};
use crate::primitives::encoding::{strip_echo, StreamCodec};
use crate::services::process::{
    ChannelMode, ExitKind, ProcessBackend, ProcessError, ProcessErrorKind, ProcessEvent,
    ShellCommand,
};
use crate::view::surface::EditorSurface;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;
use std::fmt;

/// Why a session ended abnormally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashReason {
    /// Abnormal exit (signal number on Unix)
    ExitCode(i32),
    Error(ProcessErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Finished { code: i32 },
    Crashed { reason: CrashReason },
}

impl SessionState {
    /// Finished or crashed; nothing more will be written
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished { .. } | SessionState::Crashed { .. }
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Finished { code } => write!(f, "Finished ({code})"),
            SessionState::Crashed {
                reason: CrashReason::ExitCode(code),
            } => write!(f, "Crashed ({code})"),
            SessionState::Crashed {
                reason: CrashReason::Error(kind),
            } => write!(f, "Crashed ({kind:?})"),
        }
    }
}

/// Status line for a channel error
fn error_status_line(error: &ProcessError) -> String {
    match error.kind {
        ProcessErrorKind::FailedToStart => error.message.clone(),
        ProcessErrorKind::Crashed => "Process crashed".to_string(),
        ProcessErrorKind::TimedOut => "Process timedout".to_string(),
        ProcessErrorKind::WriteError => "Error writing to process".to_string(),
        ProcessErrorKind::ReadError => "Error reading from process".to_string(),
        ProcessErrorKind::Unknown => "Process encountered error".to_string(),
    }
}

pub struct SessionController<S: EditorSurface, P: ProcessBackend> {
    surface: S,
    process: P,
    state: SessionState,
    codec: StreamCodec,
    line_terminator: String,
    strip_echo: bool,
    /// Bytes of the last submitted line, awaiting the next output batch
    echo: Option<Vec<u8>>,
    menu: Option<ContextMenu>,
    /// Area the context menu is laid out in
    menu_bounds: Rect,
}

impl<S: EditorSurface, P: ProcessBackend> SessionController<S, P> {
    pub fn new(surface: S, process: P, codec: StreamCodec) -> Self {
        Self {
            surface,
            process,
            state: SessionState::Starting,
            codec,
            line_terminator: "\n".to_string(),
            strip_echo: false,
            echo: None,
            menu: None,
            menu_bounds: Rect::default(),
        }
    }

    pub fn from_config(surface: S, process: P, config: &ShellConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(surface, process, config.codec()?)
            .with_line_terminator(config.line_terminator.clone())
            .with_strip_echo(config.strip_echo))
    }

    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    pub fn with_strip_echo(mut self, enabled: bool) -> Self {
        self.strip_echo = enabled;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    pub fn process_mut(&mut self) -> &mut P {
        &mut self.process
    }

    pub fn encoding_name(&self) -> &'static str {
        self.codec.encoding_name()
    }

    /// Bytes waiting to be stripped from the next output batch
    pub fn pending_echo(&self) -> Option<&[u8]> {
        self.echo.as_deref()
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn set_menu_bounds(&mut self, bounds: Rect) {
        self.menu_bounds = bounds;
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    fn cursor_context(&self) -> CursorContext {
        CursorContext {
            cursor: self.surface.cursor_position(),
            boundary: self.surface.boundary(),
            end: self.surface.end(),
        }
    }

    fn move_cursor_to_end(&mut self) {
        let end = self.surface.end();
        self.surface.set_cursor_position(end);
    }

    /// Spawn the interpreter with merged output channels.
    pub fn start(&mut self, command: &ShellCommand) {
        self.state = SessionState::Starting;
        self.process.set_channel_mode(ChannelMode::Merged);
        match self.process.spawn(command) {
            Ok(()) => {
                tracing::info!("Session started: {}", command.program);
                self.state = SessionState::Running;
            }
            Err(e) => {
                tracing::error!("Failed to start {}: {}", command.program, e.message);
                self.on_error(e);
            }
        }
    }

    /// Route a key event. Returns true when the surface's default handling
    /// was suppressed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if let Some(menu) = self.menu.as_mut() {
            let outcome = menu.handle_key(key);
            self.finish_menu(outcome);
            return true;
        }

        let decision = decide_key(key, self.cursor_context());
        match decision {
            KeyDecision::Consume => {}
            KeyDecision::Relocate(offset) => self.surface.set_cursor_position(offset),
            KeyDecision::Submit => self.submit_line(),
            KeyDecision::Paste => self.paste(),
            KeyDecision::PassThrough => {
                self.surface.handle_default_key(key);
            }
            KeyDecision::RelocateThenPassThrough(offset) => {
                self.surface.set_cursor_position(offset);
                self.surface.handle_default_key(key);
            }
        }
        decision.is_consumed()
    }

    /// Route a pointer event. Returns true when it was consumed.
    pub fn handle_pointer(&mut self, event: &MouseEvent) -> bool {
        if let Some(menu) = self.menu.as_mut() {
            let outcome = menu.handle_mouse(event, self.menu_bounds);
            self.finish_menu(outcome);
            return true;
        }

        match decide_pointer(event) {
            PointerDecision::OpenContextMenu { column, row } => {
                let can_copy = self.surface.selection().is_some();
                let can_paste = self.surface.has_pasteable_content();
                self.menu = Some(ContextMenu::new((column, row), can_copy, can_paste));
                true
            }
            PointerDecision::PassThrough => {
                self.surface.handle_default_pointer(event);
                false
            }
        }
    }

    fn finish_menu(&mut self, outcome: MenuOutcome) {
        match outcome {
            MenuOutcome::Pending => {}
            MenuOutcome::Dismissed => self.menu = None,
            MenuOutcome::Chosen(action) => {
                self.menu = None;
                self.apply_menu_action(action);
            }
        }
    }

    pub fn apply_menu_action(&mut self, action: MenuAction) {
        tracing::debug!("Context menu action: {:?}", action);
        match action {
            MenuAction::Copy => self.surface.copy_selection(),
            MenuAction::Paste => self.paste(),
            MenuAction::SelectAll => self.surface.select_all(),
            MenuAction::Clear => self.surface.clear_all(),
        }
    }

    /// Move the caret out of history before text is inserted at it.
    fn relocate_for_paste(&mut self) {
        let boundary = self.surface.boundary();
        let selection_reaches_history = self
            .surface
            .selection()
            .is_some_and(|range| range.start < boundary);
        if self.surface.cursor_position() < boundary || selection_reaches_history {
            self.surface.set_cursor_position(boundary);
        }
    }

    /// Paste from the clipboard into the pending region.
    pub fn paste(&mut self) {
        if !self.surface.has_pasteable_content() {
            return;
        }
        self.relocate_for_paste();
        self.surface.paste_at_cursor();
    }

    /// Insert text delivered by the terminal's bracketed paste.
    pub fn paste_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.relocate_for_paste();
        self.surface.insert_text_at_cursor(text);
    }

    /// Send the pending line to the process.
    ///
    /// The line stays in the pending region until the next output batch
    /// moves the boundary past it.
    pub fn submit_line(&mut self) {
        self.move_cursor_to_end();
        let line = format!("{}{}", self.surface.pending_region(), self.line_terminator);
        let bytes = self.codec.encode(&line);

        if self.state != SessionState::Running {
            tracing::debug!(
                "Dropping {} bytes, session is {}",
                bytes.len(),
                self.state
            );
            return;
        }

        if let Err(e) = self.process.write(&bytes) {
            tracing::warn!("Write to process failed: {}", e);
            self.on_error(ProcessError::new(ProcessErrorKind::WriteError, e.message));
            return;
        }
        if self.strip_echo {
            self.echo = Some(bytes);
        }
    }

    /// Append a batch of process output.
    ///
    /// Any non-empty batch settles the submitted line, even when stripping
    /// and decoding leave nothing to show.
    pub fn on_output(&mut self, raw: &[u8]) {
        if raw.is_empty() {
            return;
        }
        let data = match self.echo.take() {
            Some(echo) => match strip_echo(raw, &echo) {
                Some(rest) => {
                    tracing::trace!("Stripped {} echoed bytes", raw.len() - rest.len());
                    rest
                }
                None => raw,
            },
            None => raw,
        };

        let text = self.codec.decode(data);
        if text.is_empty() {
            self.surface.freeze_pending();
        } else {
            self.surface.append_text(&text);
        }
        self.move_cursor_to_end();
    }

    pub fn on_exited(&mut self, code: i32, kind: ExitKind) {
        let line = match kind {
            ExitKind::Normal => {
                self.state = SessionState::Finished { code };
                format!("Process has finished with code {code}")
            }
            ExitKind::Crashed => {
                self.state = SessionState::Crashed {
                    reason: CrashReason::ExitCode(code),
                };
                format!("Process has crashed with code {code}")
            }
        };
        tracing::info!("{}", line);
        self.surface.append_formatted_line(&line);
        self.process.set_channel_mode(ChannelMode::Separated);
        self.echo = None;
        self.move_cursor_to_end();
    }

    pub fn on_error(&mut self, error: ProcessError) {
        tracing::warn!("Process error: {}", error);
        if !self.state.is_terminal() {
            self.state = SessionState::Crashed {
                reason: CrashReason::Error(error.kind),
            };
        }
        self.surface.append_formatted_line(&error_status_line(&error));
        self.move_cursor_to_end();
    }

    /// Dispatch every pending process event. Returns true if any arrived.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Some(event) = self.process.poll_event() {
            changed = true;
            match event {
                ProcessEvent::Output(bytes) => self.on_output(&bytes),
                ProcessEvent::Exited { code, kind } => self.on_exited(code, kind),
                ProcessEvent::Error(error) => self.on_error(error),
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clipboard::Clipboard;
    use crate::view::text_area::TextArea;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedProcess {
        written: Vec<u8>,
        modes: Vec<ChannelMode>,
        events: VecDeque<ProcessEvent>,
        fail_spawn: bool,
        fail_write: bool,
    }

    impl ProcessBackend for ScriptedProcess {
        fn spawn(&mut self, command: &ShellCommand) -> Result<(), ProcessError> {
            if self.fail_spawn {
                return Err(ProcessError::new(
                    ProcessErrorKind::FailedToStart,
                    format!("Failed to start {}: not found", command.program),
                ));
            }
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> Result<(), ProcessError> {
            if self.fail_write {
                return Err(ProcessError::new(ProcessErrorKind::WriteError, "broken pipe"));
            }
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn set_channel_mode(&mut self, mode: ChannelMode) {
            self.modes.push(mode);
        }

        fn poll_event(&mut self) -> Option<ProcessEvent> {
            self.events.pop_front()
        }
    }

    fn session(process: ScriptedProcess) -> SessionController<TextArea, ScriptedProcess> {
        let mut session = SessionController::new(
            TextArea::new(Clipboard::internal_only()),
            process,
            StreamCodec::utf8(),
        );
        session.start(&ShellCommand::new("sh"));
        session
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_start_merges_channels() {
        let session = session(ScriptedProcess::default());
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.process().modes, vec![ChannelMode::Merged]);
    }

    #[test]
    fn test_spawn_failure_reports_error_text() {
        let session = session(ScriptedProcess {
            fail_spawn: true,
            ..Default::default()
        });
        assert_eq!(
            session.state(),
            SessionState::Crashed {
                reason: CrashReason::Error(ProcessErrorKind::FailedToStart)
            }
        );
        assert_eq!(
            session.surface().buffer().text(),
            "Failed to start sh: not found\n"
        );
    }

    #[test]
    fn test_submit_then_output_settles_line() {
        let mut session = session(ScriptedProcess::default());
        session.on_output(b"$ ");
        session.paste_text("echo hi");
        session.handle_key(&key(KeyCode::Enter));
        assert_eq!(session.process().written, b"echo hi\n");
        assert_eq!(session.surface().pending_region(), "echo hi");

        session.on_output(b"hi\n$ ");
        assert_eq!(session.surface().buffer().text(), "$ echo hi\nhi\n$ ");
        assert_eq!(session.surface().pending_region(), "");
    }

    #[test]
    fn test_writes_dropped_after_exit() {
        let mut session = session(ScriptedProcess::default());
        session.on_exited(0, ExitKind::Normal);
        session.paste_text("ls");
        session.submit_line();
        assert!(session.process().written.is_empty());
    }

    #[test]
    fn test_write_failure_crashes_session() {
        let mut session = session(ScriptedProcess {
            fail_write: true,
            ..Default::default()
        });
        session.submit_line();
        assert_eq!(
            session.state(),
            SessionState::Crashed {
                reason: CrashReason::Error(ProcessErrorKind::WriteError)
            }
        );
        assert!(session
            .surface()
            .buffer()
            .text()
            .contains("Error writing to process"));
    }

    #[test]
    fn test_error_status_lines() {
        let cases = [
            (ProcessErrorKind::Crashed, "Process crashed"),
            (ProcessErrorKind::TimedOut, "Process timedout"),
            (ProcessErrorKind::WriteError, "Error writing to process"),
            (ProcessErrorKind::ReadError, "Error reading from process"),
            (ProcessErrorKind::Unknown, "Process encountered error"),
        ];
        for (kind, expected) in cases {
            let error = ProcessError::new(kind, "os detail");
            assert_eq!(error_status_line(&error), expected);
        }
    }

    #[test]
    fn test_error_after_exit_keeps_finished_state() {
        let mut session = session(ScriptedProcess::default());
        session.on_exited(2, ExitKind::Normal);
        session.on_error(ProcessError::new(ProcessErrorKind::ReadError, "eof"));
        assert_eq!(session.state(), SessionState::Finished { code: 2 });
    }

    #[test]
    fn test_crash_exit() {
        let mut session = session(ScriptedProcess::default());
        session.on_exited(9, ExitKind::Crashed);
        assert_eq!(
            session.state(),
            SessionState::Crashed {
                reason: CrashReason::ExitCode(9)
            }
        );
        assert!(session
            .surface()
            .buffer()
            .text()
            .contains("Process has crashed with code 9"));
        assert_eq!(session.process().modes.last(), Some(&ChannelMode::Separated));
    }

    #[test]
    fn test_pump_dispatches_in_order() {
        let mut process = ScriptedProcess::default();
        process.events.push_back(ProcessEvent::Output(b"bye\n".to_vec()));
        process.events.push_back(ProcessEvent::Exited {
            code: 0,
            kind: ExitKind::Normal,
        });
        let mut session = session(process);

        assert!(session.pump());
        assert!(!session.pump());
        assert_eq!(
            session.surface().buffer().text(),
            "bye\nProcess has finished with code 0\n"
        );
    }

    #[test]
    fn test_echo_only_stripped_once() {
        let mut session = session(ScriptedProcess::default()).with_strip_echo(true);
        session.paste_text("dir");
        session.submit_line();
        assert_eq!(session.pending_echo(), Some(&b"dir\n"[..]));

        session.on_output(b"dir\r\nfile.txt\r\n");
        assert_eq!(session.pending_echo(), None);
        session.on_output(b"dir\n");
        assert_eq!(session.surface().buffer().text(), "dir\nfile.txt\ndir\n");
    }

    #[test]
    fn test_fully_stripped_echo_still_settles_line() {
        let mut session = session(ScriptedProcess::default()).with_strip_echo(true);
        session.paste_text("dir");
        session.submit_line();

        session.on_output(b"dir\r\n");
        assert_eq!(session.surface().pending_region(), "");
        assert_eq!(session.surface().boundary(), session.surface().end());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Running.to_string(), "Running");
        assert_eq!(SessionState::Finished { code: 1 }.to_string(), "Finished (1)");
        assert_eq!(
            SessionState::Crashed {
                reason: CrashReason::Error(ProcessErrorKind::TimedOut)
            }
            .to_string(),
            "Crashed (TimedOut)"
        );
    }
}
