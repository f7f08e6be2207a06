//! Shared helpers for the integration tests
#![allow(dead_code)]

pub mod tracing;

use shellpane::app::session::SessionController;
use shellpane::primitives::encoding::StreamCodec;
use shellpane::services::clipboard::Clipboard;
use shellpane::services::process::{
    ChannelMode, ExitKind, ProcessBackend, ProcessError, ProcessErrorKind, ProcessEvent,
    ShellCommand,
};
use shellpane::view::text_area::TextArea;
use std::collections::VecDeque;

/// Process backend driven by the test: records everything the session sends
/// and replays queued events on poll.
#[derive(Debug, Default)]
pub struct FakeProcess {
    pub spawned: Vec<ShellCommand>,
    pub written: Vec<u8>,
    pub modes: Vec<ChannelMode>,
    pub events: VecDeque<ProcessEvent>,
    pub spawn_error: Option<String>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&mut self, bytes: &[u8]) {
        self.events.push_back(ProcessEvent::Output(bytes.to_vec()));
    }

    pub fn push_exit(&mut self, code: i32, kind: ExitKind) {
        self.events.push_back(ProcessEvent::Exited { code, kind });
    }

    pub fn push_error(&mut self, kind: ProcessErrorKind, message: &str) {
        self.events
            .push_back(ProcessEvent::Error(ProcessError::new(kind, message)));
    }

    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    pub fn mode(&self) -> Option<ChannelMode> {
        self.modes.last().copied()
    }
}

impl ProcessBackend for FakeProcess {
    fn spawn(&mut self, command: &ShellCommand) -> Result<(), ProcessError> {
        if let Some(message) = &self.spawn_error {
            return Err(ProcessError::new(
                ProcessErrorKind::FailedToStart,
                message.clone(),
            ));
        }
        self.spawned.push(command.clone());
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ProcessError> {
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

pub type TestSession = SessionController<TextArea, FakeProcess>;

/// A running UTF-8 session over a fake process with an internal clipboard.
pub fn running_session() -> TestSession {
    let mut session = SessionController::new(
        TextArea::new(Clipboard::internal_only()),
        FakeProcess::new(),
        StreamCodec::utf8(),
    );
    session.start(&ShellCommand::new("/bin/sh"));
    session
}
