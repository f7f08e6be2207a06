//! Application state for the terminal front-end
//!
//! `ShellApp` owns one session and translates crossterm events into session
//! calls. Application keys (quit) are handled here before the boundary rules
//! see them.

pub mod session;

use crate::config::{Config, ConfigError};
use crate::services::clipboard::Clipboard;
use crate::services::process::{ChildProcess, ProcessBackend, ShellCommand};
use crate::view::render;
use crate::view::text_area::TextArea;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::Frame;
use session::SessionController;

pub struct ShellApp<P: ProcessBackend = ChildProcess> {
    session: SessionController<TextArea, P>,
    command: ShellCommand,
    should_quit: bool,
}

impl ShellApp<ChildProcess> {
    /// Build an app that runs the configured interpreter as a child process.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::with_backend(config, ChildProcess::new(), Clipboard::new())
    }
}

impl<P: ProcessBackend> ShellApp<P> {
    pub fn with_backend(
        config: &Config,
        process: P,
        clipboard: Clipboard,
    ) -> Result<Self, ConfigError> {
        let surface = TextArea::new(clipboard).with_scroll_lines(config.view.scroll_lines);
        let session = SessionController::from_config(surface, process, &config.shell)?;
        Ok(Self {
            session,
            command: config.shell.command(),
            should_quit: false,
        })
    }

    pub fn start(&mut self) {
        let command = self.command.clone();
        self.session.start(&command);
    }

    pub fn session(&self) -> &SessionController<TextArea, P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionController<TextArea, P> {
        &mut self.session
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Drain process output and lifecycle events. Returns true if the screen
    /// needs a redraw.
    pub fn process_async_messages(&mut self) -> bool {
        self.session.pump()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        {
            tracing::info!("Quit requested");
            self.should_quit = true;
            return;
        }
        self.session.handle_key(&key);
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        self.session.handle_pointer(&mouse);
        true
    }

    /// Text delivered through bracketed paste
    pub fn paste_text(&mut self, text: String) {
        self.session.paste_text(&text);
    }

    pub fn status_text(&self) -> String {
        format!(
            "{} · {} · {}   Ctrl+Q quit",
            self.session.state(),
            self.command.program,
            self.session.encoding_name()
        )
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let (text_rect, _) = render::layout(frame.area());
        self.session.surface_mut().set_viewport(text_rect);
        self.session.set_menu_bounds(text_rect);

        let status = self.status_text();
        render::draw(frame, self.session.surface(), &status, self.session.menu());
    }
}
