//! Interpreter process channel
//!
//! `ProcessBackend` is the seam between the session and the OS: spawn, write
//! to stdin, switch the output channel mode, and poll lifecycle notifications.
//! `ChildProcess` implements it with `std::process` pipes and one reader
//! thread per output stream. Both threads feed a single channel, which is what
//! merges stdout and stderr into one stream.
//!
//! Polling never blocks, so the UI thread can call it every frame.

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Read size for the pipe reader threads
const READ_CHUNK_SIZE: usize = 4096;

/// How long output may keep draining after the child has exited. A background
/// job that inherited the pipes can hold them open far longer.
const EXIT_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// The interpreter to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// How stderr is routed relative to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// stderr is delivered as ordinary output
    Merged,
    /// stderr is kept apart (logged, not displayed)
    Separated,
}

/// How the process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Normal,
    Crashed,
}

/// Classified channel failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessErrorKind {
    FailedToStart,
    Crashed,
    TimedOut,
    WriteError,
    ReadError,
    Unknown,
}

/// A channel failure with its OS-level description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessError {
    pub kind: ProcessErrorKind,
    pub message: String,
}

impl ProcessError {
    pub fn new(kind: ProcessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProcessError {}

/// Notifications from the process, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A batch of bytes from the merged output stream
    Output(Vec<u8>),
    Exited { code: i32, kind: ExitKind },
    Error(ProcessError),
}

/// Process-execution layer consumed by the session
pub trait ProcessBackend {
    fn spawn(&mut self, command: &ShellCommand) -> Result<(), ProcessError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), ProcessError>;

    fn set_channel_mode(&mut self, mode: ChannelMode);

    /// Next pending notification, without blocking.
    fn poll_event(&mut self) -> Option<ProcessEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Messages from the reader threads
#[derive(Debug)]
enum PipeMessage {
    Data(Stream, Vec<u8>),
    Closed(Stream),
    Failed(Stream, String),
}

/// A local interpreter connected through pipes
pub struct ChildProcess {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    receiver: Option<Receiver<PipeMessage>>,
    separated: Arc<AtomicBool>,
    open_streams: usize,
    /// Exit status seen by `try_wait`, and when it was first seen
    exit: Option<(ExitStatus, Instant)>,
    finished: bool,
}

impl Default for ChildProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ChildProcess {
    pub fn new() -> Self {
        Self {
            child: None,
            stdin: None,
            receiver: None,
            separated: Arc::new(AtomicBool::new(false)),
            open_streams: 0,
            exit: None,
            finished: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some() && !self.finished
    }

    /// Start a reader thread for one pipe. Returns false if the thread could
    /// not be started, in which case nothing will arrive from that stream.
    fn spawn_reader<R>(stream: Stream, mut pipe: R, sender: Sender<PipeMessage>) -> bool
    where
        R: Read + Send + 'static,
    {
        let name = match stream {
            Stream::Stdout => "shell-stdout",
            Stream::Stderr => "shell-stderr",
        };
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut buffer = vec![0u8; READ_CHUNK_SIZE];
            loop {
                match pipe.read(&mut buffer) {
                    Ok(0) => {
                        let _ = sender.send(PipeMessage::Closed(stream));
                        break;
                    }
                    Ok(n) => {
                        if sender
                            .send(PipeMessage::Data(stream, buffer[..n].to_vec()))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = sender.send(PipeMessage::Failed(stream, e.to_string()));
                        break;
                    }
                }
            }
        });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to spawn {} reader thread: {}", name, e);
                false
            }
        }
    }

    fn translate(&mut self, message: PipeMessage) -> Option<ProcessEvent> {
        match message {
            PipeMessage::Data(Stream::Stdout, bytes) => Some(ProcessEvent::Output(bytes)),
            PipeMessage::Data(Stream::Stderr, bytes) => {
                if self.separated.load(Ordering::Relaxed) {
                    tracing::debug!(
                        "stderr (separated): {}",
                        String::from_utf8_lossy(&bytes).trim_end()
                    );
                    None
                } else {
                    Some(ProcessEvent::Output(bytes))
                }
            }
            PipeMessage::Closed(stream) => {
                tracing::debug!("{:?} closed", stream);
                self.open_streams = self.open_streams.saturating_sub(1);
                None
            }
            PipeMessage::Failed(stream, message) => {
                tracing::warn!("Reading {:?} failed: {}", stream, message);
                self.open_streams = self.open_streams.saturating_sub(1);
                Some(ProcessEvent::Error(ProcessError::new(
                    ProcessErrorKind::ReadError,
                    message,
                )))
            }
        }
    }

    /// Exit notification once both pipes have drained, or once the drain
    /// timeout has passed since the child exited
    fn check_exit(&mut self) -> Option<ProcessEvent> {
        if self.finished {
            return None;
        }
        if self.exit.is_none() {
            let child = self.child.as_mut()?;
            match child.try_wait() {
                Ok(Some(status)) => self.exit = Some((status, Instant::now())),
                Ok(None) => return None,
                Err(e) => {
                    self.finished = true;
                    self.stdin = None;
                    return Some(ProcessEvent::Error(ProcessError::new(
                        ProcessErrorKind::Unknown,
                        e.to_string(),
                    )));
                }
            }
        }

        let (status, exited_at) = self.exit?;
        if self.open_streams > 0 {
            if exited_at.elapsed() < EXIT_DRAIN_TIMEOUT {
                return None;
            }
            tracing::debug!(
                "Reporting exit with {} output stream(s) still open",
                self.open_streams
            );
        }
        self.finished = true;
        self.stdin = None;
        let (code, kind) = classify_exit(status);
        tracing::info!("Process exited with code {} ({:?})", code, kind);
        Some(ProcessEvent::Exited { code, kind })
    }
}

impl ProcessBackend for ChildProcess {
    fn spawn(&mut self, command: &ShellCommand) -> Result<(), ProcessError> {
        if self.is_running() {
            return Err(ProcessError::new(
                ProcessErrorKind::FailedToStart,
                "process is already running",
            ));
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("TERM", "dumb");
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ProcessError::new(
                ProcessErrorKind::FailedToStart,
                format!("Failed to start {}: {}", command.program, e),
            )
        })?;
        tracing::info!("Spawned {} (pid {})", command.program, child.id());

        let (sender, receiver) = mpsc::channel();
        self.open_streams = 0;
        if let Some(stdout) = child.stdout.take() {
            if Self::spawn_reader(Stream::Stdout, stdout, sender.clone()) {
                self.open_streams += 1;
            }
        }
        if let Some(stderr) = child.stderr.take() {
            if Self::spawn_reader(Stream::Stderr, stderr, sender) {
                self.open_streams += 1;
            }
        }

        self.stdin = child.stdin.take();
        self.child = Some(child);
        self.receiver = Some(receiver);
        self.exit = None;
        self.finished = false;
        self.separated.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ProcessError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            ProcessError::new(ProcessErrorKind::WriteError, "process is not running")
        })?;
        stdin
            .write_all(bytes)
            .and_then(|_| stdin.flush())
            .map_err(|e| ProcessError::new(ProcessErrorKind::WriteError, e.to_string()))?;
        tracing::debug!("Wrote {} bytes to process", bytes.len());
        Ok(())
    }

    fn set_channel_mode(&mut self, mode: ChannelMode) {
        self.separated
            .store(mode == ChannelMode::Separated, Ordering::Relaxed);
    }

    fn poll_event(&mut self) -> Option<ProcessEvent> {
        while let Some(receiver) = self.receiver.as_ref() {
            match receiver.try_recv() {
                Ok(message) => {
                    if let Some(event) = self.translate(message) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.open_streams = 0;
                    self.receiver = None;
                }
            }
        }
        self.check_exit()
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(child) = self.child.as_mut() {
            if !self.finished {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

#[cfg(unix)]
fn classify_exit(status: ExitStatus) -> (i32, ExitKind) {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => (code, ExitKind::Normal),
        (None, Some(signal)) => (signal, ExitKind::Crashed),
        (None, None) => (-1, ExitKind::Crashed),
    }
}

#[cfg(not(unix))]
fn classify_exit(status: ExitStatus) -> (i32, ExitKind) {
    match status.code() {
        Some(code) => (code, ExitKind::Normal),
        None => (-1, ExitKind::Crashed),
    }
}
