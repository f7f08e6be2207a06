//! Services that talk to the outside world: the interpreter process, the
//! clipboard, the terminal and the log file

pub mod clipboard;
pub mod log_dirs;
pub mod process;
pub mod terminal_modes;
pub mod tracing_setup;
