use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::primitives::encoding::StreamCodec;
use crate::services::process::ShellCommand;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub view: ViewConfig,
}

/// The interpreter the session runs and how to talk to it
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellConfig {
    /// Program to start, e.g. `/bin/sh` or `cmd`
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the interpreter (inherits ours when unset)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Encoding label for the interpreter's I/O (any WHATWG label)
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Remove the interpreter's echo of each submitted line from its output
    #[serde(default = "default_strip_echo")]
    pub strip_echo: bool,

    /// Appended to every submitted line
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
}

#[cfg(windows)]
fn default_program() -> String {
    "cmd".to_string()
}

#[cfg(not(windows))]
fn default_program() -> String {
    "/bin/sh".to_string()
}

#[cfg(windows)]
fn default_encoding() -> String {
    "ibm866".to_string()
}

#[cfg(not(windows))]
fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_strip_echo() -> bool {
    cfg!(windows)
}

fn default_line_terminator() -> String {
    "\n".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            working_dir: None,
            encoding: default_encoding(),
            strip_echo: default_strip_echo(),
            line_terminator: default_line_terminator(),
        }
    }
}

impl ShellConfig {
    pub fn command(&self) -> ShellCommand {
        let mut command = ShellCommand::new(self.program.as_str()).with_args(&self.args);
        command.working_dir = self.working_dir.clone();
        command
    }

    pub fn codec(&self) -> Result<StreamCodec, ConfigError> {
        StreamCodec::for_label(&self.encoding).ok_or_else(|| {
            ConfigError::ValidationError(format!("unknown encoding '{}'", self.encoding))
        })
    }
}

/// Terminal front-end behavior
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ViewConfig {
    /// Capture the mouse for caret placement, selection and the context menu
    #[serde(default = "default_true")]
    pub mouse: bool,

    /// Lines scrolled per wheel notch
    #[serde(default = "default_scroll_lines")]
    pub scroll_lines: usize,
}

fn default_true() -> bool {
    true
}

fn default_scroll_lines() -> usize {
    3
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            mouse: true,
            scroll_lines: default_scroll_lines(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, else from the user config file if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match user_config_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {:?}", path);
                Self::load_from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shell.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shell.program must not be empty".to_string(),
            ));
        }
        self.shell.codec()?;
        Ok(())
    }

    /// JSON Schema of the config file
    pub fn schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}

/// `$XDG_CONFIG_HOME/shellpane/config.json` or the platform equivalent
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shellpane").join("config.json"))
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
