use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error type for Prudence
#[derive(Error, Debug)]
pub enum PrudenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No such source file for {label}: {target} (searched: {})", format_locations(.searched))]
    Resolution {
        label: String,
        target: String,
        searched: Vec<PathBuf>,
    },

    #[error("{label}: '{entrypoint}' is not defined in {}", .file.display())]
    MissingEntrypoint {
        label: String,
        file: PathBuf,
        entrypoint: String,
    },

    #[error("Command failed: {cmd:?}\nSTDERR from command:\n{stderr}")]
    CommandFailed { cmd: Vec<String>, stderr: String },

    #[error("Command timed out after {seconds}s: {cmd:?}")]
    Timeout { cmd: Vec<String>, seconds: f64 },

    #[error("{label}: cannot interpret '{raw}' as a value")]
    ValueCoercion { label: String, raw: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

/// Result type alias for Prudence
pub type Result<T> = std::result::Result<T, PrudenceError>;

fn format_locations(searched: &[PathBuf]) -> String {
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PrudenceError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PrudenceError::Config(msg.into())
    }

    /// Create a not-implemented error
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        PrudenceError::NotImplemented(msg.into())
    }

    pub fn notification<S: Into<String>>(msg: S) -> Self {
        PrudenceError::Notification(msg.into())
    }

    pub fn value_coercion<L: Into<String>, R: Into<String>>(label: L, raw: R) -> Self {
        PrudenceError::ValueCoercion {
            label: label.into(),
            raw: raw.into(),
        }
    }
}
