//! Error types for schema extraction runs

use std::path::PathBuf;
use thiserror::Error;

use schemex_convert::ConvertError;

pub type Result<T> = std::result::Result<T, Error>;

/// Where in a run an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// The configuration does not match the module (e.g. missing export).
    Config,
    /// The module could not be read or evaluated.
    Load,
    /// The converter rejected the exported value.
    Conversion,
    /// A sink (file or command) failed.
    Sink,
    /// The filesystem subscription failed.
    Watch,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Export '{export}' not found in {path} (available: {})", format_available(.available))]
    ExportNotFound {
        export: String,
        path: PathBuf,
        available: Vec<String>,
    },

    #[error("Failed to read module {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to evaluate module {file}: {message}")]
    Evaluate { file: PathBuf, message: String },

    #[error("Module not found: '{module}' imported from {from}")]
    ModuleNotFound { module: String, from: PathBuf },

    #[error("Circular import detected: {0}")]
    CircularImport(PathBuf),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    #[error("Failed to serialize schema: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to stdout: {0}")]
    Stdout(#[source] std::io::Error),

    #[error("Failed to spawn '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed with exit code {}", .code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string()))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("{0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub fn evaluate(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Evaluate {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Read {
            path: path.into(),
            source,
        }
    }

    pub fn stage(&self) -> ErrorStage {
        match self {
            Error::ExportNotFound { .. } => ErrorStage::Config,
            Error::Read { .. }
            | Error::Evaluate { .. }
            | Error::ModuleNotFound { .. }
            | Error::CircularImport(_) => ErrorStage::Load,
            Error::Conversion(_) | Error::Serialize(_) => ErrorStage::Conversion,
            Error::Stdout(_)
            | Error::FileWrite { .. }
            | Error::CommandSpawn { .. }
            | Error::CommandFailed { .. } => ErrorStage::Sink,
            Error::Watch(_) => ErrorStage::Watch,
        }
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}
