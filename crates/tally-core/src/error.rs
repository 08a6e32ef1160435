use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by csv-tally.
#[derive(Error, Debug)]
pub enum TallyError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file name does not end in the recognised extension.
    #[error("Unsupported file format: {0}")]
    UnsupportedFileType(PathBuf),

    /// The content is not well-formed delimited text.
    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    /// The file parsed but produced nothing that could be tallied.
    #[error("No data extracted from {0}")]
    EmptyResult(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be encoded or decoded.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TallyError {
    /// Build a [`TallyError::Parse`] for `path`.
    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        TallyError::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Attach `path` to a parse error that was produced without one.
    ///
    /// Other variants are returned unchanged.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            TallyError::Parse { detail, .. } => TallyError::Parse {
                path: path.into(),
                detail,
            },
            other => other,
        }
    }
}

/// Convenience alias used throughout the tally crates.
pub type Result<T> = std::result::Result<T, TallyError>;
