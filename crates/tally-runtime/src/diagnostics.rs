//! Per-file diagnostics and the sinks that receive them.
//!
//! A diagnostic never changes the totals; it only records why a file
//! contributed nothing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tally_core::error::TallyError;

// ── Diagnostic ────────────────────────────────────────────────────────────────

/// Why a file in a batch contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The file name lacks the recognised extension.
    UnsupportedFileType { file: PathBuf },
    /// The file could not be read or is not well-formed delimited text.
    ParseError { file: PathBuf, detail: String },
    /// The file parsed but no row carried a usable amount.
    EmptyResult { file: PathBuf },
}

impl Diagnostic {
    /// Classify a per-file error.
    pub fn from_error(file: &Path, err: &TallyError) -> Self {
        let file = file.to_path_buf();
        match err {
            TallyError::UnsupportedFileType(_) => Diagnostic::UnsupportedFileType { file },
            TallyError::EmptyResult(_) => Diagnostic::EmptyResult { file },
            TallyError::Parse { detail, .. } => Diagnostic::ParseError {
                file,
                detail: detail.clone(),
            },
            TallyError::FileRead { source, .. } => Diagnostic::ParseError {
                file,
                detail: format!("failed to read file: {source}"),
            },
            other => Diagnostic::ParseError {
                file,
                detail: other.to_string(),
            },
        }
    }

    /// The file this diagnostic is about.
    pub fn file(&self) -> &Path {
        match self {
            Diagnostic::UnsupportedFileType { file }
            | Diagnostic::ParseError { file, .. }
            | Diagnostic::EmptyResult { file } => file,
        }
    }

    /// Short machine-friendly label for the diagnostic kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::UnsupportedFileType { .. } => "unsupported",
            Diagnostic::ParseError { .. } => "parse-error",
            Diagnostic::EmptyResult { .. } => "empty",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedFileType { file } => {
                write!(f, "Unsupported file format: {}", file.display())
            }
            Diagnostic::ParseError { file, detail } => {
                write!(f, "Error parsing {}: {}", file.display(), detail)
            }
            Diagnostic::EmptyResult { file } => {
                write!(f, "No data extracted from {}", file.display())
            }
        }
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Receives one call per diagnostic, fire-and-forget.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Writes diagnostics to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::ParseError { .. } => {
                tracing::error!(kind = diagnostic.kind(), "{}", diagnostic)
            }
            _ => tracing::warn!(kind = diagnostic.kind(), "{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic.clone());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
