use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Root of the per-user state directory, `~/.csv-tally/`.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".csv-tally")
}

/// Ensure `~/.csv-tally/` and `~/.csv-tally/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = app_dir();
    std::fs::create_dir_all(&dir)?;
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(())
}

/// Log file used by the interactive mode when `--log-file` is not given.
pub fn default_log_file() -> PathBuf {
    app_dir().join("logs").join("csv-tally.log")
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name to an [`EnvFilter`] directive.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// With `log_file` set, records are appended to that file without ANSI
/// colours; otherwise they go to stderr. Unrecognised levels fall back to
/// `"info"`.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_home<T>(home: &Path, f: impl FnOnce() -> T) -> T {
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", home);

        let result = f();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }
        result
    }

    // ── ensure_directories ────────────────────────────────────────────────────

    #[test]
    fn test_ensure_directories_and_default_log_file() {
        let tmp = TempDir::new().expect("tempdir");

        let (result, log_file) =
            with_home(tmp.path(), || (ensure_directories(), default_log_file()));
        result.expect("ensure_directories should succeed");

        let dir = tmp.path().join(".csv-tally");
        assert!(dir.is_dir(), ".csv-tally dir must exist");
        assert!(dir.join("logs").is_dir(), "logs subdir must exist");
        assert_eq!(log_file, dir.join("logs").join("csv-tally.log"));
    }

    // ── level_directive ───────────────────────────────────────────────────────

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("Trace"), "trace");
    }
}
