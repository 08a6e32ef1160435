use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extension a file name must end with to be tallied.
pub const DEFAULT_EXTENSION: &str = ".csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Sum a numeric column of CSV files grouped by category
#[derive(Parser, Debug, Clone)]
#[command(
    name = "csv-tally",
    about = "Sum a numeric column of CSV files grouped by category",
    version
)]
pub struct Settings {
    /// Files to tally as one batch; opens the interactive drop zone when empty
    pub files: Vec<PathBuf>,

    /// Field delimiter (a single ASCII character, or "tab")
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: char,

    /// File name suffix required for a file to be tallied (case-sensitive)
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Output format for one-shot mode
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved preferences
    #[arg(long)]
    pub clear: bool,
}

/// Accepts a single ASCII character, or the words `tab` / `\t`.
fn parse_delimiter(raw: &str) -> Result<char, String> {
    let c = match raw {
        "tab" | "\\t" => '\t',
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(format!("delimiter must be a single character, got {raw:?}")),
            }
        }
    };
    if !c.is_ascii() || c == '"' || c == '\n' || c == '\r' {
        return Err(format!("unsupported delimiter {c:?}"));
    }
    Ok(c)
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Display preferences persisted to `~/.csv-tally/last_used.json`.
///
/// Only presentation choices are stored. Parsing options such as the
/// delimiter and tallied results never are.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".csv-tally").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Failed to clear {}: {}", config_path.display(), e);
            }
            return settings.apply_debug();
        }

        let last = LastUsedParams::load_from(config_path);

        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = settings.apply_debug();

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::debug!("Failed to persist preferences: {}", e);
        }

        settings
    }

    /// The delimiter as the byte handed to the CSV reader.
    pub fn delimiter_byte(&self) -> u8 {
        // Guaranteed ASCII by `parse_delimiter`.
        self.delimiter as u8
    }

    /// `true` when no files were given and the interactive drop zone should run.
    pub fn is_interactive(&self) -> bool {
        self.files.is_empty()
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
