//! Row parsing for dropped files.
//!
//! Decides which files are eligible, splits their text into [`Row`]s using
//! common CSV conventions, and expands dropped directories into the files
//! beneath them.

use std::path::{Path, PathBuf};

use tally_core::error::{Result, TallyError};
use tally_core::models::Row;
use tracing::{debug, warn};

const QUOTE: u8 = b'"';

// ── Public API ────────────────────────────────────────────────────────────────

/// `true` when the file name ends with `extension` (case-sensitive).
pub fn is_supported_file(path: &Path, extension: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(extension))
        .unwrap_or(false)
}

/// Parse the full content of one file into rows.
///
/// Fields may be quoted to carry delimiters, newlines or doubled quotes.
/// Rows of different widths are allowed and there is no header row. The
/// returned error has no path attached; use [`TallyError::with_path`].
pub fn parse_rows(content: &[u8], delimiter: u8) -> Result<Vec<Row>> {
    let text = std::str::from_utf8(content)
        .map_err(|e| TallyError::parse("", format!("content is not valid UTF-8 text: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    check_quoting(text, delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| TallyError::parse("", e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

/// Read `path` from disk and parse it with [`parse_rows`].
pub fn load_rows(path: &Path, delimiter: u8) -> Result<Vec<Row>> {
    let content = std::fs::read(path).map_err(|source| TallyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = parse_rows(&content, delimiter).map_err(|e| e.with_path(path))?;
    debug!("Parsed {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Expand dropped paths into the ordered list of candidate files.
///
/// Directories are replaced by every regular file beneath them, sorted by
/// path. Anything else passes through unchanged and in drop order, so
/// missing files still surface later as read failures.
pub fn expand_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::with_capacity(paths.len());

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut nested: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        nested.sort();
        debug!("Expanded {} into {} files", path.display(), nested.len());
        files.extend(nested);
    }

    files
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Reject content whose last quoted field is never closed.
///
/// The csv reader accepts an unterminated quote and silently swallows the
/// rest of the file into one field, so this is checked up front. A quote only
/// opens a field when it is the first byte of that field; inside a quoted
/// field a doubled quote is an escaped literal.
fn check_quoting(text: &str, delimiter: u8) -> Result<()> {
    let bytes = text.as_bytes();
    let mut line = 1usize;
    let mut at_field_start = true;
    let mut open_since: Option<usize> = None;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\n' {
            line += 1;
        }

        if open_since.is_some() {
            if b == QUOTE {
                if bytes.get(i + 1) == Some(&QUOTE) {
                    i += 1;
                } else {
                    open_since = None;
                }
            }
        } else if b == QUOTE && at_field_start {
            open_since = Some(line);
            at_field_start = false;
        } else {
            at_field_start = b == delimiter || b == b'\n' || b == b'\r';
        }

        i += 1;
    }

    match open_since {
        Some(start) => Err(TallyError::parse(
            "",
            format!("unterminated quoted field starting on line {start}"),
        )),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    // ── is_supported_file ─────────────────────────────────────────────────────

    #[test]
    fn test_supported_extension_is_case_sensitive() {
        assert!(is_supported_file(Path::new("ledger.csv"), ".csv"));
        assert!(is_supported_file(Path::new("/data/2024/ledger.csv"), ".csv"));
        assert!(!is_supported_file(Path::new("ledger.CSV"), ".csv"));
        assert!(!is_supported_file(Path::new("report.txt"), ".csv"));
        assert!(!is_supported_file(Path::new("ledger.csv.bak"), ".csv"));
    }

    #[test]
    fn test_supported_extension_checks_name_not_directory() {
        assert!(!is_supported_file(Path::new("exports.csv/readme"), ".csv"));
    }

    // ── parse_rows ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_simple_rows() {
        let rows = parse_rows(b"date,USD,10\ndate,EUR,5\ndate,USD,2.5", b',').unwrap();
        assert_eq!(
            rows,
            vec![
                row(&["date", "USD", "10"]),
                row(&["date", "EUR", "5"]),
                row(&["date", "USD", "2.5"]),
            ]
        );
    }

    #[test]
    fn test_first_row_is_data() {
        let rows = parse_rows(b"date,currency,amount\n2024-01-01,USD,3\n", b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], row(&["date", "currency", "amount"]));
    }

    #[test]
    fn test_quoted_fields_keep_delimiters_newlines_and_quotes() {
        let content = b"\"a,b\",\"line1\nline2\",\"say \"\"hi\"\"\"\n";
        let rows = parse_rows(content, b',').unwrap();
        assert_eq!(rows, vec![row(&["a,b", "line1\nline2", "say \"hi\""])]);
    }

    #[test]
    fn test_ragged_rows_are_allowed() {
        let rows = parse_rows(b"a\nb,c,d,e\nf,g\n", b',').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[1].len(), 4);
        assert_eq!(rows[2].len(), 2);
    }

    #[test]
    fn test_fields_are_not_trimmed() {
        let rows = parse_rows(b"x, USD ,1\n", b',').unwrap();
        assert_eq!(rows[0][1], " USD ");
    }

    #[test]
    fn test_crlf_line_endings() {
        let rows = parse_rows(b"d,USD,1\r\nd,EUR,2\r\n", b',').unwrap();
        assert_eq!(rows, vec![row(&["d", "USD", "1"]), row(&["d", "EUR", "2"])]);
    }

    #[test]
    fn test_custom_delimiter() {
        let rows = parse_rows(b"d;USD;1,5\n", b';').unwrap();
        assert_eq!(rows, vec![row(&["d", "USD", "1,5"])]);
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let rows = parse_rows("\u{feff}d,USD,1\n".as_bytes(), b',').unwrap();
        assert_eq!(rows[0][0], "d");
    }

    #[test]
    fn test_empty_content_yields_no_rows() {
        assert!(parse_rows(b"", b',').unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_parse_error() {
        let err = parse_rows(b"date,USD,10\ndate,\"EUR,5\n", b',').unwrap_err();
        match err {
            TallyError::Parse { detail, .. } => {
                assert!(detail.contains("unterminated quoted field"), "{detail}");
                assert!(detail.contains("line 2"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        let rows = parse_rows(b"tv,55\" screen,400\n", b',').unwrap();
        assert_eq!(rows, vec![row(&["tv", "55\" screen", "400"])]);
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parse_rows(&[b'a', b',', 0xff, 0xfe, b'\n'], b',').unwrap_err();
        assert!(matches!(err, TallyError::Parse { .. }));
        assert!(err.to_string().contains("UTF-8"));
    }

    // ── load_rows ─────────────────────────────────────────────────────────────

    #[test]
    fn test_load_rows_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", b"d,USD,1\n");
        let rows = load_rows(&path, b',').unwrap();
        assert_eq!(rows, vec![row(&["d", "USD", "1"])]);
    }

    #[test]
    fn test_load_rows_missing_file() {
        let err = load_rows(Path::new("/tmp/does-not-exist-tally-test.csv"), b',').unwrap_err();
        assert!(matches!(err, TallyError::FileRead { .. }));
    }

    #[test]
    fn test_load_rows_parse_error_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "bad.csv", b"\"never closed\n");
        match load_rows(&path, b',').unwrap_err() {
            TallyError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // ── expand_inputs ─────────────────────────────────────────────────────────

    #[test]
    fn test_expand_inputs_keeps_files_in_drop_order() {
        let dir = TempDir::new().unwrap();
        let b = write_file(dir.path(), "b.csv", b"");
        let a = write_file(dir.path(), "a.csv", b"");
        let missing = dir.path().join("missing.csv");

        let files = expand_inputs(&[b.clone(), missing.clone(), a.clone()]);
        assert_eq!(files, vec![b, missing, a]);
    }

    #[test]
    fn test_expand_inputs_walks_directories_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("march");
        std::fs::create_dir_all(&sub).unwrap();
        write_file(dir.path(), "c.csv", b"");
        write_file(dir.path(), "a.txt", b"");
        write_file(&sub, "b.csv", b"");

        let files = expand_inputs(&[dir.path().to_path_buf()]);
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.txt", "c.csv", "march/b.csv"]);
    }
}
