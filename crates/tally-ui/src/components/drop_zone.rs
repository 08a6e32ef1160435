//! The terminal drop zone.
//!
//! Dragging a file onto most terminal emulators pastes its path, quoted or
//! backslash-escaped, sometimes as a `file://` URI. [`parse_dropped_paths`]
//! turns that text back into paths; [`DropZone`] renders the zone itself.

use std::path::PathBuf;

use ratatui::text::{Line, Span};
use url::Url;

use crate::themes::Theme;

/// Split dropped or typed text into paths.
///
/// Whitespace and newlines separate paths unless quoted with `'` or `"`.
/// Outside quotes a backslash escapes the next character (not on Windows,
/// where it is the path separator). `file://` URIs, with or without a
/// `localhost` host, are converted to local paths.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let escapes = !cfg!(windows);
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    has_token = true;
                }
                '\\' if escapes => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        has_token = true;
                    }
                }
                c if c.is_whitespace() => {
                    if has_token {
                        push_path(&mut paths, std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                c => {
                    current.push(c);
                    has_token = true;
                }
            },
        }
    }

    if has_token {
        push_path(&mut paths, current);
    }

    paths
}

fn push_path(paths: &mut Vec<PathBuf>, token: String) {
    if token.is_empty() {
        return;
    }
    if !token.starts_with("file:") {
        paths.push(PathBuf::from(token));
        return;
    }
    match Url::parse(&token).ok().and_then(|u| u.to_file_path().ok()) {
        Some(path) => paths.push(path),
        None => {
            // Left as-is so the batch reports it as an unreadable file.
            tracing::debug!(uri = %token, "dropped URI does not name a local file");
            paths.push(PathBuf::from(token));
        }
    }
}

// ── DropZone ──────────────────────────────────────────────────────────────────

/// Contents of the drop zone box.
pub struct DropZone<'a> {
    /// Text typed so far.
    pub input: &'a str,
    /// Batch currently processing, if any.
    pub processing: Option<u64>,
    /// Batches waiting behind the current one.
    pub queued: usize,
    pub theme: &'a Theme,
}

impl<'a> DropZone<'a> {
    /// Render the zone as three lines: prompt, input, status.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let status = match self.processing {
            Some(id) if self.queued > 0 => Span::styled(
                format!("Processing batch #{} ({} queued)…", id + 1, self.queued),
                self.theme.warning,
            ),
            Some(id) => Span::styled(
                format!("Processing batch #{}…", id + 1),
                self.theme.warning,
            ),
            None => Span::styled("Idle", self.theme.dim),
        };

        vec![
            Line::from(Span::styled(
                "Drag 'n' drop files here, or type paths and press Enter",
                self.theme.text,
            )),
            Line::from(vec![
                Span::styled("> ", self.theme.label),
                Span::styled(self.input.to_string(), self.theme.input),
            ]),
            Line::from(status),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
