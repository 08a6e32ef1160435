use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Decoration placed either side of the application title.
pub const ACCENT: &str = "◆ ◇ ◆";

/// Dashboard header rendering four lines:
///
/// 1. Application title between accents (ALL CAPS).
/// 2. A 60-column `=` separator.
/// 3. Parsing options in `[ delimiter | extension ]` format.
/// 4. An empty line.
pub struct Header<'a> {
    /// Field delimiter in effect.
    pub delimiter: char,
    /// Required file name suffix, e.g. `".csv"`.
    pub extension: &'a str,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(delimiter: char, extension: &'a str, theme: &'a Theme) -> Self {
        Self {
            delimiter,
            extension,
            theme,
        }
    }

    /// Render the header as exactly four lines.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let separator = "=".repeat(60);

        vec![
            Line::from(vec![
                Span::styled(ACCENT, self.theme.header_accent),
                Span::styled(" CSV CATEGORY TALLY ", self.theme.header),
                Span::styled(ACCENT, self.theme.header_accent),
            ]),
            Line::from(Span::styled(separator, self.theme.separator)),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(
                    format!("delimiter {}", delimiter_label(self.delimiter)),
                    self.theme.value,
                ),
                Span::styled(" | ", self.theme.label),
                Span::styled(format!("*{}", self.extension), self.theme.value),
                Span::styled(" ]", self.theme.label),
            ]),
            Line::from(""),
        ]
    }
}

/// Printable name for a delimiter character.
fn delimiter_label(delimiter: char) -> String {
    match delimiter {
        '\t' => "tab".to_string(),
        ' ' => "space".to_string(),
        c => format!("'{c}'"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
