//! Per-category totals table and the diagnostics list for the tally TUI.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per category,
//! in first-seen order, plus a highlighted grand-total row at the bottom.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use tally_core::formatting::{self, CATEGORY_HEADING};
use tally_core::models::CategoryTotals;
use tally_runtime::diagnostics::Diagnostic;

use crate::themes::Theme;

/// Widest the category column is allowed to grow.
const MAX_CATEGORY_WIDTH: u16 = 40;

/// Display width of the category column: the widest label, clamped to
/// `8..=MAX_CATEGORY_WIDTH`.
pub fn category_column_width(totals: &CategoryTotals) -> u16 {
    let widest = totals
        .iter()
        .map(|e| UnicodeWidthStr::width(e.category.as_str()))
        .chain(std::iter::once("TOTAL".len()))
        .max()
        .unwrap_or(0);
    (widest as u16).clamp(8, MAX_CATEGORY_WIDTH)
}

/// Render the totals table into `area`.
pub fn render_totals_view(frame: &mut Frame, area: Rect, totals: &CategoryTotals, theme: &Theme) {
    let header = Row::new(
        ["Category", "Sum"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let mut rows: Vec<Row> = totals
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(entry.category.clone()),
                Cell::from(formatting::format_amount(entry.sum))
                    .style(theme.amount_style(entry.sum)),
            ])
            .style(style)
        })
        .collect();

    rows.push(
        Row::new(vec![
            Cell::from("TOTAL"),
            Cell::from(formatting::format_amount(totals.grand_total())),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(category_column_width(totals)),
        Constraint::Min(12),
    ];

    let title = CATEGORY_HEADING.trim_end_matches(':');
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render the placeholder shown before anything has been tallied, or when
/// the last batch produced no totals.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme, after_batch: bool) {
    let message = if after_batch {
        Span::styled("No amounts found in the last batch", theme.warning)
    } else {
        Span::styled("No totals yet", theme.dim)
    };
    let text = vec![
        Line::from(""),
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled(
            "Rows are summed by column 2, grouped by column 1 (counting from 0).",
            theme.dim,
        )),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text))
            .block(Block::default().borders(Borders::ALL).title(" Totals ")),
        area,
    );
}

/// Render the diagnostics of the last batch, one per line.
pub fn render_diagnostics(
    frame: &mut Frame,
    area: Rect,
    diagnostics: &[Diagnostic],
    theme: &Theme,
) {
    let items: Vec<ListItem> = diagnostics
        .iter()
        .map(|d| {
            let style = match d {
                Diagnostic::ParseError { .. } => theme.error,
                _ => theme.warning,
            };
            ListItem::new(Line::from(Span::styled(d.to_string(), style)))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Skipped files ({}) ", diagnostics.len())),
    );
    frame.render_widget(list, area);
}

// ── Tests ──────────────────────────────────────────────────────────────────────
