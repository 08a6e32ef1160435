//! Per-category summing of parsed rows.

use std::sync::OnceLock;

use regex::Regex;
use tally_core::models::{CategoryTotals, Row, AMOUNT_FIELD, CATEGORY_FIELD};

// ── AggregateStats ────────────────────────────────────────────────────────────

/// What happened to each row during one [`aggregate_with_stats`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Rows examined.
    pub rows_seen: usize,
    /// Rows with fewer than three fields.
    pub rows_short: usize,
    /// Rows whose amount field has no leading number.
    pub rows_non_numeric: usize,
    /// Rows that added an amount to a category.
    pub rows_contributed: usize,
}

impl AggregateStats {
    /// Fold another call's counters into these.
    pub fn add(&mut self, other: &AggregateStats) {
        self.rows_seen += other.rows_seen;
        self.rows_short += other.rows_short;
        self.rows_non_numeric += other.rows_non_numeric;
        self.rows_contributed += other.rows_contributed;
    }
}

// ── Amount parsing ────────────────────────────────────────────────────────────

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
            .expect("regex is valid")
    })
}

/// Parse the leading decimal number of `field`, ignoring anything after it.
///
/// Leading whitespace is skipped. Returns `None` when the field does not
/// start with a number, e.g. `"abc"`, `""` or `"-"`.
pub fn parse_amount(field: &str) -> Option<f64> {
    let m = leading_number().find(field)?;
    m.as_str().trim_start().parse::<f64>().ok()
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Fold `rows` into `totals` and return the updated accumulator.
///
/// Rows shorter than three fields and rows whose amount has no leading
/// number are skipped without error.
pub fn aggregate(totals: CategoryTotals, rows: &[Row]) -> CategoryTotals {
    aggregate_with_stats(totals, rows).0
}

/// [`aggregate`], also reporting how each row was handled.
pub fn aggregate_with_stats(
    mut totals: CategoryTotals,
    rows: &[Row],
) -> (CategoryTotals, AggregateStats) {
    let mut stats = AggregateStats::default();

    for row in rows {
        stats.rows_seen += 1;

        if row.len() <= AMOUNT_FIELD {
            stats.rows_short += 1;
            continue;
        }

        match parse_amount(&row[AMOUNT_FIELD]) {
            Some(amount) => {
                totals.add(&row[CATEGORY_FIELD], amount);
                stats.rows_contributed += 1;
            }
            None => {
                tracing::debug!(
                    row = stats.rows_seen,
                    amount = %row[AMOUNT_FIELD],
                    "skipping row without a numeric amount"
                );
                stats.rows_non_numeric += 1;
            }
        }
    }

    (totals, stats)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
