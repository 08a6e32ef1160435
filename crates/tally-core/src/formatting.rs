use crate::error::Result;
use crate::models::CategoryTotals;

/// Heading printed above the per-category lines.
pub const CATEGORY_HEADING: &str = "Total Sums by Category:";

/// Heading printed above the grand total.
pub const GRAND_TOTAL_HEADING: &str = "Total Sum of All Categories:";

/// Format a sum as plain text using the shortest representation that
/// round-trips.
///
/// Integral values drop the fractional part, magnitudes at or above `1e21`
/// or below `1e-6` switch to exponent notation, and negative zero prints as
/// `0`.
///
/// # Examples
///
/// ```
/// use tally_core::formatting::format_amount;
///
/// assert_eq!(format_amount(17.5), "17.5");
/// assert_eq!(format_amount(15.0), "15");
/// assert_eq!(format_amount(-0.0), "0");
/// assert_eq!(format_amount(1e21), "1e+21");
/// assert_eq!(format_amount(-2.5e-7), "-2.5e-7");
/// ```
pub fn format_amount(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if !(1e-6..1e21).contains(&abs) {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }

    format!("{}", value)
}

/// One display line: `"label: sum"`.
///
/// # Examples
///
/// ```
/// use tally_core::formatting::format_total_line;
///
/// assert_eq!(format_total_line("USD", 12.5), "USD: 12.5");
/// ```
pub fn format_total_line(category: &str, sum: f64) -> String {
    format!("{}: {}", category, format_amount(sum))
}

/// Render the accumulator as plain text.
///
/// An empty accumulator renders as an empty string: nothing is listed when
/// no amount was tallied.
pub fn render_plain(totals: &CategoryTotals) -> String {
    if totals.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(CATEGORY_HEADING);
    out.push('\n');
    for entry in totals {
        out.push_str("  ");
        out.push_str(&format_total_line(&entry.category, entry.sum));
        out.push('\n');
    }
    out.push_str(GRAND_TOTAL_HEADING);
    out.push('\n');
    out.push_str("  ");
    out.push_str(&format_amount(totals.grand_total()));
    out.push('\n');
    out
}

/// Render the accumulator as a pretty-printed JSON document of the shape
/// `{ "totals": [{category, sum}], "grand_total": n }`.
pub fn render_json(totals: &CategoryTotals) -> Result<String> {
    let doc = serde_json::json!({
        "totals": totals,
        "grand_total": totals.grand_total(),
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}
