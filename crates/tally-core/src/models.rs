use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// One parsed record of delimited input.
///
/// Fields are positional: index 1 holds the category label and index 2 the
/// amount.
pub type Row = Vec<String>;

/// Field index of the grouping key within a [`Row`].
pub const CATEGORY_FIELD: usize = 1;

/// Field index of the numeric amount within a [`Row`].
pub const AMOUNT_FIELD: usize = 2;

/// Running sum for a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Grouping label, compared exactly (case-sensitive, untrimmed).
    pub category: String,
    /// Sum of every amount parsed for this category.
    pub sum: f64,
}

/// The accumulator: per-category sums in first-insertion order.
///
/// A category appears at most once. Entries are never removed, so the order
/// in which categories were first seen is the display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTotals {
    entries: Vec<CategoryTotal>,
    index: HashMap<String, usize>,
}

impl CategoryTotals {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `category`, inserting the category at the end when it
    /// has not been seen before.
    pub fn add(&mut self, category: &str, amount: f64) {
        match self.index.get(category) {
            Some(&pos) => self.entries[pos].sum += amount,
            None => {
                self.index.insert(category.to_string(), self.entries.len());
                self.entries.push(CategoryTotal {
                    category: category.to_string(),
                    sum: amount,
                });
            }
        }
    }

    /// Current sum for `category`, if it has been seen.
    pub fn get(&self, category: &str) -> Option<f64> {
        self.index.get(category).map(|&pos| self.entries[pos].sum)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CategoryTotal> {
        self.entries.iter()
    }

    /// Category labels in first-insertion order.
    pub fn categories(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.category.as_str()).collect()
    }

    /// Sum over every category, accumulated in display order.
    pub fn grand_total(&self) -> f64 {
        self.entries.iter().fold(0.0, |acc, e| acc + e.sum)
    }

    /// Consume the accumulator, yielding its entries in display order.
    pub fn into_entries(self) -> Vec<CategoryTotal> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a CategoryTotals {
    type Item = &'a CategoryTotal;
    type IntoIter = std::slice::Iter<'a, CategoryTotal>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for CategoryTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_inserts_then_accumulates() {
        let mut totals = CategoryTotals::new();
        totals.add("USD", 10.0);
        totals.add("EUR", 5.0);
        totals.add("USD", 2.5);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals.get("USD"), Some(12.5));
        assert_eq!(totals.get("EUR"), Some(5.0));
        assert_eq!(totals.categories(), vec!["USD", "EUR"]);
    }

    #[test]
    fn test_category_match_is_exact() {
        let mut totals = CategoryTotals::new();
        totals.add("usd", 1.0);
        totals.add("USD", 2.0);
        totals.add(" USD", 3.0);

        assert_eq!(totals.len(), 3);
        assert_eq!(totals.get("usd"), Some(1.0));
        assert_eq!(totals.get("USD"), Some(2.0));
        assert_eq!(totals.get(" USD"), Some(3.0));
    }

    #[test]
    fn test_grand_total() {
        let mut totals = CategoryTotals::new();
        totals.add("USD", 12.5);
        totals.add("EUR", 5.0);
        assert!((totals.grand_total() - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_accumulator() {
        let totals = CategoryTotals::new();
        assert!(totals.is_empty());
        assert_eq!(totals.grand_total(), 0.0);
        assert!(totals.get("USD").is_none());
    }

    #[test]
    fn test_serializes_as_ordered_list() {
        let mut totals = CategoryTotals::new();
        totals.add("b", 1.0);
        totals.add("a", 2.0);

        let json = serde_json::to_value(&totals).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"category": "b", "sum": 1.0},
                {"category": "a", "sum": 2.0},
            ])
        );
    }

    #[test]
    fn test_into_entries_preserves_order() {
        let mut totals = CategoryTotals::new();
        totals.add("x", 1.0);
        totals.add("y", 2.0);
        totals.add("x", 3.0);

        let entries = totals.into_entries();
        assert_eq!(entries[0].category, "x");
        assert_eq!(entries[0].sum, 4.0);
        assert_eq!(entries[1].category, "y");
    }
}
