//! Core types for csv-tally.
//!
//! Holds the row and accumulator data model, the shared error type,
//! command-line settings and plain-text/JSON rendering of totals.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, TallyError};
pub use models::{CategoryTotal, CategoryTotals, Row};
