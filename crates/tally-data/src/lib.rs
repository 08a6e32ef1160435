//! Data layer for csv-tally.
//!
//! Parses dropped files into rows and folds rows into per-category totals.

pub mod aggregator;
pub mod reader;

pub use tally_core as core;
