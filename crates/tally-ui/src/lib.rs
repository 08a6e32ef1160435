//! Terminal UI layer for CSV Tally.
//!
//! Provides themes, the header and drop zone components, the totals table,
//! and the interactive event loop built on top of [`ratatui`].

pub mod app;
pub mod components;
pub mod themes;
pub mod totals_view;

pub use tally_core as core;
