//! Runtime layer for csv-tally.
//!
//! Resolves dropped batches into totals, reports per-file diagnostics and
//! queues batches that arrive while another is still processing.

pub mod diagnostics;
pub mod orchestrator;

pub use tally_core as core;
pub use tally_data as data;
