//! Reusable pieces of the tally screen.

pub mod drop_zone;
pub mod header;
