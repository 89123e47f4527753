//! Output module for operator-facing reports
//!
//! This module handles:
//! - Collecting relay statistics from the store
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, RelayStatistics};
