//! Analysis modules.
//!
//! Summaries and rankings computed over an already-aggregated forest.

pub mod aggregator;

pub use aggregator::*;
