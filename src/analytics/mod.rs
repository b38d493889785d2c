// @file: src/analytics/mod.rs
// @description: Derived analytics on fetched open-interest tables.
// @author: LAS.

pub mod oi_tracker;

pub use oi_tracker::{classify_signal, compare_snapshots, filter_deltas, summarize, DeltaFilter, OiDelta, OiSignal, OiSummary};
