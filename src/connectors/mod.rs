// @file: src/connectors/mod.rs
// @description: Provider connectors and the public open-interest entry points built on them.
// @author: LAS.

pub mod barchart;
pub mod open_interest;

pub use open_interest::{fetch_market_top_changes, fetch_symbol_open_interest, OpenInterestService};
