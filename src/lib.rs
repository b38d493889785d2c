// @file: src/lib.rs
// @description: Exposes the modular architecture for integration testing and external usage.
// @author: LAS.

pub mod analytics;
pub mod connectors;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::connectors::{fetch_market_top_changes, fetch_symbol_open_interest, OpenInterestService};
pub use crate::core::errors::{FetchError, FetchResult};
pub use crate::core::models::{ContractKind, OptionClass, OptionRow, ResultTable};
