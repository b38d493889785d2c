// @file: src/connectors/barchart/mod.rs
// @description: Options open-interest connector: session bootstrap, pagination and page parsing.
// @author: LAS.

pub mod paginator;
pub mod parser;
pub mod session;

pub use paginator::Paginator;
pub use parser::{decode_contract_kind, parse_page};
pub use session::BrowserSessionFactory;
