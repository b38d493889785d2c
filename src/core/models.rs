// @file: src/core/models.rs
// @description: Centralized data structures for option-contract rows, query specs and fetch settings.
// @author: LAS.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::errors::FetchError;


//
// OPTION CLASSES
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OptionClass {
    Call,
    Put,
    Both,
}

impl OptionClass {
    // #1. Value sent as `optionType`. `Both` means no filter at all.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            OptionClass::Call => Some("call"),
            OptionClass::Put => Some("put"),
            OptionClass::Both => None,
        }
    }

    pub fn labels_contracts(&self) -> bool {
        *self == OptionClass::Both
    }
}

impl fmt::Display for OptionClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s: &str = match self {
            OptionClass::Call => "call",
            OptionClass::Put => "put",
            OptionClass::Both => "both",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OptionClass {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "call" | "calls" => Ok(OptionClass::Call),
            "put" | "puts" => Ok(OptionClass::Put),
            "both" | "all" | "ambos" => Ok(OptionClass::Both),
            other => Err(FetchError::InvalidInput(format!("unknown option class '{}'", other))),
        }
    }
}

/// Label decoded from an OCC contract symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContractKind {
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "N/A")]
    Unknown,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s: &str = match self {
            ContractKind::Call => "CALL",
            ContractKind::Put => "PUT",
            ContractKind::Unknown => "N/A",
        };
        write!(f, "{}", s)
    }
}


//
// QUERY SPECIFICATION
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Market,
    Symbol(String),
}

impl QueryScope {
    pub fn label(&self) -> String {
        match self {
            QueryScope::Market => "market".to_string(),
            QueryScope::Symbol(symbol) => symbol.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

const MARKET_FIELDS: [&str; 14] = [
    "symbol", "baseSymbol", "strikePrice", "expirationDate",
    "daysToExpiration", "lastPrice", "priceChange", "percentChange",
    "volume", "openInterest", "openInterestChange", "volatility",
    "delta", "tradeTime",
];

const SYMBOL_FIELDS: [&str; 15] = [
    "symbol", "baseSymbol", "strikePrice", "expirationDate",
    "daysToExpiration", "lastPrice", "volume", "openInterest",
    "openInterestChange", "volatility", "delta", "gamma", "theta",
    "vega", "tradeTime",
];

/// Immutable parameters of one paginated fetch.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub fields: Vec<String>,
    pub order_by: String,
    pub order_dir: SortDirection,
    pub scope: QueryScope,
    pub option_class: OptionClass,
    pub page_size: usize,
    pub overall_cap: usize,
}

impl QuerySpec {
    pub fn market_top_changes(option_class: OptionClass, page_size: usize, overall_cap: usize) -> Self {
        Self {
            fields: MARKET_FIELDS.iter().map(|f| f.to_string()).collect(),
            order_by: "openInterestChange".to_string(),
            order_dir: SortDirection::Desc,
            scope: QueryScope::Market,
            option_class,
            page_size,
            overall_cap,
        }
    }

    pub fn symbol_history(symbol: &str, option_class: OptionClass, page_size: usize, overall_cap: usize) -> Self {
        Self {
            fields: SYMBOL_FIELDS.iter().map(|f| f.to_string()).collect(),
            order_by: "openInterestChange".to_string(),
            order_dir: SortDirection::Desc,
            scope: QueryScope::Symbol(symbol.trim().to_uppercase()),
            option_class,
            page_size,
            overall_cap,
        }
    }
}


//
// ROW & PAGE STRUCTURES
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRow {
    pub contract: String,
    pub underlying: String,
    pub strike: f64,
    pub expiration: String,
    pub days_to_expiration: i64,
    pub last_price: f64,
    pub volume: i64,
    pub open_interest: i64,
    pub open_interest_change: i64,
    pub implied_volatility: f64, // 2 dp
    pub delta: f64,              // 4 dp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContractKind>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub rows: Vec<OptionRow>,
    pub reported_count: Option<u64>,
    pub total_available: Option<u64>,
}

impl PageResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows of one query, assembled page by page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<OptionRow>,
}

impl ResultTable {
    pub fn from_rows(rows: Vec<OptionRow>) -> Self {
        Self { rows }
    }

    pub fn from_pages(pages: Vec<PageResult>) -> Self {
        let capacity: usize = pages.iter().map(|p| p.len()).sum();
        let mut rows: Vec<OptionRow> = Vec::with_capacity(capacity);
        for page in pages {
            rows.extend(page.rows);
        }
        Self { rows }
    }

    // Stable, so equal changes keep provider order.
    pub fn sort_by_oi_change_desc(&mut self) {
        self.rows.sort_by(|a, b| b.open_interest_change.cmp(&a.open_interest_change));
    }

    pub fn retain_min_change(&mut self, threshold: i64) {
        self.rows.retain(|row| row.open_interest_change >= threshold);
    }

    pub fn truncate(&mut self, cap: usize) {
        self.rows.truncate(cap);
    }

    pub fn rows(&self) -> &[OptionRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<OptionRow> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OptionRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_open_interest(&self) -> i64 {
        self.rows.iter().map(|r| r.open_interest).sum()
    }

    pub fn net_oi_change(&self) -> i64 {
        self.rows.iter().map(|r| r.open_interest_change).sum()
    }
}


//
// FETCH SETTINGS
//

/// Where and as whom the provider is contacted.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub bootstrap_url: String,
    pub api_url: String,
    pub market_referer: String,
    pub symbol_referer_template: String, // `{symbol}` placeholder
    pub user_agent: String,
    pub accept_language: String,
    pub token_cookie: String,
    pub token_header: String,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    pub fn referer_for(&self, scope: &QueryScope) -> String {
        match scope {
            QueryScope::Market => self.market_referer.clone(),
            QueryScope::Symbol(symbol) => self.symbol_referer_template.replace("{symbol}", symbol),
        }
    }
}

/// Pacing and retry behaviour of the paginator.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub page_size: usize,
    pub rate_limit_attempts: u32,
    pub page_delay: Duration,
    pub renewal_pause: Duration,
    pub pages_per_session: Option<usize>,
}

impl FetchPolicy {
    pub fn without_rotation(&self) -> Self {
        let mut policy: FetchPolicy = self.clone();
        policy.pages_per_session = None;
        policy
    }

    // 1s, 2s, 4s, 8s ...
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(16))
    }
}


//
// UNIT TESTS
//
