// @file: src/connectors/open_interest.rs
// @description: Public entry points that configure and drive the paginator for market-wide and per-symbol OI.
// @author: LAS.

use log::info;
use crate::connectors::barchart::{BrowserSessionFactory, Paginator};
use crate::core::errors::{FetchError, FetchResult};
use crate::core::interfaces::{SessionFactory, Sleeper, ThreadSleeper};
use crate::core::models::{FetchPolicy, OptionClass, ProviderSettings, QuerySpec, ResultTable};
use crate::utils::config::AppConfig;

//
// SERVICE
//

/// Owns nothing shared between calls; every call opens its own sessions.
pub struct OpenInterestService<F: SessionFactory, S: Sleeper> {
    settings: ProviderSettings,
    policy: FetchPolicy,
    factory: F,
    sleeper: S,
}

impl OpenInterestService<BrowserSessionFactory, ThreadSleeper> {
    pub fn from_config(config: &AppConfig) -> Self {
        let settings: ProviderSettings = config.get_provider_settings();
        let factory: BrowserSessionFactory = BrowserSessionFactory::new(settings.clone());
        Self::new(settings, config.get_fetch_policy(), factory, ThreadSleeper)
    }
}

impl<F: SessionFactory, S: Sleeper> OpenInterestService<F, S> {
    pub fn new(settings: ProviderSettings, policy: FetchPolicy, factory: F, sleeper: S) -> Self {
        Self { settings, policy, factory, sleeper }
    }

    //
    // PUBLIC INTERFACE
    //

    /// Largest OI changes across the whole market for one option class.
    pub fn fetch_market_top_changes(
        &self,
        option_class: OptionClass,
        overall_cap: usize,
        min_change_threshold: i64,
    ) -> FetchResult<ResultTable> {
        let context: String = format!("market {}", option_class);
        validate_cap(overall_cap)?;

        // #1. Market scans run on a single session
        let policy: FetchPolicy = self.policy.without_rotation();
        let query: QuerySpec = QuerySpec::market_top_changes(option_class, policy.page_size, overall_cap);

        let mut table: ResultTable = Paginator::new(&self.factory, &self.sleeper, &self.settings, &policy)
            .run(&query)
            .map_err(|e| e.at_boundary(&context))?;

        // #2. Optional floor on OI change
        if min_change_threshold > 0 {
            table.retain_min_change(min_change_threshold);
            info!("[{}] {} rows with OI change >= {}", context, table.len(), min_change_threshold);
        }

        table.sort_by_oi_change_desc();
        Ok(table)
    }

    /// Every contract of one underlying, ranked by OI change.
    pub fn fetch_symbol_open_interest(
        &self,
        symbol: &str,
        option_class: OptionClass,
        overall_cap: usize,
    ) -> FetchResult<ResultTable> {
        let symbol: String = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(FetchError::InvalidInput("symbol must not be empty".to_string()));
        }
        validate_cap(overall_cap)?;

        let query: QuerySpec = QuerySpec::symbol_history(&symbol, option_class, self.policy.page_size, overall_cap);

        Paginator::new(&self.factory, &self.sleeper, &self.settings, &self.policy)
            .run(&query)
            .map_err(|e| e.at_boundary(&symbol))
    }
}

//
// CONVENIENCE FUNCTIONS
//

pub fn fetch_market_top_changes(
    option_class: OptionClass,
    overall_cap: usize,
    min_change_threshold: i64,
) -> FetchResult<ResultTable> {
    let config: AppConfig = AppConfig::load()?;
    OpenInterestService::from_config(&config).fetch_market_top_changes(option_class, overall_cap, min_change_threshold)
}

pub fn fetch_symbol_open_interest(
    symbol: &str,
    option_class: OptionClass,
    overall_cap: usize,
) -> FetchResult<ResultTable> {
    let config: AppConfig = AppConfig::load()?;
    OpenInterestService::from_config(&config).fetch_symbol_open_interest(symbol, option_class, overall_cap)
}

fn validate_cap(overall_cap: usize) -> FetchResult<()> {
    if overall_cap == 0 {
        return Err(FetchError::InvalidInput("overall cap must be at least 1".to_string()));
    }
    Ok(())
}
