// @file: src/utils/config.rs
// @description: Configuration with defaults for provider endpoints, pacing and session rotation.
// @author: LAS.

use serde::Deserialize;
use config::{Config, ConfigBuilder, ConfigError, File, Environment};
use config::builder::DefaultState;
use std::time::Duration;
use crate::core::models::{FetchPolicy, ProviderSettings};

//
// TYPE DEFINITIONS
//

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub default_symbols: Vec<String>,

    // Provider Endpoints
    pub bootstrap_url: String,
    pub api_url: String,
    pub market_referer: String,
    pub symbol_referer_template: String,

    // Browser Identity
    pub user_agent: String,
    pub accept_language: String,
    pub token_cookie: String,
    pub token_header: String,
    pub request_timeout_secs: u64,

    // Pagination
    pub page_size: usize,
    pub pages_per_session: usize,
    pub rate_limit_attempts: u32,
    pub page_delay_ms: u64,
    pub renewal_pause_ms: u64,

    // Result Limits
    pub market_result_cap: usize,
    pub symbol_result_cap: usize,
    pub min_oi_change: i64,

    // Snapshots
    pub snapshot_dir: String,
}

impl AppConfig {
    //
    // PUBLIC INTERFACE
    //

    pub fn load() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            // File & Env Overrides
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP"));

        Self::finish(builder)
    }

    /// Compiled defaults only, no file or environment.
    pub fn from_defaults() -> Result<Self, ConfigError> {
        Self::finish(Self::defaults()?)
    }

    pub fn get_provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            bootstrap_url: self.bootstrap_url.clone(),
            api_url: self.api_url.clone(),
            market_referer: self.market_referer.clone(),
            symbol_referer_template: self.symbol_referer_template.clone(),
            user_agent: self.user_agent.clone(),
            accept_language: self.accept_language.clone(),
            token_cookie: self.token_cookie.clone(),
            token_header: self.token_header.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn get_fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            page_size: self.page_size,
            rate_limit_attempts: self.rate_limit_attempts,
            page_delay: Duration::from_millis(self.page_delay_ms),
            renewal_pause: Duration::from_millis(self.renewal_pause_ms),
            // 0 disables proactive rotation
            pages_per_session: if self.pages_per_session > 0 { Some(self.pages_per_session) } else { None },
        }
    }

    //
    // INTERNAL HELPERS
    //

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;

        // A zero limit never yields a short page, so pagination would not stop
        if config.page_size == 0 {
            return Err(ConfigError::Message("page_size must be at least 1".to_string()));
        }
        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("log_level", "info")?
            .set_default("default_symbols", vec!["SPY"])?

            // Provider Endpoints
            .set_default("bootstrap_url", "https://www.barchart.com/options/open-interest-change")?
            .set_default("api_url", "https://www.barchart.com/proxies/core-api/v1/options/get")?
            .set_default("market_referer", "https://www.barchart.com/options/open-interest-change")?
            .set_default("symbol_referer_template", "https://www.barchart.com/stocks/quotes/{symbol}/options")?

            // Browser Identity
            .set_default(
                "user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )?
            .set_default("accept_language", "en-US,en;q=0.9")?
            .set_default("token_cookie", "XSRF-TOKEN")?
            .set_default("token_header", "X-XSRF-TOKEN")?
            .set_default("request_timeout_secs", 30)?

            // Pagination
            .set_default("page_size", 1000)?
            .set_default("pages_per_session", 10)?
            .set_default("rate_limit_attempts", 4)?
            .set_default("page_delay_ms", 300)?
            .set_default("renewal_pause_ms", 1500)?

            // Result Limits
            .set_default("market_result_cap", 9999)?
            .set_default("symbol_result_cap", 99999)?
            .set_default("min_oi_change", -9999)?

            // Snapshots
            .set_default("snapshot_dir", "./data/snapshots")
    }
}


//
// UNIT TESTS
//
