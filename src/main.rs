// @file: src/main.rs
// @description: Runs a market-wide OI scan (calls and puts in parallel) and per-symbol snapshot diffs.
// @author: LAS.

use log::{error, info, warn};
use oi_ingestion::analytics::{compare_snapshots, summarize, OiSummary};
use oi_ingestion::core::errors::FetchResult;
use oi_ingestion::core::models::{OptionClass, ResultTable};
use oi_ingestion::utils::config::AppConfig;
use oi_ingestion::utils::snapshot::SnapshotStore;
use oi_ingestion::OpenInterestService;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() {
    // 1. Environment and Configuration
    dotenv::dotenv().ok();
    let config: AppConfig = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return;
        }
    };

    // 2. Initialize Logger with the configured default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();

    info!(">>> Open Interest Ingestion is Starting... <<<");

    // 3. Market scan: calls and puts on separate sessions
    let calls: JoinHandle<FetchResult<ResultTable>> = spawn_market_scan(&config, OptionClass::Call);
    let puts: JoinHandle<FetchResult<ResultTable>> = spawn_market_scan(&config, OptionClass::Put);
    let (calls, puts) = tokio::join!(calls, puts);

    report_market("CALL", calls);
    report_market("PUT", puts);

    // 4. Per-symbol scans, one at a time
    let store: Option<SnapshotStore> = match SnapshotStore::new(&config.snapshot_dir) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Snapshots disabled: {}", e);
            None
        }
    };

    for symbol in config.default_symbols.clone() {
        let scan_config: AppConfig = config.clone();
        let scan_symbol: String = symbol.clone();
        let result = tokio::task::spawn_blocking(move || {
            OpenInterestService::from_config(&scan_config).fetch_symbol_open_interest(
                &scan_symbol,
                OptionClass::Both,
                scan_config.symbol_result_cap,
            )
        })
        .await;

        match result {
            Ok(Ok(table)) => process_symbol(&symbol, table, store.as_ref()),
            Ok(Err(e)) => error!("[{}] {}", symbol, e),
            Err(e) => error!("[{}] scan task failed: {}", symbol, e),
        }
    }

    info!(">>> Done. <<<");
}

//
// HELPERS
//

fn spawn_market_scan(config: &AppConfig, option_class: OptionClass) -> JoinHandle<FetchResult<ResultTable>> {
    let config: AppConfig = config.clone();
    tokio::task::spawn_blocking(move || {
        OpenInterestService::from_config(&config).fetch_market_top_changes(
            option_class,
            config.market_result_cap,
            config.min_oi_change,
        )
    })
}

fn report_market(label: &str, result: Result<FetchResult<ResultTable>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(table)) => {
            info!("[{}] {} contracts, net OI change {}", label, table.len(), table.net_oi_change());
            for row in table.iter().take(10) {
                info!(
                    "  {:<22} strike {:>9.2} exp {} OI {:>8} chg {:>+7} IV {:>6.2}",
                    row.contract, row.strike, row.expiration, row.open_interest, row.open_interest_change, row.implied_volatility
                );
            }
        }
        Ok(Err(e)) => error!("[{}] {}", label, e),
        Err(e) => error!("[{}] scan task failed: {}", label, e),
    }
}

fn process_symbol(symbol: &str, table: ResultTable, store: Option<&SnapshotStore>) {
    info!("[{}] {} contracts, total OI {}", symbol, table.len(), table.total_open_interest());

    let store: &SnapshotStore = match store {
        Some(store) => store,
        None => return,
    };

    // #1. Diff against the previous scan
    match store.load(symbol) {
        Ok(Some(previous)) => {
            let deltas = compare_snapshots(&table, &previous.table);
            let summary: OiSummary = summarize(&deltas);
            info!(
                "[{}] vs snapshot @{}: {} up, {} down, net {:+} (calls {:+}, puts {:+})",
                symbol,
                previous.captured_at,
                summary.increased,
                summary.reduced,
                summary.net_change,
                summary.calls_net,
                summary.puts_net
            );
        }
        Ok(None) => info!("[{}] No previous snapshot, skipping diff", symbol),
        Err(e) => warn!("[{}] Could not read snapshot: {}", symbol, e),
    }

    // #2. Persist for the next run
    if let Err(e) = store.save(symbol, &table) {
        warn!("[{}] Could not save snapshot: {}", symbol, e);
    }
}
