// @file: src/tests/orchestration.rs
// @description: Entry-point tests: market vs symbol scope, filters, labels, boundary errors and concurrent calls.
// @author: LAS.

#[cfg(test)]
mod orchestration_tests {
    use crate::connectors::open_interest::OpenInterestService;
    use crate::core::errors::FetchError;
    use crate::core::models::{ContractKind, OptionClass};
    use crate::tests::mock_provider::{page_body, policy_with_page_size, settings, RecordingSleeper, ScriptedProvider};

    //
    // CONSTANTS
    //

    const MARKET_REFERER: &str = "https://provider.test/options/open-interest-change";

    //
    // MARKET SCOPE
    //

    #[test]
    fn test_market_scan_applies_threshold_and_never_rotates() {
        let provider = ScriptedProvider::new();
        let sleeper = RecordingSleeper::new();
        for page in 0..3 {
            provider.push(200, page_body("AAPL", page * 4, 4, None));
        }
        provider.push(200, page_body("AAPL", 12, 2, None));

        let mut policy = policy_with_page_size(4);
        policy.pages_per_session = Some(1);
        let service = OpenInterestService::new(settings(), policy, provider.clone(), sleeper.clone());

        let table = service.fetch_market_top_changes(OptionClass::Call, 9999, 100).unwrap();

        assert_eq!(provider.sessions_created(), 1);
        assert_eq!(provider.request_count(), 4);
        assert!(table.iter().all(|r| r.open_interest_change >= 100));
        assert!(table.iter().all(|r| r.kind.is_none()));
        assert!(!table.is_empty());

        let request = &provider.requests()[0].request;
        assert_eq!(request.query_value("baseSymbol"), None);
        assert_eq!(request.query_value("optionType"), Some("call"));
        assert_eq!(request.query_value("hasOptions"), Some("true"));
        assert_eq!(request.header_value("Referer"), Some(MARKET_REFERER));
        assert!(request.query_value("fields").unwrap().contains("percentChange"));
    }

    #[test]
    fn test_market_threshold_is_inclusive() {
        let provider = ScriptedProvider::new();
        let record = |symbol: &str, change: i64| {
            serde_json::json!({"raw": {"symbol": symbol, "baseSymbol": "AAPL", "openInterestChange": change}})
        };
        provider.push(200, serde_json::json!({
            "count": 3,
            "total": 3,
            "data": [
                record("AAPL260320C00200000", 99),
                record("AAPL260320C00210000", 100),
                record("AAPL260320C00220000", 101),
            ]
        }));

        let service = OpenInterestService::new(settings(), policy_with_page_size(10), provider.clone(), RecordingSleeper::new());
        let table = service.fetch_market_top_changes(OptionClass::Call, 9999, 100).unwrap();

        let changes: Vec<i64> = table.iter().map(|r| r.open_interest_change).collect();
        assert_eq!(changes, vec![101, 100]);
    }

    #[test]
    fn test_market_scan_without_threshold_keeps_negative_changes() {
        let provider = ScriptedProvider::new();
        let sleeper = RecordingSleeper::new();
        provider.push(200, page_body("TSLA", 0, 6, Some(6)));

        let service = OpenInterestService::new(settings(), policy_with_page_size(10), provider.clone(), sleeper);
        let table = service.fetch_market_top_changes(OptionClass::Put, 9999, -9999).unwrap();

        assert_eq!(table.len(), 6);
        assert!(table.iter().any(|r| r.open_interest_change < 0));
        assert_eq!(provider.requests()[0].request.query_value("optionType"), Some("put"));
    }

    #[test]
    fn test_market_blocked_on_first_page() {
        let provider = ScriptedProvider::new();
        provider.push_status(403);

        let service = OpenInterestService::new(settings(), policy_with_page_size(10), provider.clone(), RecordingSleeper::new());
        let result = service.fetch_market_top_changes(OptionClass::Call, 9999, 0);

        assert!(matches!(result, Err(FetchError::Blocked)));
    }

    //
    // SYMBOL SCOPE
    //

    #[test]
    fn test_both_classes_label_each_contract() {
        let provider = ScriptedProvider::new();
        provider.push(200, page_body("SPY", 0, 4, Some(4)));

        let service = OpenInterestService::new(settings(), policy_with_page_size(10), provider.clone(), RecordingSleeper::new());
        let table = service.fetch_symbol_open_interest("SPY", OptionClass::Both, 100).unwrap();

        let calls: usize = table.iter().filter(|r| r.kind == Some(ContractKind::Call)).count();
        let puts: usize = table.iter().filter(|r| r.kind == Some(ContractKind::Put)).count();
        assert_eq!((calls, puts), (2, 2));
        assert_eq!(provider.requests()[0].request.query_value("optionType"), None);
    }

    #[test]
    fn test_malformed_body_is_wrapped_at_boundary() {
        let provider = ScriptedProvider::new();
        provider.push(200, page_body("SPY", 0, 2, None)).push_raw(200, "<html>captcha</html>");

        let service = OpenInterestService::new(settings(), policy_with_page_size(2), provider.clone(), RecordingSleeper::new());
        let result = service.fetch_symbol_open_interest("spy", OptionClass::Call, 100);

        match result {
            Err(FetchError::Unexpected { context, message }) => {
                assert_eq!(context, "SPY");
                assert!(!message.is_empty());
            }
            other => panic!("expected wrapped error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_inputs_are_rejected_before_any_request() {
        let provider = ScriptedProvider::new();
        let service = OpenInterestService::new(settings(), policy_with_page_size(2), provider.clone(), RecordingSleeper::new());

        assert!(matches!(
            service.fetch_symbol_open_interest("  ", OptionClass::Call, 100),
            Err(FetchError::InvalidInput(_))
        ));
        assert!(matches!(
            service.fetch_market_top_changes(OptionClass::Call, 0, 0),
            Err(FetchError::InvalidInput(_))
        ));
        assert_eq!(provider.sessions_created(), 0);
    }

    //
    // CONCURRENT CALLERS
    //

    #[tokio::test]
    async fn test_calls_and_puts_run_concurrently_on_separate_sessions() {
        let calls_provider = ScriptedProvider::new();
        calls_provider.push(200, page_body("SPY", 0, 3, Some(3)));
        let puts_provider = ScriptedProvider::new();
        puts_provider.push(200, page_body("SPY", 100, 5, Some(5)));

        let calls_service = OpenInterestService::new(settings(), policy_with_page_size(10), calls_provider.clone(), RecordingSleeper::new());
        let puts_service = OpenInterestService::new(settings(), policy_with_page_size(10), puts_provider.clone(), RecordingSleeper::new());

        let calls = tokio::task::spawn_blocking(move || calls_service.fetch_market_top_changes(OptionClass::Call, 9999, 0));
        let puts = tokio::task::spawn_blocking(move || puts_service.fetch_market_top_changes(OptionClass::Put, 9999, 0));

        let (calls, puts) = tokio::join!(calls, puts);

        assert_eq!(calls.unwrap().unwrap().len(), 3);
        assert_eq!(puts.unwrap().unwrap().len(), 5);
        assert_eq!(calls_provider.sessions_created(), 1);
        assert_eq!(puts_provider.sessions_created(), 1);
    }
}
