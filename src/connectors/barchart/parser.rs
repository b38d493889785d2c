// @file: src/connectors/barchart/parser.rs
// @description: Maps raw options-API JSON pages into uniform OptionRow records.
// @author: LAS.

use serde_json::{Map, Value};
use crate::core::errors::{FetchError, FetchResult};
use crate::core::models::{ContractKind, OptionRow, PageResult};

//
// PUBLIC INTERFACE
//

pub fn parse_page(payload: &Value, label_contracts: bool) -> FetchResult<PageResult> {
    // #1. Envelope
    let envelope: &Map<String, Value> = payload
        .as_object()
        .ok_or_else(|| FetchError::MalformedPayload("expected a JSON object".to_string()))?;

    let total_available: Option<u64> = envelope.get("total").and_then(as_count);
    let reported_count: Option<u64> = envelope.get("count").and_then(as_count);

    // #2. A missing or empty `data` field is simply an empty page
    let items: &Vec<Value> = match envelope.get("data") {
        Some(Value::Array(items)) => items,
        None => return Ok(PageResult { rows: Vec::new(), reported_count, total_available }),
        Some(other) if is_blank(other) => return Ok(PageResult { rows: Vec::new(), reported_count, total_available }),
        Some(other) => {
            return Err(FetchError::MalformedPayload(format!(
                "`data` should be an array, got {}",
                kind_of(other)
            )))
        }
    };

    // #3. Map records
    let mut rows: Vec<OptionRow> = Vec::with_capacity(items.len());
    for item in items {
        rows.push(parse_record(item, label_contracts)?);
    }

    Ok(PageResult { rows, reported_count, total_available })
}

pub fn parse_record(item: &Value, label_contracts: bool) -> FetchResult<OptionRow> {
    // Some responses double-wrap the values under `raw`.
    let record: &Map<String, Value> = item
        .get("raw")
        .and_then(Value::as_object)
        .or_else(|| item.as_object())
        .ok_or_else(|| FetchError::MalformedPayload(format!("record should be an object, got {}", kind_of(item))))?;

    let contract: String = text(record, "symbol");
    let underlying: String = text(record, "baseSymbol");

    let kind: Option<ContractKind> = if label_contracts {
        Some(decode_contract_kind(&contract, &underlying))
    } else {
        None
    };

    Ok(OptionRow {
        strike: number(record, "strikePrice"),
        expiration: text(record, "expirationDate"),
        days_to_expiration: integer(record, "daysToExpiration"),
        last_price: number(record, "lastPrice"),
        volume: integer(record, "volume"),
        open_interest: integer(record, "openInterest"),
        open_interest_change: integer(record, "openInterestChange"),
        implied_volatility: round_to(number(record, "volatility"), 2),
        delta: round_to(number(record, "delta"), 4),
        kind,
        contract,
        underlying,
    })
}

/// `null`, `false`, `0`, `""` and `{}` all mean "no rows".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
    }
}

/// OCC layout: ROOT + YYMMDD + C/P + strike*1000 (8 digits).
pub fn decode_contract_kind(contract: &str, underlying: &str) -> ContractKind {
    let skip: usize = underlying.chars().count();
    match contract.chars().skip(skip).nth(6) {
        Some('C') => ContractKind::Call,
        Some(_) => ContractKind::Put,
        None => ContractKind::Unknown,
    }
}

//
// INTERNAL HELPERS
//

fn number(record: &Map<String, Value>, key: &str) -> f64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn integer(record: &Map<String, Value>, key: &str) -> i64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        _ => number(record, key) as i64,
    }
}

fn text(record: &Map<String, Value>, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor: f64 = 10f64.powi(places);
    (value * factor).round() / factor
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


//
// UNIT TESTS
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_or_missing_data_is_an_empty_page() {
        let page = parse_page(&json!({"data": []}), false).unwrap();
        assert!(page.is_empty());

        let page = parse_page(&json!({"count": 0}), false).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.reported_count, Some(0));

        let page = parse_page(&json!({"data": null, "total": 12}), false).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_available, Some(12));

        for blank in [json!({}), json!(""), json!(false), json!(0)] {
            let page = parse_page(&json!({"data": blank, "total": 3}), false).unwrap();
            assert!(page.is_empty());
            assert_eq!(page.total_available, Some(3));
        }
    }

    #[test]
    fn test_non_empty_non_array_data_is_malformed() {
        for bad in [json!({"symbol": "SPY"}), json!("rows"), json!(true), json!(7)] {
            let result = parse_page(&json!({"data": bad}), false);
            assert!(matches!(result, Err(FetchError::MalformedPayload(_))));
        }
    }

    #[test]
    fn test_null_open_interest_maps_to_zero() {
        let payload = json!({
            "count": 1,
            "total": 1,
            "data": [{
                "symbol": "SPY260213C00600000",
                "baseSymbol": "SPY",
                "strikePrice": 600,
                "expirationDate": "2026-02-13",
                "daysToExpiration": 30,
                "lastPrice": 4.25,
                "volume": null,
                "openInterest": null,
                "openInterestChange": 1500,
                "volatility": 18.456,
                "delta": 0.512345
            }]
        });

        let page = parse_page(&payload, false).unwrap();
        let row = &page.rows[0];

        assert_eq!(row.open_interest, 0);
        assert_eq!(row.volume, 0);
        assert_eq!(row.open_interest_change, 1500);
        assert_eq!(row.strike, 600.0);
        assert_eq!(row.implied_volatility, 18.46);
        assert_eq!(row.delta, 0.5123);
        assert_eq!(row.kind, None);
        assert_eq!(page.total_available, Some(1));
    }

    #[test]
    fn test_raw_subobject_takes_precedence() {
        let payload = json!({
            "data": [{
                "symbol": "SPY260213P00590000",
                "openInterest": "12,345",
                "raw": {
                    "symbol": "SPY260213P00590000",
                    "baseSymbol": "SPY",
                    "openInterest": 12345,
                    "openInterestChange": -250,
                    "volume": "1,020"
                }
            }]
        });

        let page = parse_page(&payload, true).unwrap();
        let row = &page.rows[0];

        assert_eq!(row.open_interest, 12345);
        assert_eq!(row.open_interest_change, -250);
        assert_eq!(row.volume, 1020);
        assert_eq!(row.kind, Some(ContractKind::Put));
        assert_eq!(row.expiration, "");
    }

    #[test]
    fn test_decode_contract_kind() {
        assert_eq!(decode_contract_kind("SPY260213C00600000", "SPY"), ContractKind::Call);
        assert_eq!(decode_contract_kind("SPY260213P00600000", "SPY"), ContractKind::Put);
        assert_eq!(decode_contract_kind("SPY260213", "SPY"), ContractKind::Unknown);
        assert_eq!(decode_contract_kind("SPY2602", "SPY"), ContractKind::Unknown);
    }

    #[test]
    fn test_malformed_payloads_are_errors() {
        assert!(matches!(parse_page(&json!([1, 2]), false), Err(FetchError::MalformedPayload(_))));
        assert!(matches!(parse_page(&json!({"data": "oops"}), false), Err(FetchError::MalformedPayload(_))));
        assert!(matches!(parse_page(&json!({"data": [42]}), false), Err(FetchError::MalformedPayload(_))));
    }
}
