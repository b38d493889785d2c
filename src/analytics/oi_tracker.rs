// @file: src/analytics/oi_tracker.rs
// @description: Compares open interest between consecutive scans and classifies accumulation/reduction.
// @author: LAS.

use std::collections::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::connectors::barchart::decode_contract_kind;
use crate::core::models::{ContractKind, OptionRow, ResultTable};

//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OiSignal {
    StrongAccumulation,
    ModerateAccumulation,
    MildAccumulation,
    SlightIncrease,
    Unchanged,
    SlightDecrease,
    MildReduction,
    ModerateReduction,
    StrongReduction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OiDelta {
    pub contract: String,
    pub underlying: String,
    pub strike: f64,
    pub expiration: String,
    pub kind: ContractKind,
    pub previous_oi: i64,
    pub current_oi: i64,
    pub change: i64,
    pub change_pct: f64,
    pub volume: i64,
    pub implied_volatility: f64,
    pub signal: OiSignal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractMove {
    pub contract: String,
    pub strike: f64,
    pub kind: ContractKind,
    pub expiration: String,
    pub change: i64,
    pub current_oi: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OiSummary {
    pub total_contracts: usize,
    pub increased: usize,
    pub reduced: usize,
    pub unchanged: usize,
    pub largest_increase: Option<ContractMove>,
    pub largest_reduction: Option<ContractMove>,
    pub net_change: i64,
    pub calls_net: i64,
    pub puts_net: i64,
}

#[derive(Debug, Clone)]
pub struct DeltaFilter {
    pub kind: Option<ContractKind>,
    pub only_changes: bool,
    pub min_current_oi: i64,
    pub signal: Option<OiSignal>,
}

impl Default for DeltaFilter {
    fn default() -> Self {
        Self { kind: None, only_changes: true, min_current_oi: 0, signal: None }
    }
}

//
// PUBLIC INTERFACE
//

/// Outer join of two scans keyed by contract symbol.
pub fn compare_snapshots(current: &ResultTable, previous: &ResultTable) -> Vec<OiDelta> {
    if current.is_empty() || previous.is_empty() {
        return Vec::new();
    }

    // #1. Index the previous scan
    let previous_by_contract: HashMap<&str, &OptionRow> =
        previous.iter().map(|row| (row.contract.as_str(), row)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());

    // #2. Contracts present now, then contracts that disappeared
    let mut deltas: Vec<OiDelta> = Vec::with_capacity(current.len());
    for row in current.iter() {
        seen.insert(row.contract.as_str());
        let previous_oi: i64 = previous_by_contract
            .get(row.contract.as_str())
            .map(|prev| prev.open_interest)
            .unwrap_or(0);
        deltas.push(build_delta(row, previous_oi, row.open_interest, row.volume));
    }
    for row in previous.iter() {
        if !seen.contains(row.contract.as_str()) {
            deltas.push(build_delta(row, row.open_interest, 0, 0));
        }
    }

    // #3. Drop dead contracts, biggest moves first
    deltas.retain(|d| d.change != 0 || d.current_oi > 0);
    deltas.sort_by(|a, b| b.change.abs().cmp(&a.change.abs()));
    deltas
}

pub fn classify_signal(change: i64, previous_oi: i64) -> OiSignal {
    if change == 0 {
        return OiSignal::Unchanged;
    }

    // New contracts count as a full move.
    let pct: f64 = if previous_oi > 0 {
        change.abs() as f64 / previous_oi as f64 * 100.0
    } else {
        100.0
    };

    match (change > 0, pct) {
        (true, p) if p >= 50.0 => OiSignal::StrongAccumulation,
        (true, p) if p >= 20.0 => OiSignal::ModerateAccumulation,
        (true, p) if p >= 5.0 => OiSignal::MildAccumulation,
        (true, _) => OiSignal::SlightIncrease,
        (false, p) if p >= 50.0 => OiSignal::StrongReduction,
        (false, p) if p >= 20.0 => OiSignal::ModerateReduction,
        (false, p) if p >= 5.0 => OiSignal::MildReduction,
        (false, _) => OiSignal::SlightDecrease,
    }
}

pub fn summarize(deltas: &[OiDelta]) -> OiSummary {
    let mut summary: OiSummary = OiSummary { total_contracts: deltas.len(), ..Default::default() };

    for delta in deltas {
        match delta.change {
            c if c > 0 => summary.increased += 1,
            c if c < 0 => summary.reduced += 1,
            _ => summary.unchanged += 1,
        }

        summary.net_change += delta.change;
        match delta.kind {
            ContractKind::Call => summary.calls_net += delta.change,
            ContractKind::Put => summary.puts_net += delta.change,
            ContractKind::Unknown => {}
        }
    }

    summary.largest_increase = deltas
        .iter()
        .filter(|d| d.change > 0)
        .max_by_key(|d| d.change)
        .map(to_move);
    summary.largest_reduction = deltas
        .iter()
        .filter(|d| d.change < 0)
        .min_by_key(|d| d.change)
        .map(to_move);

    summary
}

pub fn filter_deltas(deltas: &[OiDelta], filter: &DeltaFilter) -> Vec<OiDelta> {
    deltas
        .iter()
        .filter(|d| filter.kind.map_or(true, |k| d.kind == k))
        .filter(|d| !filter.only_changes || d.change != 0)
        .filter(|d| filter.min_current_oi <= 0 || d.current_oi >= filter.min_current_oi)
        .filter(|d| filter.signal.map_or(true, |s| d.signal == s))
        .cloned()
        .collect()
}

//
// INTERNAL HELPERS
//

fn build_delta(row: &OptionRow, previous_oi: i64, current_oi: i64, volume: i64) -> OiDelta {
    let change: i64 = current_oi - previous_oi;
    let change_pct: f64 = if previous_oi > 0 {
        (change as f64 / previous_oi as f64 * 10_000.0).round() / 100.0
    } else if current_oi > 0 {
        100.0
    } else {
        0.0
    };

    OiDelta {
        contract: row.contract.clone(),
        underlying: row.underlying.clone(),
        strike: row.strike,
        expiration: row.expiration.clone(),
        kind: row.kind.unwrap_or_else(|| decode_contract_kind(&row.contract, &row.underlying)),
        previous_oi,
        current_oi,
        change,
        change_pct,
        volume,
        implied_volatility: row.implied_volatility,
        signal: classify_signal(change, previous_oi),
    }
}

fn to_move(delta: &OiDelta) -> ContractMove {
    ContractMove {
        contract: delta.contract.clone(),
        strike: delta.strike,
        kind: delta.kind,
        expiration: delta.expiration.clone(),
        change: delta.change,
        current_oi: delta.current_oi,
    }
}


//
// UNIT TESTS
//
