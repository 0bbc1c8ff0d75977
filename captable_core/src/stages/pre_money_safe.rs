//! Pre-money SAFE stage - records a cap/discount SAFE for later conversion.

use serde::{Deserialize, Serialize};

use crate::fmt;
use crate::scenario::{Stage, StageParams};
use crate::state::{EngineState, LedgerDetail, LedgerEntry, PreMoneySafeInstrument};
use crate::stages::{clamp_percent, holder_identity, params_mismatch, sanitize, SpecialRights};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreMoneySafeParams {
    pub investor_name: String,
    pub investment: f64,
    /// Conversion discount, clamped to [0, 0.8]
    pub discount: f64,
    pub valuation_cap: f64,
    pub holder_id: String,
    pub special_rights: SpecialRights,
}

/// Default SAFE: $200k at a 20% discount with a $6M cap.
pub fn defaults() -> StageParams {
    StageParams::PreMoneySafe(PreMoneySafeParams {
        investor_name: "SAFE Investor".to_string(),
        investment: 200_000.0,
        discount: 0.2,
        valuation_cap: 6_000_000.0,
        holder_id: String::new(),
        special_rights: SpecialRights::default(),
    })
}

pub fn simulate(stage: &Stage, prior: EngineState) -> EngineState {
    let params = match &stage.params {
        StageParams::PreMoneySafe(params) => params,
        _ => return params_mismatch(stage, prior),
    };

    let mut state = prior;

    let investment = sanitize(params.investment);
    let discount = clamp_percent(params.discount, 0.8);
    let valuation_cap = sanitize(params.valuation_cap);

    let holder_name = if params.investor_name.is_empty() {
        "SAFE Investor".to_string()
    } else {
        params.investor_name.clone()
    };

    state.instruments.pre_safes.push(PreMoneySafeInstrument {
        id: format!("{}:safe", stage.id),
        stage_id: stage.id.clone(),
        holder_id: holder_identity(&params.holder_id, &stage.id, "holder"),
        holder_name: holder_name.clone(),
        investment,
        discount,
        valuation_cap,
        special_rights: params.special_rights.normalized(),
    });

    state.math.push(format!(
        "Logged pre-money SAFE {} with {} discount and {} valuation cap.",
        fmt::money(investment),
        fmt::percent(discount, 1),
        fmt::money(valuation_cap),
    ));

    state.ledger_entries.push(LedgerEntry {
        stage_id: stage.id.clone(),
        detail: LedgerDetail::SafePreMoney {
            investor: holder_name,
            investment,
            discount,
            valuation_cap,
        },
    });

    state
}
