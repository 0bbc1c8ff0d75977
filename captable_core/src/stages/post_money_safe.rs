//! Post-money SAFE stage - records an ownership-target SAFE.
//!
//! The target percent is fixed at issuance (`investment / post-money
//! valuation`); the next priced round sizes shares against the share base
//! accumulated at conversion time.

use serde::{Deserialize, Serialize};

use crate::fmt;
use crate::scenario::{Stage, StageParams};
use crate::state::{EngineState, LedgerDetail, LedgerEntry, PostMoneySafeInstrument};
use crate::stages::{holder_identity, params_mismatch, sanitize, SpecialRights};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostMoneySafeParams {
    pub investor_name: String,
    pub investment: f64,
    pub post_money_valuation: f64,
    pub holder_id: String,
    pub special_rights: SpecialRights,
}

/// Default SAFE: $250k at an $8M post-money valuation.
pub fn defaults() -> StageParams {
    StageParams::PostMoneySafe(PostMoneySafeParams {
        investor_name: "SAFE Investor".to_string(),
        investment: 250_000.0,
        post_money_valuation: 8_000_000.0,
        holder_id: String::new(),
        special_rights: SpecialRights::default(),
    })
}

pub fn simulate(stage: &Stage, prior: EngineState) -> EngineState {
    let params = match &stage.params {
        StageParams::PostMoneySafe(params) => params,
        _ => return params_mismatch(stage, prior),
    };

    let mut state = prior;

    let investment = sanitize(params.investment);
    let post_money_valuation = sanitize(params.post_money_valuation);
    let target_percent = if post_money_valuation > 0.0 {
        investment / post_money_valuation
    } else {
        0.0
    };

    let holder_name = if params.investor_name.is_empty() {
        "SAFE Investor".to_string()
    } else {
        params.investor_name.clone()
    };

    state.instruments.post_safes.push(PostMoneySafeInstrument {
        id: format!("{}:safe", stage.id),
        stage_id: stage.id.clone(),
        holder_id: holder_identity(&params.holder_id, &stage.id, "holder"),
        holder_name: holder_name.clone(),
        investment,
        post_money_valuation,
        target_percent,
        special_rights: params.special_rights.normalized(),
    });

    state.math.push(format!(
        "Logged post-money SAFE {} targeting {} ownership at {} valuation.",
        fmt::money(investment),
        fmt::percent(target_percent, 2),
        fmt::money(post_money_valuation),
    ));

    state.ledger_entries.push(LedgerEntry {
        stage_id: stage.id.clone(),
        detail: LedgerDetail::SafePostMoney {
            investor: holder_name,
            investment,
            target_percent,
        },
    });

    state
}
