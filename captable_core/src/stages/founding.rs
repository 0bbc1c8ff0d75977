//! Founding stage - incorporates the company and seeds the cap table.
//!
//! Founding resets the aggregate entirely. Invoked anywhere but the start
//! of a timeline it still resets (re-incorporation semantics) and raises a
//! loud warning so the discarded history is visible.

use serde::{Deserialize, Serialize};

use crate::fmt;
use crate::scenario::{Stage, StageParams};
use crate::state::{CapTableRow, EngineState, OPTION_POOL_CLASS};
use crate::stages::{clamp_percent, params_mismatch, round_shares, sanitize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FoundingParams {
    pub company_name: String,
    pub total_authorized_shares: f64,
    /// Target ESOP ownership after founding, clamped to [0, 0.9]
    pub esop_percent: f64,
    pub founders: Vec<FounderAllocation>,
}

impl Default for FoundingParams {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            total_authorized_shares: 0.0,
            esop_percent: 0.1,
            founders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FounderAllocation {
    pub id: String,
    pub name: String,
    pub shares: f64,
}

/// Default founding parameters: two founders on a 2:1 split with a 10%
/// option-pool target.
pub fn defaults() -> StageParams {
    StageParams::Founding(FoundingParams {
        company_name: "NewCo".to_string(),
        total_authorized_shares: 10_000_000.0,
        esop_percent: 0.1,
        founders: vec![
            FounderAllocation {
                id: String::new(),
                name: "Founder 1".to_string(),
                shares: 6_000_000.0,
            },
            FounderAllocation {
                id: String::new(),
                name: "Founder 2".to_string(),
                shares: 3_000_000.0,
            },
        ],
    })
}

pub fn simulate(stage: &Stage, prior: EngineState) -> EngineState {
    let params = match &stage.params {
        StageParams::Founding(params) => params,
        _ => return params_mismatch(stage, prior),
    };

    let mut state = EngineState::new();

    if !prior.cap_table.is_empty() || !prior.instruments.is_empty() {
        state.warnings.push(format!(
            "Founding stage '{}' re-invoked mid-timeline; the prior cap table and outstanding instruments were discarded.",
            stage.name
        ));
    }

    let founders = resolve_founders(&params.founders, &stage.id);
    let total_explicit: u64 = founders.iter().map(|founder| founder.shares).sum();

    let esop_percent = clamp_percent(params.esop_percent, 0.9);
    let esop_shares = if esop_percent > 0.0 {
        round_shares(total_explicit as f64 * esop_percent / (1.0 - esop_percent))
    } else {
        0
    };
    let total_shares = total_explicit + esop_shares;

    state.cap_table = founders
        .into_iter()
        .map(|founder| CapTableRow {
            id: founder.id,
            label: founder.name,
            share_class: "Common".to_string(),
            shares: founder.shares,
            percent: ownership(founder.shares, total_shares),
        })
        .collect();

    if esop_shares > 0 {
        state.cap_table.push(CapTableRow {
            id: format!("{}:esop", stage.id),
            label: "ESOP".to_string(),
            share_class: OPTION_POOL_CLASS.to_string(),
            shares: esop_shares,
            percent: ownership(esop_shares, total_shares),
        });
    }

    state.total_shares = total_shares;
    state.math = vec![
        format!("Founders receive {} shares.", fmt::shares(total_explicit)),
        if esop_shares > 0 {
            format!(
                "ESOP sized to {} -> {} shares.",
                fmt::percent(esop_percent, 1),
                fmt::shares(esop_shares)
            )
        } else {
            "No ESOP target specified; pool remains empty.".to_string()
        },
        format!("Total outstanding shares: {}.", fmt::shares(total_shares)),
    ];

    if total_shares == 0 {
        state
            .warnings
            .push("Founding stage has zero shares configured.".to_string());
    }

    state
}

struct ResolvedFounder {
    id: String,
    name: String,
    shares: u64,
}

/// A missing or empty founder list falls back to the stock 2:1 allocation;
/// explicit entries are sanitized and negative share counts dropped.
fn resolve_founders(input: &[FounderAllocation], stage_id: &str) -> Vec<ResolvedFounder> {
    if input.is_empty() {
        return vec![
            ResolvedFounder {
                id: format!("{stage_id}:founder:1"),
                name: "Founder 1".to_string(),
                shares: 6_000_000,
            },
            ResolvedFounder {
                id: format!("{stage_id}:founder:2"),
                name: "Founder 2".to_string(),
                shares: 3_000_000,
            },
        ];
    }

    input
        .iter()
        .enumerate()
        .filter(|(_, founder)| sanitize(founder.shares) >= 0.0)
        .map(|(index, founder)| ResolvedFounder {
            id: if founder.id.is_empty() {
                format!("{stage_id}:founder:{}", index + 1)
            } else {
                founder.id.clone()
            },
            name: if founder.name.is_empty() {
                "Founder".to_string()
            } else {
                founder.name.clone()
            },
            shares: round_shares(sanitize(founder.shares)),
        })
        .collect()
}

fn ownership(shares: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        shares as f64 / total as f64
    }
}
