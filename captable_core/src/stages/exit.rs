//! Exit stage - distributes sale or IPO proceeds pro rata.
//!
//! The waterfall is intentionally flat: every row is paid price-per-share
//! times shares, with no liquidation-preference stacking, seniority, or
//! participation modeling. The cap table itself is untouched.

use serde::{Deserialize, Serialize};

use crate::fmt;
use crate::scenario::{Stage, StageParams};
use crate::state::{EngineState, WaterfallRow};
use crate::stages::{params_mismatch, sanitize};

/// How the company exits; anything that is not an IPO is treated as a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExitMode {
    MergerAcquisition,
    Ipo,
}

impl Default for ExitMode {
    fn default() -> Self {
        ExitMode::MergerAcquisition
    }
}

impl From<String> for ExitMode {
    fn from(mode: String) -> Self {
        if mode == "IPO" {
            ExitMode::Ipo
        } else {
            ExitMode::MergerAcquisition
        }
    }
}

impl From<ExitMode> for String {
    fn from(mode: ExitMode) -> Self {
        match mode {
            ExitMode::Ipo => "IPO".to_string(),
            ExitMode::MergerAcquisition => "M&A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExitParams {
    pub sale_price: f64,
    pub mode: ExitMode,
    pub ipo_price_per_share: f64,
}

/// Default exit: a $250M sale.
pub fn defaults() -> StageParams {
    StageParams::Exit(ExitParams {
        sale_price: 250_000_000.0,
        mode: ExitMode::MergerAcquisition,
        ipo_price_per_share: 0.0,
    })
}

pub fn simulate(stage: &Stage, prior: EngineState) -> EngineState {
    let params = match &stage.params {
        StageParams::Exit(params) => params,
        _ => return params_mismatch(stage, prior),
    };

    let mut state = prior;

    if state.total_shares == 0 {
        state
            .warnings
            .push("No shares outstanding at exit.".to_string());
        return state;
    }

    let sale_price = sanitize(params.sale_price);
    let price_per_share = match params.mode {
        ExitMode::Ipo => sanitize(params.ipo_price_per_share),
        ExitMode::MergerAcquisition => sale_price / state.total_shares as f64,
    };

    let waterfall: Vec<WaterfallRow> = state
        .cap_table
        .iter()
        .map(|row| WaterfallRow {
            stakeholder: row.label.clone(),
            shares: row.shares,
            payout: price_per_share * row.shares as f64,
        })
        .collect();

    state.exit_waterfall = Some(waterfall);
    state.math.push(match params.mode {
        ExitMode::Ipo => format!(
            "IPO reference price ${:.2} applied to {} shares.",
            price_per_share,
            fmt::shares(state.total_shares),
        ),
        ExitMode::MergerAcquisition => format!(
            "Exit sale {} -> implied price/share {}.",
            fmt::money(sale_price),
            fmt::price(price_per_share),
        ),
    });

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CapTableRow;
    use approx::assert_relative_eq;

    fn exit_stage(params: ExitParams) -> Stage {
        Stage::new("stage_exit", "Exit Event", StageParams::Exit(params))
    }

    fn seeded_state() -> EngineState {
        let mut state = EngineState::new();
        state.cap_table = vec![
            CapTableRow {
                id: "f1".to_string(),
                label: "Founder 1".to_string(),
                share_class: "Common".to_string(),
                shares: 6_000_000,
                percent: 0.6,
            },
            CapTableRow {
                id: "f2".to_string(),
                label: "Founder 2".to_string(),
                share_class: "Common".to_string(),
                shares: 4_000_000,
                percent: 0.4,
            },
        ];
        state.total_shares = 10_000_000;
        state
    }

    #[test]
    fn test_sale_distributes_pro_rata() {
        let state = simulate(
            &exit_stage(ExitParams {
                sale_price: 100_000_000.0,
                mode: ExitMode::MergerAcquisition,
                ipo_price_per_share: 0.0,
            }),
            seeded_state(),
        );

        let waterfall = state.exit_waterfall.as_ref().expect("waterfall present");
        assert_eq!(waterfall.len(), 2);
        assert_relative_eq!(waterfall[0].payout, 60_000_000.0, epsilon = 1e-6);
        assert_relative_eq!(waterfall[1].payout, 40_000_000.0, epsilon = 1e-6);
        // Cap table itself is untouched.
        assert_eq!(state.total_shares, 10_000_000);
    }

    #[test]
    fn test_ipo_uses_reference_price() {
        let state = simulate(
            &exit_stage(ExitParams {
                sale_price: 0.0,
                mode: ExitMode::Ipo,
                ipo_price_per_share: 12.0,
            }),
            seeded_state(),
        );

        let waterfall = state.exit_waterfall.as_ref().expect("waterfall present");
        assert_relative_eq!(waterfall[0].payout, 72_000_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_shares_warns_without_waterfall() {
        let state = simulate(
            &exit_stage(ExitParams {
                sale_price: 100_000_000.0,
                mode: ExitMode::MergerAcquisition,
                ipo_price_per_share: 0.0,
            }),
            EngineState::new(),
        );

        assert!(state.exit_waterfall.is_none());
        assert!(state
            .warnings
            .iter()
            .any(|warning| warning.contains("No shares outstanding")));
    }

    #[test]
    fn test_unrecognized_mode_string_falls_back_to_sale() {
        assert_eq!(ExitMode::from("TENDER".to_string()), ExitMode::MergerAcquisition);
        assert_eq!(ExitMode::from("IPO".to_string()), ExitMode::Ipo);
    }
}
