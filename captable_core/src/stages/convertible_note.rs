//! Convertible note stage - records interest-accruing debt for later
//! conversion. The cap table is untouched; only the instrument ledger grows.

use serde::{Deserialize, Serialize};

use crate::fmt;
use crate::scenario::{Stage, StageParams};
use crate::state::{EngineState, LedgerDetail, LedgerEntry, NoteInstrument};
use crate::stages::{clamp_percent, holder_identity, params_mismatch, sanitize, SpecialRights};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertibleNoteParams {
    pub investor_name: String,
    pub principal: f64,
    /// Simple annual interest rate, clamped to [0, 0.9]
    pub interest_rate: f64,
    pub accrual_years: f64,
    pub valuation_cap: f64,
    pub discount: f64,
    pub holder_id: String,
    pub special_rights: SpecialRights,
}

/// Default note: $250k angel bridge at 5% over one year with a $6M cap and
/// 20% discount.
pub fn defaults() -> StageParams {
    StageParams::ConvertibleNote(ConvertibleNoteParams {
        investor_name: "Angel Investor".to_string(),
        principal: 250_000.0,
        interest_rate: 0.05,
        accrual_years: 1.0,
        valuation_cap: 6_000_000.0,
        discount: 0.2,
        holder_id: String::new(),
        special_rights: SpecialRights::default(),
    })
}

pub fn simulate(stage: &Stage, prior: EngineState) -> EngineState {
    let params = match &stage.params {
        StageParams::ConvertibleNote(params) => params,
        _ => return params_mismatch(stage, prior),
    };

    let mut state = prior;

    let principal = sanitize(params.principal);
    let rate = clamp_percent(params.interest_rate, 0.9);
    let years = sanitize(params.accrual_years);
    // Display only; the priced round recomputes the identical figure at
    // conversion time.
    let accrued_interest = principal * rate * years;

    let holder_name = if params.investor_name.is_empty() {
        "Note Investor".to_string()
    } else {
        params.investor_name.clone()
    };

    state.instruments.notes.push(NoteInstrument {
        id: format!("{}:note", stage.id),
        stage_id: stage.id.clone(),
        holder_id: holder_identity(&params.holder_id, &stage.id, "holder"),
        holder_name: holder_name.clone(),
        principal,
        interest_rate: rate,
        accrual_years: years,
        valuation_cap: sanitize(params.valuation_cap),
        discount: clamp_percent(params.discount, 0.9),
        special_rights: params.special_rights.normalized(),
    });

    state.math.push(format!(
        "Recorded convertible note {} @ {} over {:.2} years. Accrued simple interest {} (deferred until conversion).",
        fmt::money(principal),
        fmt::percent(rate, 1),
        years,
        fmt::money(accrued_interest),
    ));

    state.ledger_entries.push(LedgerEntry {
        stage_id: stage.id.clone(),
        detail: LedgerDetail::NoteIssued {
            investor: holder_name,
            principal,
            interest_rate: rate,
            accrual_years: years,
        },
    });

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::SuperProRataConfig;

    fn note_stage(params: ConvertibleNoteParams) -> Stage {
        Stage::new(
            "stage_note",
            "Convertible Note",
            StageParams::ConvertibleNote(params),
        )
    }

    fn seeded_state() -> EngineState {
        let mut state = EngineState::new();
        state.total_shares = 10_000_000;
        state
    }

    #[test]
    fn test_note_is_deferred_not_issued() {
        let stage = note_stage(ConvertibleNoteParams {
            investor_name: "Angel".to_string(),
            principal: 250_000.0,
            interest_rate: 0.05,
            accrual_years: 1.0,
            valuation_cap: 6_000_000.0,
            discount: 0.2,
            ..ConvertibleNoteParams::default()
        });
        let state = simulate(&stage, seeded_state());

        assert!(state.cap_table.is_empty());
        assert_eq!(state.total_shares, 10_000_000);
        assert_eq!(state.instruments.notes.len(), 1);

        let note = &state.instruments.notes[0];
        assert_eq!(note.holder_name, "Angel");
        assert!((note.amount_owed() - 262_500.0).abs() < 1e-9);
        assert!(state.math[0].contains("$12,500"));
    }

    #[test]
    fn test_rate_clamped_and_rights_normalized() {
        let stage = note_stage(ConvertibleNoteParams {
            interest_rate: 2.5,
            principal: 100_000.0,
            special_rights: SpecialRights {
                super_pro_rata: SuperProRataConfig {
                    enabled: true,
                    rounds: 2.0,
                    amount: 250_000.0,
                },
            },
            ..ConvertibleNoteParams::default()
        });
        let state = simulate(&stage, seeded_state());

        let note = &state.instruments.notes[0];
        assert_eq!(note.interest_rate, 0.9);
        assert!(note.special_rights.enabled);
        assert_eq!(note.special_rights.rounds_remaining, 2);
    }

    #[test]
    fn test_ledger_entry_recorded() {
        let stage = note_stage(ConvertibleNoteParams {
            principal: 250_000.0,
            ..ConvertibleNoteParams::default()
        });
        let state = simulate(&stage, seeded_state());

        assert_eq!(state.ledger_entries.len(), 1);
        match &state.ledger_entries[0].detail {
            LedgerDetail::NoteIssued {
                investor,
                principal,
                ..
            } => {
                assert_eq!(investor, "Note Investor");
                assert_eq!(*principal, 250_000.0);
            }
            other => panic!("unexpected ledger detail: {other:?}"),
        }
    }
}
