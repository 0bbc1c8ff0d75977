//! Engine state - the aggregate threaded through a run.
//!
//! `EngineState` carries the durable ledger (cap table, unconverted
//! instruments) plus per-stage transient logs (`math`, `warnings`,
//! `ledger_entries`, `exit_waterfall`). The transient logs are
//! write-once-per-stage: `carry_forward` resets them while deep-copying
//! the durable parts, so each simulator starts from a clean slate.

use serde::{Deserialize, Serialize};

/// Share class used for option-pool rows; the pool refresh step keys off it.
pub const OPTION_POOL_CLASS: &str = "Option Pool";

/// One stakeholder line in the cap table.
///
/// `percent` is always a derived view (shares / total shares), recomputed
/// after every mutation - it is never trusted across stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableRow {
    /// Stakeholder identity; issuance aggregates by this id
    pub id: String,
    /// Display name
    pub label: String,
    /// Security class, e.g. Common / Preferred A / Option Pool / SAFE
    #[serde(rename = "class")]
    pub share_class: String,
    /// Whole shares held
    pub shares: u64,
    /// Derived ownership fraction of total shares
    pub percent: f64,
}

/// A super pro-rata right in normalized form: the holder may invest a fixed
/// extra amount in each of the next `rounds_remaining` priced rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperProRata {
    pub enabled: bool,
    pub rounds_remaining: u32,
    pub amount: f64,
}

impl SuperProRata {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// An unconverted convertible note: principal accrues simple interest until
/// the next priced round converts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInstrument {
    pub id: String,
    pub stage_id: String,
    pub holder_id: String,
    pub holder_name: String,
    pub principal: f64,
    pub interest_rate: f64,
    pub accrual_years: f64,
    pub valuation_cap: f64,
    pub discount: f64,
    pub special_rights: SuperProRata,
}

impl NoteInstrument {
    /// Simple interest accrued over the note's lifetime.
    pub fn accrued_interest(&self) -> f64 {
        self.principal * self.interest_rate * self.accrual_years
    }

    /// Principal plus accrued interest - the amount that converts.
    pub fn amount_owed(&self) -> f64 {
        self.principal + self.accrued_interest()
    }
}

/// An unconverted pre-money SAFE: converts at the better of cap price or
/// discounted round price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreMoneySafeInstrument {
    pub id: String,
    pub stage_id: String,
    pub holder_id: String,
    pub holder_name: String,
    pub investment: f64,
    pub discount: f64,
    pub valuation_cap: f64,
    pub special_rights: SuperProRata,
}

/// An unconverted post-money SAFE: sized at conversion so the holder ends up
/// with `target_percent` of the accumulated share base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMoneySafeInstrument {
    pub id: String,
    pub stage_id: String,
    pub holder_id: String,
    pub holder_name: String,
    pub investment: f64,
    pub post_money_valuation: f64,
    pub target_percent: f64,
    pub special_rights: SuperProRata,
}

/// Outstanding unconverted instruments, grouped by flavor. The next priced
/// round consumes (and then unconditionally discards) all three lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentLedger {
    pub notes: Vec<NoteInstrument>,
    #[serde(rename = "preSafes")]
    pub pre_safes: Vec<PreMoneySafeInstrument>,
    #[serde(rename = "postSafes")]
    pub post_safes: Vec<PostMoneySafeInstrument>,
}

impl InstrumentLedger {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.pre_safes.is_empty() && self.post_safes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.pre_safes.clear();
        self.post_safes.clear();
    }
}

/// One audit-trail record emitted by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub stage_id: String,
    #[serde(flatten)]
    pub detail: LedgerDetail,
}

/// Typed audit payloads, tagged the way the persisted documents tag them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerDetail {
    #[serde(rename_all = "camelCase")]
    NoteIssued {
        investor: String,
        principal: f64,
        interest_rate: f64,
        accrual_years: f64,
    },
    #[serde(rename_all = "camelCase")]
    SafePreMoney {
        investor: String,
        investment: f64,
        discount: f64,
        valuation_cap: f64,
    },
    #[serde(rename_all = "camelCase")]
    SafePostMoney {
        investor: String,
        investment: f64,
        target_percent: f64,
    },
    #[serde(rename_all = "camelCase")]
    PricedRound {
        round_name: String,
        investment: f64,
        share_price: f64,
        shares_issued: u64,
    },
}

/// One line of the exit proceeds distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallRow {
    pub stakeholder: String,
    pub shares: u64,
    pub payout: f64,
}

/// The aggregate threaded through a run.
///
/// Invariant: `total_shares == Σ cap_table[].shares` after every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub cap_table: Vec<CapTableRow>,
    pub total_shares: u64,
    pub instruments: InstrumentLedger,
    pub ledger_entries: Vec<LedgerEntry>,
    /// Human-readable narrative of this stage's arithmetic
    pub math: Vec<String>,
    /// Non-fatal configuration warnings raised by this stage
    pub warnings: Vec<String>,
    /// Present only after an exit stage
    pub exit_waterfall: Option<Vec<WaterfallRow>>,
}

impl EngineState {
    /// Zeroed aggregate for the start of a run.
    pub fn new() -> Self {
        Self::default()
    }

    /// The copy handed to the next stage's simulator: durable ledger deep
    /// copied, per-stage transient logs reset.
    pub fn carry_forward(&self) -> Self {
        Self {
            cap_table: self.cap_table.clone(),
            total_shares: self.total_shares,
            instruments: self.instruments.clone(),
            ledger_entries: Vec::new(),
            math: Vec::new(),
            warnings: Vec::new(),
            exit_waterfall: None,
        }
    }

    /// Sum of shares actually sitting in cap table rows.
    pub fn shares_in_table(&self) -> u64 {
        self.cap_table.iter().map(|row| row.shares).sum()
    }

    /// Re-derives every row's `percent` from the current totals.
    pub fn recompute_percents(&mut self) {
        if self.total_shares == 0 {
            return;
        }
        let total = self.total_shares as f64;
        for row in &mut self.cap_table {
            row.percent = row.shares as f64 / total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_state() -> EngineState {
        let mut state = EngineState::new();
        state.cap_table.push(CapTableRow {
            id: "f1".to_string(),
            label: "Founder".to_string(),
            share_class: "Common".to_string(),
            shares: 9_000_000,
            percent: 0.9,
        });
        state.total_shares = 9_000_000;
        state.math.push("narrative".to_string());
        state.warnings.push("warning".to_string());
        state.exit_waterfall = Some(vec![WaterfallRow {
            stakeholder: "Founder".to_string(),
            shares: 9_000_000,
            payout: 90.0,
        }]);
        state
    }

    #[test]
    fn test_carry_forward_keeps_ledger_resets_logs() {
        let prior = populated_state();
        let carried = prior.carry_forward();

        assert_eq!(carried.cap_table, prior.cap_table);
        assert_eq!(carried.total_shares, 9_000_000);
        assert!(carried.math.is_empty());
        assert!(carried.warnings.is_empty());
        assert!(carried.ledger_entries.is_empty());
        assert!(carried.exit_waterfall.is_none());
    }

    #[test]
    fn test_recompute_percents() {
        let mut state = populated_state();
        state.cap_table.push(CapTableRow {
            id: "esop".to_string(),
            label: "ESOP".to_string(),
            share_class: OPTION_POOL_CLASS.to_string(),
            shares: 1_000_000,
            percent: 0.0,
        });
        state.total_shares = 10_000_000;
        state.recompute_percents();

        assert!((state.cap_table[0].percent - 0.9).abs() < 1e-12);
        assert!((state.cap_table[1].percent - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_note_amount_owed() {
        let note = NoteInstrument {
            id: "n1".to_string(),
            stage_id: "s1".to_string(),
            holder_id: "h1".to_string(),
            holder_name: "Angel".to_string(),
            principal: 250_000.0,
            interest_rate: 0.05,
            accrual_years: 2.0,
            valuation_cap: 0.0,
            discount: 0.0,
            special_rights: SuperProRata::disabled(),
        };
        assert!((note.accrued_interest() - 25_000.0).abs() < 1e-9);
        assert!((note.amount_owed() - 275_000.0).abs() < 1e-9);
    }
}
