//! Priced round stage - the conversion event.
//!
//! A priced round converts every outstanding instrument to shares, issues
//! the new investor's shares, optionally refreshes the option pool, and
//! rebuilds the full cap table atomically:
//!
//! 1. Super pro-rata rights contribute fixed extra cash and burn a round.
//! 2. Pre-money valuation = post-money minus all new cash, floored at 0.
//! 3. Notes and pre-money SAFEs convert at the cheapest positive price
//!    among round price, cap price, and discounted round price.
//! 4. Post-money SAFEs are sized sequentially so each hits its target
//!    percent of the share base accumulated so far; their shares do not
//!    enter the round share-price denominator.
//! 5. Primary and rights investors buy in at the round share price.
//! 6. The option pool tops up last, after all dilution.
//!
//! Every instrument list is then discarded, converted or not - instruments
//! only ever survive until the next priced round.

use serde::{Deserialize, Serialize};

use crate::fmt;
use crate::scenario::{Stage, StageParams};
use crate::state::{
    CapTableRow, EngineState, InstrumentLedger, LedgerDetail, LedgerEntry, SuperProRata,
    OPTION_POOL_CLASS,
};
use crate::stages::{holder_identity, params_mismatch, round_shares, sanitize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricedRoundParams {
    pub round_name: String,
    pub investor_name: String,
    pub investment: f64,
    pub post_money_valuation: f64,
    pub security_class: String,
    pub holder_id: String,
    pub option_pool_refresh: OptionPoolRefresh,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionPoolRefresh {
    pub enabled: bool,
    /// Post-round pool target, honored when in (0, 0.75)
    pub target_percent: f64,
}

/// Default round: an $8M Series A at a $32M post-money valuation with a
/// 15% pool refresh.
pub fn defaults() -> StageParams {
    StageParams::PricedRound(PricedRoundParams {
        round_name: "Series A".to_string(),
        investor_name: "Series A Lead".to_string(),
        investment: 8_000_000.0,
        post_money_valuation: 32_000_000.0,
        security_class: "Preferred A".to_string(),
        holder_id: String::new(),
        option_pool_refresh: OptionPoolRefresh {
            enabled: true,
            target_percent: 0.15,
        },
    })
}

pub fn simulate(stage: &Stage, prior: EngineState) -> EngineState {
    let params = match &stage.params {
        StageParams::PricedRound(params) => params,
        _ => return params_mismatch(stage, prior),
    };

    let mut state = prior;
    let prior_shares = state.total_shares;

    let investment = sanitize(params.investment);
    let post_money_valuation = sanitize(params.post_money_valuation);

    let mut warnings: Vec<String> = Vec::new();

    // Rights first: fixed contributions join the round's new cash and each
    // exercised right burns one of its remaining rounds.
    let rights = gather_rights(&mut state.instruments);
    let rights_total: f64 = rights.iter().map(|right| right.amount).sum();
    let total_new_cash = investment + rights_total;

    let pre_money_valuation = (post_money_valuation - total_new_cash).max(0.0);
    let pre_money_price = if prior_shares > 0 {
        pre_money_valuation / prior_shares as f64
    } else {
        0.0
    };
    if pre_money_price <= 0.0 {
        warnings.push(
            "Unable to derive pre-money price; check prior shares and valuations.".to_string(),
        );
    }

    let outcome = convert_instruments(
        &state.instruments,
        &mut state.cap_table,
        pre_money_price,
        prior_shares,
    );

    // Post-money SAFE shares are excluded from this denominator.
    let price_base_shares = prior_shares + outcome.converted_shares;
    let share_price = if price_base_shares > 0 {
        pre_money_valuation / price_base_shares as f64
    } else {
        0.0
    };
    if !(share_price > 0.0 && share_price.is_finite()) {
        warnings.push("Share price not computable; review valuation and stage inputs.".to_string());
    }

    let security_class = if params.security_class.is_empty() {
        "Preferred"
    } else {
        params.security_class.as_str()
    };
    let investor_label = if !params.investor_name.is_empty() {
        params.investor_name.clone()
    } else if !params.round_name.is_empty() {
        params.round_name.clone()
    } else {
        "New Investor".to_string()
    };

    let primary_shares = if share_price > 0.0 {
        round_shares(investment / share_price)
    } else {
        0
    };
    if primary_shares > 0 {
        grant_shares(
            &mut state.cap_table,
            &holder_identity(&params.holder_id, &stage.id, "investor"),
            &investor_label,
            security_class,
            primary_shares,
        );
    }

    let mut rights_shares_total: u64 = 0;
    let mut rights_math: Vec<String> = Vec::new();
    for right in &rights {
        let shares = if share_price > 0.0 {
            round_shares(right.amount / share_price)
        } else {
            0
        };
        if shares == 0 {
            continue;
        }
        rights_shares_total += shares;
        grant_shares(
            &mut state.cap_table,
            &right.holder_id,
            &right.holder_name,
            security_class,
            shares,
        );
        rights_math.push(format!(
            "{} exercises super pro-rata for {} -> {} shares.",
            right.holder_name,
            fmt::money(right.amount),
            fmt::shares(shares),
        ));
    }

    // Pool refresh comes last, after every dilutive issuance above.
    let pool_math = refresh_option_pool(&mut state.cap_table, &params.option_pool_refresh, &stage.id);

    state.total_shares = state.shares_in_table();
    state.recompute_percents();

    let round_label = if params.round_name.is_empty() {
        "Round"
    } else {
        params.round_name.as_str()
    };
    let mut math = vec![
        format!(
            "{} priced at {} post-money -> {} pre-money.",
            round_label,
            fmt::money(post_money_valuation),
            fmt::money(pre_money_valuation),
        ),
        format!(
            "Pre-money share price {} from {} pre-money shares.",
            fmt::price(share_price),
            fmt::shares(price_base_shares),
        ),
        if primary_shares > 0 {
            format!(
                "{} invests {} for {} shares.",
                investor_label,
                fmt::money(investment),
                fmt::shares(primary_shares),
            )
        } else {
            "No primary investment recorded.".to_string()
        },
    ];
    math.extend(outcome.math);
    math.extend(rights_math);
    if let Some(line) = pool_math {
        math.push(line);
    }

    state.math = math;
    state.warnings = warnings;
    state.warnings.extend(outcome.warnings);

    state.ledger_entries.push(LedgerEntry {
        stage_id: stage.id.clone(),
        detail: LedgerDetail::PricedRound {
            round_name: params.round_name.clone(),
            investment,
            share_price,
            shares_issued: primary_shares + rights_shares_total,
        },
    });

    // Every priced round is a full conversion event: whatever is still
    // outstanding is discarded, converted or not.
    state.instruments.clear();

    if rights.iter().any(|right| right.rounds_remaining > 0) {
        state.warnings.push(
            "Super pro-rata rights remaining require manual tracking after conversion.".to_string(),
        );
    }

    state
}

struct RightsContribution {
    holder_id: String,
    holder_name: String,
    amount: f64,
    rounds_remaining: u32,
}

fn gather_rights(instruments: &mut InstrumentLedger) -> Vec<RightsContribution> {
    let mut rights = Vec::new();
    for note in &mut instruments.notes {
        collect_right(&mut rights, &note.holder_id, &note.holder_name, &mut note.special_rights);
    }
    for safe in &mut instruments.pre_safes {
        collect_right(&mut rights, &safe.holder_id, &safe.holder_name, &mut safe.special_rights);
    }
    for safe in &mut instruments.post_safes {
        collect_right(&mut rights, &safe.holder_id, &safe.holder_name, &mut safe.special_rights);
    }
    rights
}

fn collect_right(
    rights: &mut Vec<RightsContribution>,
    holder_id: &str,
    holder_name: &str,
    special_rights: &mut SuperProRata,
) {
    if !special_rights.enabled
        || special_rights.rounds_remaining == 0
        || special_rights.amount <= 0.0
    {
        return;
    }
    special_rights.rounds_remaining -= 1;
    rights.push(RightsContribution {
        holder_id: holder_id.to_string(),
        holder_name: holder_name.to_string(),
        amount: sanitize(special_rights.amount),
        rounds_remaining: special_rights.rounds_remaining,
    });
}

#[derive(Default)]
struct ConversionOutcome {
    /// Shares from notes and pre-money SAFEs - the round-price base.
    converted_shares: u64,
    /// Shares from post-money SAFEs - excluded from the round-price base.
    post_safe_shares: u64,
    math: Vec<String>,
    warnings: Vec<String>,
}

fn convert_instruments(
    instruments: &InstrumentLedger,
    cap_table: &mut Vec<CapTableRow>,
    pre_money_price: f64,
    prior_shares: u64,
) -> ConversionOutcome {
    let mut outcome = ConversionOutcome::default();

    for note in &instruments.notes {
        let principal = sanitize(note.principal);
        let interest = principal * sanitize(note.interest_rate) * sanitize(note.accrual_years);
        let amount_owed = principal + interest;
        let price =
            conversion_price(pre_money_price, prior_shares, note.valuation_cap, note.discount);
        let shares = if price > 0.0 {
            round_shares(amount_owed / price)
        } else {
            0
        };
        if shares == 0 {
            outcome.warnings.push(format!(
                "Convertible note for {} unable to convert; check price inputs.",
                note.holder_name
            ));
            continue;
        }
        grant_shares(cap_table, &note.holder_id, &note.holder_name, "Preferred Bridge", shares);
        outcome.converted_shares += shares;
        outcome.math.push(format!(
            "{} note ({} + {} interest) converts at {} for {} shares.",
            note.holder_name,
            fmt::money(principal),
            fmt::money(interest),
            fmt::price(price),
            fmt::shares(shares),
        ));
    }

    for safe in &instruments.pre_safes {
        let investment = sanitize(safe.investment);
        let price =
            conversion_price(pre_money_price, prior_shares, safe.valuation_cap, safe.discount);
        let shares = if price > 0.0 {
            round_shares(investment / price)
        } else {
            0
        };
        if shares == 0 {
            outcome.warnings.push(format!(
                "Pre-money SAFE for {} unable to convert; check valuation inputs.",
                safe.holder_name
            ));
            continue;
        }
        grant_shares(cap_table, &safe.holder_id, &safe.holder_name, "SAFE", shares);
        outcome.converted_shares += shares;
        outcome.math.push(format!(
            "{} SAFE ({}) converts at {} for {} shares.",
            safe.holder_name,
            fmt::money(investment),
            fmt::price(price),
            fmt::shares(shares),
        ));
    }

    // Sequential dependent sizing: each SAFE's stake is measured against the
    // base accumulated so far, including earlier post-money SAFEs.
    for safe in &instruments.post_safes {
        let target = sanitize(safe.target_percent);
        if !(target > 0.0 && target < 0.9) {
            outcome.warnings.push(format!(
                "Post-money SAFE for {} missing valid target percent.",
                safe.holder_name
            ));
            continue;
        }
        let base = prior_shares + outcome.converted_shares + outcome.post_safe_shares;
        let shares = round_shares(target / (1.0 - target) * base as f64);
        if shares == 0 {
            outcome.warnings.push(format!(
                "Post-money SAFE for {} unable to derive share count.",
                safe.holder_name
            ));
            continue;
        }
        outcome.post_safe_shares += shares;
        grant_shares(cap_table, &safe.holder_id, &safe.holder_name, "SAFE (Post)", shares);
        outcome.math.push(format!(
            "{} post-money SAFE targets {} -> {} shares.",
            safe.holder_name,
            fmt::percent(target, 2),
            fmt::shares(shares),
        ));
    }

    outcome
}

/// Cheapest price wins: the minimum of whichever are positive among the
/// round price, the cap-implied price, and the discounted round price.
fn conversion_price(
    pre_money_price: f64,
    prior_shares: u64,
    valuation_cap: f64,
    discount: f64,
) -> f64 {
    let mut best = f64::INFINITY;
    if pre_money_price > 0.0 {
        best = best.min(pre_money_price);
    }
    if valuation_cap > 0.0 && prior_shares > 0 {
        best = best.min(valuation_cap / prior_shares as f64);
    }
    if discount > 0.0 && pre_money_price > 0.0 {
        best = best.min(pre_money_price * (1.0 - discount));
    }
    if best.is_finite() && best > 0.0 {
        best
    } else {
        0.0
    }
}

/// Adds shares to an existing stakeholder row or opens a new one.
fn grant_shares(
    cap_table: &mut Vec<CapTableRow>,
    holder_id: &str,
    holder_name: &str,
    share_class: &str,
    shares: u64,
) {
    if shares == 0 {
        return;
    }
    if let Some(row) = cap_table.iter_mut().find(|row| row.id == holder_id) {
        if !holder_name.is_empty() {
            row.label = holder_name.to_string();
        }
        if !share_class.is_empty() {
            row.share_class = share_class.to_string();
        }
        row.shares += shares;
    } else {
        cap_table.push(CapTableRow {
            id: holder_id.to_string(),
            label: if holder_name.is_empty() {
                "Stakeholder".to_string()
            } else {
                holder_name.to_string()
            },
            share_class: if share_class.is_empty() {
                "Preferred".to_string()
            } else {
                share_class.to_string()
            },
            shares,
            percent: 0.0,
        });
    }
}

fn refresh_option_pool(
    cap_table: &mut Vec<CapTableRow>,
    refresh: &OptionPoolRefresh,
    stage_id: &str,
) -> Option<String> {
    let target = sanitize(refresh.target_percent);
    if !refresh.enabled || !(target > 0.0 && target < 0.75) {
        return None;
    }

    let existing_pool: u64 = cap_table
        .iter()
        .filter(|row| row.share_class == OPTION_POOL_CLASS)
        .map(|row| row.shares)
        .sum();
    let non_pool_shares: u64 = cap_table
        .iter()
        .filter(|row| row.share_class != OPTION_POOL_CLASS)
        .map(|row| row.shares)
        .sum();

    let desired_pool = round_shares(non_pool_shares as f64 * target / (1.0 - target));
    let top_up = desired_pool.saturating_sub(existing_pool);
    if top_up == 0 {
        return Some(format!("Option pool already at {}.", fmt::percent(target, 1)));
    }

    if let Some(row) = cap_table
        .iter_mut()
        .find(|row| row.share_class == OPTION_POOL_CLASS)
    {
        row.shares += top_up;
    } else {
        cap_table.push(CapTableRow {
            id: format!("{stage_id}:esop"),
            label: "Option Pool".to_string(),
            share_class: OPTION_POOL_CLASS.to_string(),
            shares: top_up,
            percent: 0.0,
        });
    }

    Some(format!(
        "Option pool refreshed to {} via {} new options.",
        fmt::percent(target, 1),
        fmt::shares(top_up),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NoteInstrument, PostMoneySafeInstrument};
    use approx::assert_relative_eq;

    fn round_stage(params: PricedRoundParams) -> Stage {
        Stage::new("stage_round", "Priced Round", StageParams::PricedRound(params))
    }

    fn series_a(investment: f64, post_money_valuation: f64) -> PricedRoundParams {
        PricedRoundParams {
            round_name: "Series A".to_string(),
            investor_name: "Lead".to_string(),
            investment,
            post_money_valuation,
            security_class: "Preferred A".to_string(),
            holder_id: "lead".to_string(),
            option_pool_refresh: OptionPoolRefresh::default(),
        }
    }

    /// 9M founder shares plus a 1M option pool.
    fn seeded_state() -> EngineState {
        let mut state = EngineState::new();
        state.cap_table = vec![
            CapTableRow {
                id: "f1".to_string(),
                label: "Founder".to_string(),
                share_class: "Common".to_string(),
                shares: 9_000_000,
                percent: 0.9,
            },
            CapTableRow {
                id: "esop".to_string(),
                label: "ESOP".to_string(),
                share_class: OPTION_POOL_CLASS.to_string(),
                shares: 1_000_000,
                percent: 0.1,
            },
        ];
        state.total_shares = 10_000_000;
        state
    }

    fn note(principal: f64, valuation_cap: f64, discount: f64) -> NoteInstrument {
        NoteInstrument {
            id: "n1".to_string(),
            stage_id: "stage_note".to_string(),
            holder_id: "angel".to_string(),
            holder_name: "Angel".to_string(),
            principal,
            interest_rate: 0.0,
            accrual_years: 0.0,
            valuation_cap,
            discount,
            special_rights: SuperProRata::disabled(),
        }
    }

    fn post_safe(holder: &str, target_percent: f64) -> PostMoneySafeInstrument {
        PostMoneySafeInstrument {
            id: format!("{holder}:safe"),
            stage_id: "stage_psafe".to_string(),
            holder_id: holder.to_string(),
            holder_name: holder.to_string(),
            investment: 0.0,
            post_money_valuation: 0.0,
            target_percent,
            special_rights: SuperProRata::disabled(),
        }
    }

    fn row_shares(state: &EngineState, id: &str) -> u64 {
        state
            .cap_table
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.shares)
            .unwrap_or(0)
    }

    #[test]
    fn test_cheapest_conversion_price_wins() {
        // Pre-money price $1.00, cap implies $0.80, 20% discount implies
        // $0.80: the minimum ($0.80) must be selected.
        let mut prior = seeded_state();
        prior.instruments.notes.push(note(800_000.0, 8_000_000.0, 0.2));

        // $2M on $12M post with no rights -> $10M pre over 10M shares.
        let state = simulate(&round_stage(series_a(2_000_000.0, 12_000_000.0)), prior);

        assert_eq!(row_shares(&state, "angel"), 1_000_000);
        assert!(state.math.iter().any(|line| line.contains("$0.8000")));
        assert!(state.warnings.is_empty());
    }

    #[test]
    fn test_round_price_excludes_post_money_safe_shares() {
        let mut prior = seeded_state();
        prior.instruments.notes.push(note(1_000_000.0, 0.0, 0.0));
        prior.instruments.post_safes.push(post_safe("psafe", 0.1));

        // $3M on $16M post -> $13M pre; pre-money price $1.30.
        let state = simulate(&round_stage(series_a(3_000_000.0, 16_000_000.0)), prior);

        let note_shares = (1_000_000.0_f64 / 1.3).round() as u64;
        assert_eq!(row_shares(&state, "angel"), note_shares);

        // Post-money SAFE sized on prior + note shares.
        let safe_base = 10_000_000 + note_shares;
        let safe_shares = (0.1_f64 / 0.9 * safe_base as f64).round() as u64;
        assert_eq!(row_shares(&state, "psafe"), safe_shares);

        // Share price denominator must not include the SAFE's shares.
        let share_price = 13_000_000.0 / safe_base as f64;
        let lead_shares = (3_000_000.0 / share_price).round() as u64;
        assert_eq!(row_shares(&state, "lead"), lead_shares);
    }

    #[test]
    fn test_post_money_safe_target_sizing() {
        // $125k at $3M post -> target ~4.1667%; on a clean 10M-share base
        // the SAFE must come out at 434,783 shares.
        let mut prior = seeded_state();
        prior
            .instruments
            .post_safes
            .push(post_safe("psafe", 125_000.0 / 3_000_000.0));

        let state = simulate(&round_stage(series_a(2_000_000.0, 12_000_000.0)), prior);

        assert_eq!(row_shares(&state, "psafe"), 434_783);
    }

    #[test]
    fn test_two_post_money_safes_size_sequentially() {
        let mut prior = seeded_state();
        prior.instruments.post_safes.push(post_safe("first", 0.1));
        prior.instruments.post_safes.push(post_safe("second", 0.1));

        let state = simulate(&round_stage(series_a(2_000_000.0, 12_000_000.0)), prior);

        let first = (0.1_f64 / 0.9 * 10_000_000.0).round() as u64;
        assert_eq!(row_shares(&state, "first"), first);

        let second_base = 10_000_000 + first;
        let second = (0.1_f64 / 0.9 * second_base as f64).round() as u64;
        assert_eq!(row_shares(&state, "second"), second);
        assert!(second > first);
    }

    #[test]
    fn test_rights_contribute_cash_and_burn_a_round() {
        let mut prior = seeded_state();
        let mut bridge = note(100_000.0, 0.0, 0.0);
        bridge.special_rights = SuperProRata {
            enabled: true,
            rounds_remaining: 2,
            amount: 500_000.0,
        };
        prior.instruments.notes.push(bridge);

        // $1.5M primary + $500k rights -> $2M new cash on $12M post.
        let state = simulate(&round_stage(series_a(1_500_000.0, 12_000_000.0)), prior);

        // Pre-money price $1.00; note converts at it.
        let note_shares = 100_000;
        let share_price = 10_000_000.0 / (10_000_000.0 + note_shares as f64);
        let rights_shares = (500_000.0 / share_price).round() as u64;
        let primary_shares = (1_500_000.0 / share_price).round() as u64;
        assert_eq!(row_shares(&state, "angel"), note_shares + rights_shares);
        assert_eq!(row_shares(&state, "lead"), primary_shares);

        // One round burned, one left -> manual-tracking warning.
        assert!(state
            .warnings
            .iter()
            .any(|warning| warning.contains("manual tracking")));
        assert!(state.instruments.is_empty());
    }

    #[test]
    fn test_option_pool_refresh_tops_up_after_dilution() {
        let prior = seeded_state();
        let mut params = series_a(2_500_000.0, 10_000_000.0);
        params.option_pool_refresh = OptionPoolRefresh {
            enabled: true,
            target_percent: 0.15,
        };

        let state = simulate(&round_stage(params), prior);

        // $7.5M pre over 10M shares -> $0.75; lead buys 3,333,333 shares.
        let lead_shares = (2_500_000.0_f64 / 0.75).round() as u64;
        assert_eq!(row_shares(&state, "lead"), lead_shares);

        let non_pool = 9_000_000 + lead_shares;
        let desired = (non_pool as f64 * 0.15 / 0.85).round() as u64;
        assert_eq!(row_shares(&state, "esop"), desired);
        assert!(state
            .math
            .iter()
            .any(|line| line.contains("Option pool refreshed")));

        assert_eq!(state.total_shares, state.shares_in_table());
        let percent_sum: f64 = state.cap_table.iter().map(|row| row.percent).sum();
        assert_relative_eq!(percent_sum, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_option_pool_already_at_target_is_a_noop() {
        let prior = seeded_state();
        let mut params = series_a(1_000_000.0, 11_000_000.0);
        params.option_pool_refresh = OptionPoolRefresh {
            enabled: true,
            target_percent: 0.05,
        };

        let state = simulate(&round_stage(params), prior);

        assert_eq!(row_shares(&state, "esop"), 1_000_000);
        assert!(state
            .math
            .iter()
            .any(|line| line.contains("Option pool already at")));
    }

    #[test]
    fn test_unconvertible_instruments_warn_and_are_discarded() {
        let mut prior = seeded_state();
        prior.instruments.notes.push(note(100_000.0, 0.0, 0.0));

        // Zero post-money: no positive price exists anywhere.
        let state = simulate(&round_stage(series_a(0.0, 0.0)), prior);

        assert!(state
            .warnings
            .iter()
            .any(|warning| warning.contains("unable to convert")));
        assert!(state.instruments.is_empty());
        assert_eq!(state.total_shares, 10_000_000);
    }

    #[test]
    fn test_zero_prior_shares_degrades_with_warnings() {
        let state = simulate(
            &round_stage(series_a(1_000_000.0, 5_000_000.0)),
            EngineState::new(),
        );

        assert!(state
            .warnings
            .iter()
            .any(|warning| warning.contains("pre-money price")));
        assert!(state
            .warnings
            .iter()
            .any(|warning| warning.contains("Share price not computable")));
        assert_eq!(state.total_shares, 0);
    }

    #[test]
    fn test_ledger_entry_records_issued_shares() {
        let state = simulate(
            &round_stage(series_a(2_000_000.0, 12_000_000.0)),
            seeded_state(),
        );

        assert_eq!(state.ledger_entries.len(), 1);
        match &state.ledger_entries[0].detail {
            LedgerDetail::PricedRound {
                round_name,
                shares_issued,
                share_price,
                ..
            } => {
                assert_eq!(round_name, "Series A");
                assert_eq!(*shares_issued, 2_000_000);
                assert_relative_eq!(*share_price, 1.0, epsilon = 1e-12);
            }
            other => panic!("unexpected ledger detail: {other:?}"),
        }
    }
}
