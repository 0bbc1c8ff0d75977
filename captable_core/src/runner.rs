//! Engine runner - folds an ordered timeline into per-stage snapshots.
//!
//! The fold is deliberately resilient: a stage with no registered
//! simulator produces a snapshot carrying a missing-handler warning and
//! the run continues, so later history stays visible. The runner never
//! fails on well-typed input.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scenario::{Scenario, Stage, StageKind};
use crate::stages;
use crate::state::{CapTableRow, EngineState, LedgerEntry, WaterfallRow};

/// Options for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after (inclusive of) the stage with this id - used to preview
    /// the cap table "as of" a selected stage.
    pub until_stage_id: Option<String>,
}

/// Snapshot of the engine state after one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StageKind,
    pub name: String,
    pub cap_table: Vec<CapTableRow>,
    pub math: Vec<String>,
    pub warnings: Vec<String>,
    pub ledger_entries: Vec<LedgerEntry>,
    pub exit_waterfall: Option<Vec<WaterfallRow>>,
}

/// Aggregate result of a full (or truncated) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub scenario_name: String,
    pub stage_results: Vec<StageResult>,
    pub cap_table: Vec<CapTableRow>,
    pub total_shares: u64,
    pub exit_waterfall: Option<Vec<WaterfallRow>>,
    /// All stage warnings, deduplicated in first-seen order
    pub warnings: Vec<String>,
}

/// Runs a scenario's timeline in order and returns the snapshot trail plus
/// the final aggregate. Deterministic: identical inputs produce identical
/// results.
pub fn run(scenario: &Scenario, options: &RunOptions) -> ScenarioResult {
    let mut state = EngineState::new();
    let mut stage_results: Vec<StageResult> = Vec::with_capacity(scenario.timeline.len());

    for stage in &scenario.timeline {
        let kind = stage.kind();
        match stages::definition(&kind) {
            None => {
                warn!("no simulator registered for stage type {kind}");
                stage_results.push(missing_handler_result(stage, &kind, &state));
                // Note: an unhandled stage cannot satisfy `until_stage_id`.
                continue;
            }
            Some(def) => {
                debug!("simulating stage {} ({kind})", stage.id);
                let next = (def.simulate)(stage, state.carry_forward());
                state = normalize_state(next);
                stage_results.push(snapshot(stage, kind, &state));
            }
        }

        if options.until_stage_id.as_deref() == Some(stage.id.as_str()) {
            break;
        }
    }

    let warnings = dedupe_warnings(&stage_results);
    ScenarioResult {
        scenario_id: scenario.id.clone(),
        scenario_name: scenario.name.clone(),
        cap_table: state.cap_table.clone(),
        total_shares: state.total_shares,
        exit_waterfall: state.exit_waterfall.clone(),
        warnings,
        stage_results,
    }
}

fn missing_handler_result(stage: &Stage, kind: &StageKind, state: &EngineState) -> StageResult {
    StageResult {
        id: stage.id.clone(),
        kind: kind.clone(),
        name: stage.name.clone(),
        cap_table: state.cap_table.clone(),
        math: vec![format!("No simulator registered for stage type {kind}.")],
        warnings: vec![format!("Missing handler for stage type: {kind}")],
        ledger_entries: Vec::new(),
        exit_waterfall: None,
    }
}

fn snapshot(stage: &Stage, kind: StageKind, state: &EngineState) -> StageResult {
    StageResult {
        id: stage.id.clone(),
        kind,
        name: stage.name.clone(),
        cap_table: state.cap_table.clone(),
        math: state.math.clone(),
        warnings: state.warnings.clone(),
        ledger_entries: state.ledger_entries.clone(),
        exit_waterfall: state.exit_waterfall.clone(),
    }
}

/// Canonicalizes a simulator's output before it becomes the state of
/// record: derived floats must be finite.
fn normalize_state(mut state: EngineState) -> EngineState {
    for row in &mut state.cap_table {
        if !row.percent.is_finite() {
            row.percent = 0.0;
        }
    }
    if let Some(waterfall) = &mut state.exit_waterfall {
        for row in waterfall {
            if !row.payout.is_finite() {
                row.payout = 0.0;
            }
        }
    }
    state
}

fn dedupe_warnings(stage_results: &[StageResult]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for result in stage_results {
        for warning in &result.warnings {
            if warning.is_empty() {
                continue;
            }
            if seen.insert(warning.clone()) {
                deduped.push(warning.clone());
            }
        }
    }
    deduped
}
