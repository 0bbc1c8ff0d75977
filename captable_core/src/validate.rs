//! Scenario lint - structural checks surfaced before a run.
//!
//! Validation never blocks the engine (the runner tolerates everything it
//! flags); it exists so a calling layer can show configuration problems
//! next to the timeline.

use serde::{Deserialize, Serialize};

use crate::scenario::{Scenario, StageKind, StageParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            message: message.into(),
        }
    }
}

/// Checks a scenario for structural problems.
pub fn validate_scenario(scenario: &Scenario) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if scenario.timeline.is_empty() {
        issues.push(ValidationIssue::error("Scenario timeline is empty."));
        return issues;
    }

    for (index, stage) in scenario.timeline.iter().enumerate() {
        let position = index + 1;
        match &stage.params {
            StageParams::Unknown { kind, .. } => {
                if kind.is_empty() {
                    issues.push(ValidationIssue::error(format!(
                        "Stage {position} missing type."
                    )));
                } else {
                    issues.push(ValidationIssue::warning(format!(
                        "Stage {position} has unrecognized type {kind}; it will be skipped with a warning."
                    )));
                }
            }
            StageParams::Founding(params) => {
                if index > 0 {
                    issues.push(ValidationIssue::warning(format!(
                        "Stage {position} is a founding event after the timeline start; it will reset the cap table."
                    )));
                }
                if params.founders.is_empty() {
                    issues.push(ValidationIssue::warning(
                        "Founding stage missing founder allocation; defaults will be applied.",
                    ));
                }
            }
            _ => {}
        }
    }

    if scenario.timeline[0].kind() != StageKind::Founding {
        issues.push(ValidationIssue::warning(
            "Timeline does not start with a founding stage.",
        ));
    }

    issues
}
