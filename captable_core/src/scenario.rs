//! Scenario model - an ordered timeline of financing stages.
//!
//! Stages are a closed tagged union: one variant per stage type, each
//! carrying its own typed params. The serialized shape stays
//! `{id, type, name, params}` so persisted documents round-trip unchanged;
//! an unrecognized `type` tag decodes losslessly into
//! [`StageParams::Unknown`] so the runner can degrade with a warning
//! instead of rejecting the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::stages::convertible_note::ConvertibleNoteParams;
use crate::stages::exit::ExitParams;
use crate::stages::founding::FoundingParams;
use crate::stages::post_money_safe::PostMoneySafeParams;
use crate::stages::pre_money_safe::PreMoneySafeParams;
use crate::stages::priced_round::PricedRoundParams;

/// A saved journey: ordered financing events from founding to exit.
///
/// By convention (not enforced) `timeline[0]` is a founding stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timeline: Vec<Stage>,
}

/// One financing event on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStage", into = "RawStage")]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub params: StageParams,
}

impl Stage {
    pub fn new(id: impl Into<String>, name: impl Into<String>, params: StageParams) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            params,
        }
    }

    /// The stage-type tag, derived from the params variant.
    pub fn kind(&self) -> StageKind {
        self.params.kind()
    }
}

/// Stage-type tag. The six financing events are closed variants;
/// `Other` preserves tags this engine build does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageKind {
    Founding,
    ConvertibleNote,
    PreMoneySafe,
    PostMoneySafe,
    PricedRound,
    Exit,
    Other(String),
}

impl StageKind {
    /// The wire tag, e.g. `FOUNDING` or `PRICED_ROUND`.
    pub fn as_tag(&self) -> &str {
        match self {
            StageKind::Founding => "FOUNDING",
            StageKind::ConvertibleNote => "CONVERTIBLE_NOTE",
            StageKind::PreMoneySafe => "PRE_MONEY_SAFE",
            StageKind::PostMoneySafe => "POST_MONEY_SAFE",
            StageKind::PricedRound => "PRICED_ROUND",
            StageKind::Exit => "EXIT",
            StageKind::Other(tag) => tag,
        }
    }
}

impl From<String> for StageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "FOUNDING" => StageKind::Founding,
            "CONVERTIBLE_NOTE" => StageKind::ConvertibleNote,
            "PRE_MONEY_SAFE" => StageKind::PreMoneySafe,
            "POST_MONEY_SAFE" => StageKind::PostMoneySafe,
            "PRICED_ROUND" => StageKind::PricedRound,
            "EXIT" => StageKind::Exit,
            _ => StageKind::Other(tag),
        }
    }
}

impl From<StageKind> for String {
    fn from(kind: StageKind) -> Self {
        kind.as_tag().to_string()
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// Per-type stage parameters - the closed union the simulators dispatch on.
#[derive(Debug, Clone, PartialEq)]
pub enum StageParams {
    Founding(FoundingParams),
    ConvertibleNote(ConvertibleNoteParams),
    PreMoneySafe(PreMoneySafeParams),
    PostMoneySafe(PostMoneySafeParams),
    PricedRound(PricedRoundParams),
    Exit(ExitParams),
    /// A stage with no registered simulator; the raw params are preserved
    /// so the document still round-trips.
    Unknown {
        kind: String,
        params: serde_json::Value,
    },
}

impl StageParams {
    pub fn kind(&self) -> StageKind {
        match self {
            StageParams::Founding(_) => StageKind::Founding,
            StageParams::ConvertibleNote(_) => StageKind::ConvertibleNote,
            StageParams::PreMoneySafe(_) => StageKind::PreMoneySafe,
            StageParams::PostMoneySafe(_) => StageKind::PostMoneySafe,
            StageParams::PricedRound(_) => StageKind::PricedRound,
            StageParams::Exit(_) => StageKind::Exit,
            StageParams::Unknown { kind, .. } => StageKind::Other(kind.clone()),
        }
    }
}

/// Wire shape of a stage; conversion to [`Stage`] resolves the params
/// variant from the `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStage {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: StageKind,
    #[serde(default)]
    name: String,
    #[serde(default)]
    params: serde_json::Value,
}

impl TryFrom<RawStage> for Stage {
    type Error = ScenarioError;

    fn try_from(raw: RawStage) -> Result<Self, Self::Error> {
        let params = match &raw.kind {
            StageKind::Founding => StageParams::Founding(decode_params(&raw)?),
            StageKind::ConvertibleNote => StageParams::ConvertibleNote(decode_params(&raw)?),
            StageKind::PreMoneySafe => StageParams::PreMoneySafe(decode_params(&raw)?),
            StageKind::PostMoneySafe => StageParams::PostMoneySafe(decode_params(&raw)?),
            StageKind::PricedRound => StageParams::PricedRound(decode_params(&raw)?),
            StageKind::Exit => StageParams::Exit(decode_params(&raw)?),
            StageKind::Other(tag) => StageParams::Unknown {
                kind: tag.clone(),
                params: raw.params.clone(),
            },
        };
        Ok(Stage {
            id: raw.id,
            name: raw.name,
            params,
        })
    }
}

fn decode_params<T: DeserializeOwned>(raw: &RawStage) -> Result<T, ScenarioError> {
    // A stage saved without params decodes as if params were {}.
    let value = if raw.params.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        raw.params.clone()
    };
    serde_json::from_value(value).map_err(|source| ScenarioError::StageParams {
        stage_id: raw.id.clone(),
        kind: raw.kind.as_tag().to_string(),
        source,
    })
}

impl From<Stage> for RawStage {
    fn from(stage: Stage) -> Self {
        let kind = stage.kind();
        let params = match stage.params {
            StageParams::Founding(p) => encode_params(&p),
            StageParams::ConvertibleNote(p) => encode_params(&p),
            StageParams::PreMoneySafe(p) => encode_params(&p),
            StageParams::PostMoneySafe(p) => encode_params(&p),
            StageParams::PricedRound(p) => encode_params(&p),
            StageParams::Exit(p) => encode_params(&p),
            StageParams::Unknown { params, .. } => params,
        };
        RawStage {
            id: stage.id,
            kind,
            name: stage.name,
            params,
        }
    }
}

fn encode_params<T: Serialize>(params: &T) -> serde_json::Value {
    serde_json::to_value(params).unwrap_or(serde_json::Value::Null)
}

impl Scenario {
    /// Decodes a scenario from its JSON document form.
    pub fn from_json(document: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Encodes the scenario to its JSON document form.
    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
