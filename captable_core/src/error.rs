//! Error types for the scenario document boundary.
//!
//! A run itself never fails; these errors only surface when a scenario
//! document cannot be decoded into the typed model in the first place.

use thiserror::Error;

/// Errors raised while decoding a scenario document.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A stage carried a recognized type tag but params that do not match
    /// that type's schema.
    #[error("stage {stage_id}: malformed {kind} params: {source}")]
    StageParams {
        stage_id: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document as a whole was not decodable.
    #[error("unreadable scenario document: {0}")]
    Document(#[from] serde_json::Error),
}
