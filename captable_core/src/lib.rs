//! CapTable Core - Deterministic Equity Timeline Simulation Engine
//!
//! This library evolves a company's capitalization table across a sequence
//! of financing events as a pure, synchronous state-fold:
//! 1. **Deferred instruments**: notes and SAFEs are recorded as claims and
//!    only become shares at the next priced round
//! 2. **Cheapest-price conversion**: round price, valuation cap, and
//!    discount compete per instrument; the lowest positive price wins
//! 3. **Flat exit waterfall**: pro-rata proceeds distribution with no
//!    preference stacking
//!
//! The engine never fails on well-typed input: every degenerate case
//! (zero valuation, empty cap table, unpriceable instrument) degrades to a
//! skipped computation plus a warning on the stage snapshot.

pub mod error;
pub mod fmt;
pub mod runner;
pub mod scenario;
pub mod stages;
pub mod state;
pub mod validate;

// Re-export key types for convenience
pub use error::ScenarioError;
pub use runner::{run, RunOptions, ScenarioResult, StageResult};
pub use scenario::{Scenario, Stage, StageKind, StageParams};
pub use state::{CapTableRow, EngineState, InstrumentLedger, WaterfallRow};
pub use validate::{validate_scenario, IssueLevel, ValidationIssue};
