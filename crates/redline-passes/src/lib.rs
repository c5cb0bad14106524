//! redline-passes: sequential check passes over a redline document.
//!
//! This crate provides:
//! - `Pass`, `PassStatus` - checklist entries and their lifecycle
//! - `PassLedger` - synchronous bookkeeping for the running pass
//! - `PassCoordinator` - async task that runs passes one at a time and
//!   waits for every inserted annotation to be resolved before moving on
//! - `Analyzer`, `DiffAnalyzer`, `LintAnalyzer` - the seam to whatever
//!   produces issues
//! - `EngineConfig` - TOML configuration
//! - `telemetry` - console tracing setup

pub mod analyzer;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod pass;
pub mod telemetry;

pub use analyzer::{Analyzer, DiffAnalyzer, FixService, LintAnalyzer, Linter};
pub use config::{AnalysisScope, EngineConfig};
pub use coordinator::{
    ChangeOrigin, Command, CoordinatorHandle, CoordinatorOutput, CoordinatorSnapshot,
    PassCoordinator, SequenceOutcome, output_stream,
};
pub use error::{AnalysisError, ConfigError, CoordinatorError};
pub use ledger::{
    InsertionOutcome, LedgerSnapshot, PassLedger, Progress, ResolutionEvent, ResolutionOutcome,
};
pub use pass::{Pass, PassStatus, default_passes};
