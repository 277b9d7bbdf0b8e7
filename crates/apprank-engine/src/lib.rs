//! Experiment execution engine for apprank
//!
//! - [`state`]: the experiment lifecycle state machine
//! - [`orchestrator`]: fan-out over models × features × repetitions with an
//!   all-or-nothing commit
//! - [`response`]: parsing of structured LLM output
//! - [`service`]: create/retry entry points used by the CLI

pub mod error;
pub mod orchestrator;
pub mod response;
pub mod service;
pub mod settings;
pub mod state;

pub use error::{AppRankError, StateError};
pub use orchestrator::{ExperimentExecutor, NO_CONFIGURED_MODELS, NO_FEATURES, RunSummary};
pub use response::{ParsedResponse, parse_response};
pub use service::{ExperimentReport, ExperimentService};
pub use settings::ExecutionSettings;
pub use state::{ExperimentStateContext, next_status};
