//! Run orchestration for the clean → model → critique pipeline.
//!
//! # Flow
//!
//! 1. **Preparing**: the Preparer turns the dataset into a [`CleanSchema`]
//!    once. Any failure here ends the run as an upstream failure.
//! 2. **Modeling**: the Modeler produces a candidate training script.
//! 3. **Critiquing**: the Critic approves or rejects it.
//! 4. On rejection the orchestrator waits `base^retries` backoff units and
//!    goes back to step 2 with the same schema, until `max_retries` is
//!    reached.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds_forge::pipeline::{Orchestrator, OrchestratorConfig};
//!
//! let orchestrator = Orchestrator::new(preparer, modeler, critic, OrchestratorConfig::default())?;
//! let report = orchestrator.run(&"train.csv".into()).await;
//!
//! if let Some(script) = report.result.script() {
//!     println!("{}", script);
//! }
//! ```
//!
//! [`CleanSchema`]: crate::agents::CleanSchema

pub mod backoff;
pub mod config;
pub mod events;
pub mod orchestrator;
pub mod result;

pub use backoff::{BackoffPolicy, WaitOutcome};
pub use config::{LlmSettings, OrchestratorConfig, RunSettings};
pub use events::{PipelineEvent, RunState};
pub use orchestrator::Orchestrator;
pub use result::{
    ApprovedArtifact, AttemptRecord, BackoffRecord, RunFailure, RunReport, RunResult,
};
