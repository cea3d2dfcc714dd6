//! ds-forge: automated data-science pipeline built from cooperating LLM workers.
//!
//! A Preparer fixes the target and feature schema of a tabular dataset, a
//! Modeler proposes training scripts, and a Critic approves or rejects each
//! one. The [`pipeline::Orchestrator`] runs the Modeler/Critic loop with
//! exponential backoff until a candidate is approved or the retry budget is
//! spent.

// Core modules
pub mod agents;
pub mod cli;
pub mod data;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use agents::{CandidateArtifact, CleanSchema, Critic, Modeler, Preparer, Verdict, Worker};
pub use data::{CsvAnalyzer, DataSummary, DatasetAnalyzer, DatasetReference};
pub use error::{AnalysisError, ConfigError, InferenceError, LlmError};
pub use pipeline::{Orchestrator, OrchestratorConfig, RunFailure, RunReport, RunResult};
