//! Outcome of a run and the report that carries it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::RunState;
use crate::agents::CleanSchema;

/// The candidate the Critic approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedArtifact {
    /// Final training script.
    pub script: String,
    pub algorithm: String,
    pub metrics: BTreeMap<String, f64>,
    /// Zero-based index of the approved attempt.
    pub attempt: u32,
    /// The Critic's justification.
    pub rationale: String,
}

/// Why a run ended without an approved candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    /// The Preparer could not produce a schema; nothing downstream ran.
    #[error("Upstream failure in {stage}: {reason}")]
    UpstreamFailure { stage: String, reason: String },

    /// Every attempt was rejected, or the backoff wait was cancelled.
    #[error("{}", exhausted_message(*.attempts, .last_rationale.as_deref(), *.cancelled))]
    RetryExhausted {
        /// Number of candidates the Critic reviewed.
        attempts: u32,
        last_rationale: Option<String>,
        cancelled: bool,
    },

    /// A Modeler or Critic call failed outright.
    #[error("Worker '{worker}' failed on attempt {attempt}: {reason}")]
    WorkerFault {
        worker: String,
        attempt: u32,
        reason: String,
    },
}

fn exhausted_message(attempts: u32, last_rationale: Option<&str>, cancelled: bool) -> String {
    let mut message = if cancelled {
        format!("Run cancelled during backoff after {} attempt(s)", attempts)
    } else {
        format!("Retry limit exhausted after {} attempt(s)", attempts)
    };
    if let Some(rationale) = last_rationale {
        message.push_str(&format!("; last rejection: {}", rationale));
    }
    message
}

impl RunFailure {
    /// Terminal state corresponding to this failure.
    pub fn state(&self) -> RunState {
        match self {
            RunFailure::UpstreamFailure { .. } => RunState::UpstreamFailed,
            RunFailure::RetryExhausted { .. } => RunState::Exhausted,
            RunFailure::WorkerFault { .. } => RunState::Faulted,
        }
    }

    /// Whether the failure stems from a worker error rather than rejections.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RunFailure::RetryExhausted { .. })
    }
}

/// Exactly one of approval or a classified failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Approved(ApprovedArtifact),
    Failed(RunFailure),
}

impl RunResult {
    pub fn is_approved(&self) -> bool {
        matches!(self, RunResult::Approved(_))
    }

    pub fn state(&self) -> RunState {
        match self {
            RunResult::Approved(_) => RunState::Approved,
            RunResult::Failed(failure) => failure.state(),
        }
    }

    /// The approved script, if any.
    pub fn script(&self) -> Option<&str> {
        match self {
            RunResult::Approved(artifact) => Some(&artifact.script),
            RunResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            RunResult::Approved(_) => None,
            RunResult::Failed(failure) => Some(failure),
        }
    }
}

/// One reviewed candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Zero-based attempt index.
    pub index: u32,
    pub algorithm: String,
    pub metrics: BTreeMap<String, f64>,
    /// Leakage pre-check result reported by the Critic (advisory).
    pub leakage_flagged: bool,
    pub approved: bool,
    pub rationale: String,
    pub suggested_fixes: Vec<String>,
}

/// One wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffRecord {
    /// Retry counter value the delay was computed from.
    pub retry: u32,
    pub delay_units: u64,
    pub delay_ms: u64,
    /// Whether the wait was cut short by cancellation.
    pub cancelled: bool,
}

/// Everything known about a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub dataset: String,
    pub result: RunResult,
    pub attempts: Vec<AttemptRecord>,
    pub backoffs: Vec<BackoffRecord>,
    /// Schema fixed by the Preparer, absent on upstream failure.
    pub schema: Option<CleanSchema>,
    /// Cleaning script generated alongside the schema.
    pub cleaning_script: Option<String>,
    pub preparation_rationale: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn is_approved(&self) -> bool {
        self.result.is_approved()
    }

    /// Total delay units waited across all backoffs.
    pub fn total_backoff_units(&self) -> u64 {
        self.backoffs
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.delay_units))
    }
}
