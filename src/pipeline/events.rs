//! Run states and the optional event stream emitted while a run progresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::RunResult;

/// States of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Preparing,
    Modeling,
    Critiquing,
    RetryBackoff,
    Approved,
    Exhausted,
    UpstreamFailed,
    Faulted,
}

impl RunState {
    /// Whether the run ends in this state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Approved | RunState::Exhausted | RunState::UpstreamFailed | RunState::Faulted
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Init => write!(f, "init"),
            RunState::Preparing => write!(f, "preparing"),
            RunState::Modeling => write!(f, "modeling"),
            RunState::Critiquing => write!(f, "critiquing"),
            RunState::RetryBackoff => write!(f, "retry_backoff"),
            RunState::Approved => write!(f, "approved"),
            RunState::Exhausted => write!(f, "exhausted"),
            RunState::UpstreamFailed => write!(f, "upstream_failed"),
            RunState::Faulted => write!(f, "faulted"),
        }
    }
}

/// Events emitted by the orchestrator during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The run has started.
    RunStarted {
        run_id: String,
        dataset: String,
        timestamp: DateTime<Utc>,
    },
    /// A worker stage has started.
    StageStarted {
        stage: RunState,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    /// A worker stage has completed successfully.
    StageCompleted {
        stage: RunState,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    /// The Critic rejected the candidate of this attempt.
    AttemptRejected {
        attempt: u32,
        rationale: String,
        suggested_fixes: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// The orchestrator is waiting before the next attempt.
    BackoffStarted {
        retry: u32,
        delay_units: u64,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// The run reached a terminal state.
    RunFinished {
        state: RunState,
        result: RunResult,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Creates a run started event.
    pub fn run_started(run_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        PipelineEvent::RunStarted {
            run_id: run_id.into(),
            dataset: dataset.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a stage started event.
    pub fn stage_started(stage: RunState, attempt: u32) -> Self {
        PipelineEvent::StageStarted {
            stage,
            attempt,
            timestamp: Utc::now(),
        }
    }

    /// Creates a stage completed event.
    pub fn stage_completed(stage: RunState, attempt: u32) -> Self {
        PipelineEvent::StageCompleted {
            stage,
            attempt,
            timestamp: Utc::now(),
        }
    }

    /// Creates an attempt rejected event.
    pub fn attempt_rejected(
        attempt: u32,
        rationale: impl Into<String>,
        suggested_fixes: Vec<String>,
    ) -> Self {
        PipelineEvent::AttemptRejected {
            attempt,
            rationale: rationale.into(),
            suggested_fixes,
            timestamp: Utc::now(),
        }
    }

    /// Creates a backoff started event.
    pub fn backoff_started(retry: u32, delay_units: u64, delay_ms: u64) -> Self {
        PipelineEvent::BackoffStarted {
            retry,
            delay_units,
            delay_ms,
            timestamp: Utc::now(),
        }
    }

    /// Creates a run finished event.
    pub fn run_finished(result: RunResult) -> Self {
        PipelineEvent::RunFinished {
            state: result.state(),
            result,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Approved.is_terminal());
        assert!(RunState::Exhausted.is_terminal());
        assert!(RunState::UpstreamFailed.is_terminal());
        assert!(RunState::Faulted.is_terminal());
        assert!(!RunState::RetryBackoff.is_terminal());
        assert!(!RunState::Modeling.is_terminal());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = PipelineEvent::backoff_started(1, 2, 2000);
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["type"], "backoff_started");
        assert_eq!(json["delay_units"], 2);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(RunState::RetryBackoff.to_string(), "retry_backoff");
        assert_eq!(RunState::UpstreamFailed.to_string(), "upstream_failed");
    }
}
