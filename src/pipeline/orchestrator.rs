//! Run orchestration: Preparer once, then Modeler → Critic with backoff.
//!
//! The orchestrator is generic over the three [`Worker`] implementations and
//! owns all per-run state (schema, retry counter, current candidate) as
//! locals of a single run. A rejected candidate is dropped before the next
//! attempt; only its summary survives in the report.

use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{CandidateArtifact, CleanSchema, PreparedData, Verdict, Worker, WorkerError};
use crate::data::DatasetReference;
use crate::error::ConfigError;

use super::backoff::{BackoffPolicy, WaitOutcome};
use super::config::OrchestratorConfig;
use super::events::{PipelineEvent, RunState};
use super::result::{
    ApprovedArtifact, AttemptRecord, BackoffRecord, RunFailure, RunReport, RunResult,
};

/// Bookkeeping collected while a run progresses.
#[derive(Default)]
struct RunLedger {
    attempts: Vec<AttemptRecord>,
    backoffs: Vec<BackoffRecord>,
    schema: Option<CleanSchema>,
    cleaning_script: Option<String>,
    preparation_rationale: Option<String>,
}

/// Drives one dataset through preparation, modeling and critique.
pub struct Orchestrator<P, M, C> {
    preparer: P,
    modeler: M,
    critic: C,
    config: OrchestratorConfig,
    events: Option<mpsc::Sender<PipelineEvent>>,
    cancel: CancellationToken,
}

impl<P, M, C> Orchestrator<P, M, C>
where
    P: Worker<Context = DatasetReference, Output = PreparedData>,
    M: Worker<Context = CleanSchema, Output = CandidateArtifact>,
    C: Worker<Context = CandidateArtifact, Output = Verdict>,
{
    /// Creates an orchestrator over the given workers.
    ///
    /// Fails if `config` does not pass [`OrchestratorConfig::validate`].
    pub fn new(
        preparer: P,
        modeler: M,
        critic: C,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            preparer,
            modeler,
            critic,
            config,
            events: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Streams [`PipelineEvent`]s to `tx` during runs.
    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Uses `token` to interrupt backoff waits.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that interrupts backoff waits when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs the pipeline with the configured retry ceiling.
    pub async fn run(&self, dataset: &DatasetReference) -> RunReport {
        self.run_with_retries(dataset, self.config.max_retries).await
    }

    /// Runs the pipeline, tolerating at most `max_retries` rejections.
    ///
    /// At most `max_retries + 1` candidates are produced. The returned report
    /// always carries exactly one of an approved artifact or a classified
    /// [`RunFailure`].
    pub async fn run_with_retries(&self, dataset: &DatasetReference, max_retries: u32) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id, dataset = %dataset);

        self.execute_run(run_id, dataset, max_retries)
            .instrument(span)
            .await
    }

    async fn execute_run(
        &self,
        run_id: String,
        dataset: &DatasetReference,
        max_retries: u32,
    ) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut ledger = RunLedger::default();

        tracing::info!(max_retries, "Starting run");
        self.send_event(PipelineEvent::run_started(&run_id, dataset.as_str()))
            .await;

        let result = self.drive(dataset, max_retries, &mut ledger).await;

        match &result {
            RunResult::Approved(artifact) => tracing::info!(
                attempt = artifact.attempt,
                algorithm = %artifact.algorithm,
                "Candidate approved"
            ),
            RunResult::Failed(failure) => tracing::error!(
                state = %failure.state(),
                error = %failure,
                "Run failed"
            ),
        }
        self.send_event(PipelineEvent::run_finished(result.clone()))
            .await;

        RunReport {
            run_id,
            dataset: dataset.as_str().to_string(),
            result,
            attempts: ledger.attempts,
            backoffs: ledger.backoffs,
            schema: ledger.schema,
            cleaning_script: ledger.cleaning_script,
            preparation_rationale: ledger.preparation_rationale,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn drive(
        &self,
        dataset: &DatasetReference,
        max_retries: u32,
        ledger: &mut RunLedger,
    ) -> RunResult {
        self.send_event(PipelineEvent::stage_started(RunState::Preparing, 0))
            .await;
        let prepared = match self.preparer.run(dataset).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(worker = self.preparer.name(), step = e.step(), error = %e, "Preparation failed");
                return RunResult::Failed(RunFailure::UpstreamFailure {
                    stage: self.preparer.name().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        self.send_event(PipelineEvent::stage_completed(RunState::Preparing, 0))
            .await;

        let PreparedData {
            schema,
            cleaning_script,
            rationale,
        } = prepared;
        tracing::info!(
            target_variable = %schema.target(),
            features = schema.features().len(),
            "Schema fixed for run"
        );
        ledger.schema = Some(schema.clone());
        ledger.cleaning_script = Some(cleaning_script);
        ledger.preparation_rationale = Some(rationale);

        let policy = BackoffPolicy::from(&self.config);
        let mut retries: u32 = 0;

        loop {
            let attempt = retries;

            self.send_event(PipelineEvent::stage_started(RunState::Modeling, attempt))
                .await;
            let candidate = match self.modeler.run(&schema).await {
                Ok(candidate) => candidate,
                Err(e) => return self.fault(self.modeler.name(), attempt, e),
            };
            self.send_event(PipelineEvent::stage_completed(RunState::Modeling, attempt))
                .await;

            self.send_event(PipelineEvent::stage_started(RunState::Critiquing, attempt))
                .await;
            let verdict = match self.critic.run(&candidate).await {
                Ok(verdict) => verdict,
                Err(e) => return self.fault(self.critic.name(), attempt, e),
            };
            self.send_event(PipelineEvent::stage_completed(RunState::Critiquing, attempt))
                .await;

            ledger.attempts.push(AttemptRecord {
                index: attempt,
                algorithm: candidate.algorithm.clone(),
                metrics: candidate.metrics.clone(),
                leakage_flagged: verdict.leakage_flagged,
                approved: verdict.approved,
                rationale: verdict.rationale.clone(),
                suggested_fixes: verdict.suggested_fixes.clone(),
            });

            if verdict.approved {
                return RunResult::Approved(ApprovedArtifact {
                    script: candidate.script,
                    algorithm: candidate.algorithm,
                    metrics: candidate.metrics,
                    attempt,
                    rationale: verdict.rationale,
                });
            }

            tracing::warn!(
                attempt,
                fixes = verdict.suggested_fixes.len(),
                rationale = %verdict.rationale,
                "Candidate rejected"
            );
            self.send_event(PipelineEvent::attempt_rejected(
                attempt,
                verdict.rationale.clone(),
                verdict.suggested_fixes,
            ))
            .await;

            if retries >= max_retries {
                return RunResult::Failed(RunFailure::RetryExhausted {
                    attempts: attempt + 1,
                    last_rationale: Some(verdict.rationale),
                    cancelled: false,
                });
            }

            let delay_units = policy.delay_units(retries);
            let delay_ms = policy.delay(retries).as_millis() as u64;
            tracing::info!(retry = retries, delay_units, delay_ms, "Backing off before next attempt");
            self.send_event(PipelineEvent::backoff_started(retries, delay_units, delay_ms))
                .await;

            let outcome = policy.wait(retries, &self.cancel).await;
            ledger.backoffs.push(BackoffRecord {
                retry: retries,
                delay_units,
                delay_ms,
                cancelled: outcome == WaitOutcome::Cancelled,
            });

            if outcome == WaitOutcome::Cancelled {
                tracing::warn!(retry = retries, "Backoff cancelled");
                return RunResult::Failed(RunFailure::RetryExhausted {
                    attempts: attempt + 1,
                    last_rationale: Some(verdict.rationale),
                    cancelled: true,
                });
            }

            retries += 1;
        }
    }

    fn fault(&self, worker: &str, attempt: u32, error: WorkerError) -> RunResult {
        tracing::error!(worker, attempt, step = error.step(), error = %error, "Worker fault");
        RunResult::Failed(RunFailure::WorkerFault {
            worker: worker.to_string(),
            attempt,
            reason: error.to_string(),
        })
    }

    /// Sends an event through the channel, ignoring send errors.
    async fn send_event(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // Receiver may have been dropped
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::WorkerResult;
    use crate::error::{AnalysisError, InferenceError};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedPreparer {
        fail_analyze: bool,
        fail_execute: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for ScriptedPreparer {
        type Context = DatasetReference;
        type Request = DatasetReference;
        type Output = PreparedData;

        fn name(&self) -> &'static str {
            "preparer"
        }

        async fn analyze(&self, dataset: &DatasetReference) -> WorkerResult<DatasetReference> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_analyze {
                return Err(AnalysisError::Unreadable {
                    dataset: dataset.to_string(),
                    reason: "permission denied".to_string(),
                }
                .into());
            }
            Ok(dataset.clone())
        }

        async fn execute(&self, _request: DatasetReference) -> WorkerResult<PreparedData> {
            if self.fail_execute {
                return Err(InferenceError::Exhausted {
                    schema: "clean_schema".to_string(),
                    attempts: 3,
                    last_error: "target listed as a feature".to_string(),
                }
                .into());
            }
            Ok(PreparedData {
                schema: CleanSchema::new("SalePrice", vec!["LotArea".into(), "YearBuilt".into()]),
                cleaning_script: "df = df.dropna()".to_string(),
                rationale: "drop sparse rows".to_string(),
            })
        }
    }

    struct ScriptedModeler {
        fail_on: Option<usize>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for ScriptedModeler {
        type Context = CleanSchema;
        type Request = usize;
        type Output = CandidateArtifact;

        fn name(&self) -> &'static str {
            "modeler"
        }

        async fn analyze(&self, _schema: &CleanSchema) -> WorkerResult<usize> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst))
        }

        async fn execute(&self, n: usize) -> WorkerResult<CandidateArtifact> {
            if self.fail_on == Some(n) {
                return Err(InferenceError::EmptyResponse.into());
            }
            Ok(CandidateArtifact {
                script: format!("script-{}", n),
                rationale: "try again".to_string(),
                algorithm: "XGBoost".to_string(),
                metrics: BTreeMap::from([("rmse".to_string(), 24500.5)]),
            })
        }
    }

    struct ScriptedCritic {
        approve_on: Option<usize>,
        fail_on: Option<usize>,
        flag_leakage: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for ScriptedCritic {
        type Context = CandidateArtifact;
        type Request = usize;
        type Output = Verdict;

        fn name(&self) -> &'static str {
            "critic"
        }

        async fn analyze(&self, _candidate: &CandidateArtifact) -> WorkerResult<usize> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst))
        }

        async fn execute(&self, n: usize) -> WorkerResult<Verdict> {
            if self.fail_on == Some(n) {
                return Err(InferenceError::EmptyResponse.into());
            }
            let verdict = if self.approve_on == Some(n) {
                Verdict::approve("sound validation")
            } else {
                Verdict::reject(
                    format!("leakage in attempt {}", n),
                    vec!["fit scaler per fold".to_string()],
                )
            };
            Ok(verdict.with_leakage_flag(self.flag_leakage))
        }
    }

    struct Counters {
        preparer: Arc<AtomicUsize>,
        modeler: Arc<AtomicUsize>,
        critic: Arc<AtomicUsize>,
    }

    #[derive(Default)]
    struct Script {
        preparer_fails: bool,
        preparer_execute_fails: bool,
        critic_flags_leakage: bool,
        modeler_fails_on: Option<usize>,
        critic_fails_on: Option<usize>,
        approve_on: Option<usize>,
    }

    fn orchestrator(
        script: Script,
        max_retries: u32,
        unit: Duration,
    ) -> (
        Orchestrator<ScriptedPreparer, ScriptedModeler, ScriptedCritic>,
        Counters,
    ) {
        let counters = Counters {
            preparer: Arc::new(AtomicUsize::new(0)),
            modeler: Arc::new(AtomicUsize::new(0)),
            critic: Arc::new(AtomicUsize::new(0)),
        };
        let orchestrator = Orchestrator::new(
            ScriptedPreparer {
                fail_analyze: script.preparer_fails,
                fail_execute: script.preparer_execute_fails,
                calls: counters.preparer.clone(),
            },
            ScriptedModeler {
                fail_on: script.modeler_fails_on,
                calls: counters.modeler.clone(),
            },
            ScriptedCritic {
                approve_on: script.approve_on,
                fail_on: script.critic_fails_on,
                flag_leakage: script.critic_flags_leakage,
                calls: counters.critic.clone(),
            },
            OrchestratorConfig::new()
                .with_max_retries(max_retries)
                .with_backoff_unit(unit),
        )
        .expect("valid config");
        (orchestrator, counters)
    }

    fn dataset() -> DatasetReference {
        DatasetReference::new("train.csv")
    }

    #[tokio::test]
    async fn test_first_attempt_approved() {
        let script = Script {
            approve_on: Some(0),
            ..Script::default()
        };
        let (orch, counters) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        assert_eq!(report.result.script(), Some("script-0"));
        assert!(report.backoffs.is_empty());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 1);
        assert_eq!(counters.critic.load(Ordering::SeqCst), 1);
        assert_eq!(report.schema.as_ref().map(|s| s.target()), Some("SalePrice"));
        assert_eq!(report.cleaning_script.as_deref(), Some("df = df.dropna()"));
        assert_eq!(report.preparation_rationale.as_deref(), Some("drop sparse rows"));
        assert!(!report.attempts[0].leakage_flagged);
    }

    #[tokio::test]
    async fn test_all_rejected_exhausts_with_growing_backoff() {
        let (orch, counters) = orchestrator(Script::default(), 2, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        match report.result.failure() {
            Some(RunFailure::RetryExhausted {
                attempts,
                last_rationale,
                cancelled,
            }) => {
                assert_eq!(*attempts, 3);
                assert_eq!(last_rationale.as_deref(), Some("leakage in attempt 2"));
                assert!(!cancelled);
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
        let units: Vec<u64> = report.backoffs.iter().map(|b| b.delay_units).collect();
        assert_eq!(units, vec![1, 2]);
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 3);
        assert_eq!(counters.critic.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_upstream_failure_skips_downstream_workers() {
        let script = Script {
            preparer_fails: true,
            approve_on: Some(0),
            ..Script::default()
        };
        let (orch, counters) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        match report.result.failure() {
            Some(RunFailure::UpstreamFailure { stage, reason }) => {
                assert_eq!(stage, "preparer");
                assert!(reason.contains("permission denied"));
            }
            other => panic!("expected UpstreamFailure, got {:?}", other),
        }
        assert!(report.schema.is_none());
        assert_eq!(counters.preparer.load(Ordering::SeqCst), 1);
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 0);
        assert_eq!(counters.critic.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preparer_execute_failure_is_upstream_failure() {
        let script = Script {
            preparer_execute_fails: true,
            approve_on: Some(0),
            ..Script::default()
        };
        let (orch, counters) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        match report.result.failure() {
            Some(RunFailure::UpstreamFailure { stage, reason }) => {
                assert_eq!(stage, "preparer");
                assert!(reason.contains("target listed as a feature"));
            }
            other => panic!("expected UpstreamFailure, got {:?}", other),
        }
        assert!(report.schema.is_none());
        assert!(report.cleaning_script.is_none());
        assert!(report.attempts.is_empty());
        assert_eq!(counters.preparer.load(Ordering::SeqCst), 1);
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 0);
        assert_eq!(counters.critic.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_leakage_flag_comes_from_verdict() {
        let script = Script {
            critic_flags_leakage: true,
            approve_on: Some(0),
            ..Script::default()
        };
        // Scripted modeler reports rmse 24500.5, which the local rule would not flag.
        let (orch, _) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        assert!(report.is_approved());
        assert!(report.attempts[0].leakage_flagged);
    }

    #[test]
    fn test_zero_backoff_base_is_rejected() {
        let counters = Arc::new(AtomicUsize::new(0));
        let result = Orchestrator::new(
            ScriptedPreparer {
                fail_analyze: false,
                fail_execute: false,
                calls: counters.clone(),
            },
            ScriptedModeler {
                fail_on: None,
                calls: counters.clone(),
            },
            ScriptedCritic {
                approve_on: None,
                fail_on: None,
                flag_leakage: false,
                calls: counters,
            },
            OrchestratorConfig::new().with_backoff_base(0),
        );

        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_attempt_bound_is_retries_plus_one() {
        for max_retries in 0..4 {
            let (orch, counters) = orchestrator(Script::default(), max_retries, Duration::ZERO);
            let report = orch.run(&dataset()).await;

            let expected = max_retries as usize + 1;
            assert_eq!(counters.modeler.load(Ordering::SeqCst), expected);
            assert_eq!(report.attempts.len(), expected);
            assert_eq!(report.backoffs.len(), max_retries as usize);
        }
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let (orch, _) = orchestrator(Script::default(), 0, Duration::ZERO);
        let report = orch.run(&dataset()).await;

        assert!(matches!(
            report.result.failure(),
            Some(RunFailure::RetryExhausted { attempts: 1, .. })
        ));
        assert!(report.backoffs.is_empty());
    }

    #[tokio::test]
    async fn test_approval_on_later_attempt_stops_loop() {
        let script = Script {
            approve_on: Some(2),
            ..Script::default()
        };
        let (orch, counters) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        match &report.result {
            RunResult::Approved(artifact) => {
                assert_eq!(artifact.script, "script-2");
                assert_eq!(artifact.attempt, 2);
            }
            other => panic!("expected approval, got {:?}", other),
        }
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 3);
        let units: Vec<u64> = report.backoffs.iter().map(|b| b.delay_units).collect();
        assert_eq!(units, vec![1, 2]);
        assert!(!report.attempts[0].approved);
        assert!(report.attempts[2].approved);
    }

    #[tokio::test]
    async fn test_modeler_fault_aborts_without_backoff() {
        let script = Script {
            modeler_fails_on: Some(1),
            ..Script::default()
        };
        let (orch, counters) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        match report.result.failure() {
            Some(RunFailure::WorkerFault { worker, attempt, .. }) => {
                assert_eq!(worker, "modeler");
                assert_eq!(*attempt, 1);
            }
            other => panic!("expected WorkerFault, got {:?}", other),
        }
        assert_eq!(report.backoffs.len(), 1);
        assert_eq!(counters.critic.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_critic_fault_on_first_attempt() {
        let script = Script {
            critic_fails_on: Some(0),
            ..Script::default()
        };
        let (orch, _) = orchestrator(script, 5, Duration::ZERO);

        let report = orch.run(&dataset()).await;

        assert!(matches!(
            report.result.failure(),
            Some(RunFailure::WorkerFault { attempt: 0, .. })
        ));
        assert!(report.backoffs.is_empty());
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff() {
        let (orch, counters) = orchestrator(Script::default(), 3, Duration::from_secs(3600));
        let token = orch.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let report = orch.run(&dataset()).await;

        assert!(matches!(
            report.result.failure(),
            Some(RunFailure::RetryExhausted {
                attempts: 1,
                cancelled: true,
                ..
            })
        ));
        assert_eq!(report.backoffs.len(), 1);
        assert!(report.backoffs[0].cancelled);
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_honored_at_first_backoff() {
        let token = CancellationToken::new();
        token.cancel();
        let (orch, counters) = orchestrator(Script::default(), 3, Duration::ZERO);
        let orch = orch.with_cancellation(token);

        let report = orch.run(&dataset()).await;

        assert!(matches!(
            report.result.failure(),
            Some(RunFailure::RetryExhausted { cancelled: true, .. })
        ));
        assert_eq!(counters.modeler.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_events_follow_state_machine() {
        let script = Script {
            approve_on: Some(1),
            ..Script::default()
        };
        let (orch, _) = orchestrator(script, 5, Duration::ZERO);
        let (tx, mut rx) = mpsc::channel(64);
        let orch = orch.with_events(tx);

        let report = orch.run(&dataset()).await;
        drop(orch);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(PipelineEvent::RunStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::RunFinished {
                state: RunState::Approved,
                ..
            })
        ));
        let rejections = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::AttemptRejected { attempt: 0, .. }))
            .count();
        assert_eq!(rejections, 1);
        let backoffs = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::BackoffStarted { delay_units: 1, .. }))
            .count();
        assert_eq!(backoffs, 1);
        assert!(report.is_approved());
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_break_run() {
        let script = Script {
            approve_on: Some(0),
            ..Script::default()
        };
        let (orch, _) = orchestrator(script, 5, Duration::ZERO);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let orch = orch.with_events(tx);

        assert!(orch.run(&dataset()).await.is_approved());
    }

    #[tokio::test]
    async fn test_run_with_retries_overrides_config() {
        let (orch, counters) = orchestrator(Script::default(), 5, Duration::ZERO);

        let report = orch.run_with_retries(&dataset(), 1).await;

        assert_eq!(counters.modeler.load(Ordering::SeqCst), 2);
        assert!(matches!(
            report.result.failure(),
            Some(RunFailure::RetryExhausted { attempts: 2, .. })
        ));
        assert_eq!(report.total_backoff_units(), 1);
    }
}
