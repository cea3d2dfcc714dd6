//! Critic worker: candidate artifact → verdict.
//!
//! Persona: skeptical reviewer. Before asking the model, the Critic runs a
//! local leakage check on the reported metrics. The result is passed along
//! as context; whether the candidate is approved is decided by the model's
//! structured answer alone.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::WorkerResult;
use super::types::{CandidateArtifact, LeakageRisk, Verdict};
use super::worker::Worker;
use crate::llm::{InferenceRequest, StructuredInference, StructuredOutput};
use crate::utils::render_template;

const CRITIC_SYSTEM_PROMPT: &str = r#"You are a strict reviewer of machine learning training code.

Audit the script and its reported metrics for:
- target leakage (preprocessing fitted on the full dataset, target-derived features)
- overfitting and invalid validation schemes
- metrics that are statistically implausible for the problem

A local pre-check result is included. Treat it as a hint, not a conclusion.

You MUST respond with ONLY a valid JSON object in this exact format:
{
  "is_approved": <true or false>,
  "reasoning": "<detailed justification>",
  "suggested_fixes": ["<fix1>", "<fix2>"] or []
}"#;

const CRITIC_USER_TEMPLATE: &str = r#"Local pre-check: {advisory}
Algorithm: {algorithm}
Reported metrics: {metrics}

Script under review:
```python
{script}
```"#;

/// Analysis result handed from `analyze` to `execute`.
#[derive(Debug, Clone)]
pub struct CritiqueRequest {
    pub risk: LeakageRisk,
    pub algorithm: String,
    pub metrics: BTreeMap<String, f64>,
    pub script: String,
}

#[derive(Debug, Deserialize)]
struct CriticResponse {
    is_approved: bool,
    reasoning: String,
    #[serde(default)]
    suggested_fixes: Vec<String>,
}

impl StructuredOutput for CriticResponse {
    const SCHEMA: &'static str = "verdict";

    fn validate(&self) -> Result<(), String> {
        if self.reasoning.trim().is_empty() {
            return Err("reasoning is empty".to_string());
        }
        Ok(())
    }
}

/// Reviews a [`CandidateArtifact`] and returns a [`Verdict`].
#[derive(Debug, Clone)]
pub struct Critic {
    inference: StructuredInference,
}

impl Critic {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "critic";

    pub fn new(inference: StructuredInference) -> Self {
        Self { inference }
    }

    fn format_prompt(&self, request: &CritiqueRequest) -> String {
        let metrics = if request.metrics.is_empty() {
            "(none reported)".to_string()
        } else {
            request
                .metrics
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(", ")
        };

        render_template(
            CRITIC_USER_TEMPLATE,
            &[
                ("advisory", request.risk.advisory()),
                ("algorithm", request.algorithm.as_str()),
                ("metrics", metrics.as_str()),
                ("script", request.script.as_str()),
            ],
        )
    }
}

#[async_trait]
impl Worker for Critic {
    type Context = CandidateArtifact;
    type Request = CritiqueRequest;
    type Output = Verdict;

    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn analyze(&self, candidate: &CandidateArtifact) -> WorkerResult<CritiqueRequest> {
        let risk = LeakageRisk::assess(&candidate.metrics);
        if risk.is_flagged() {
            tracing::warn!(metrics = ?candidate.metrics, "Leakage pre-check flagged candidate");
        } else {
            tracing::debug!(metrics = ?candidate.metrics, "Leakage pre-check passed");
        }

        Ok(CritiqueRequest {
            risk,
            algorithm: candidate.algorithm.clone(),
            metrics: candidate.metrics.clone(),
            script: candidate.script.clone(),
        })
    }

    async fn execute(&self, request: CritiqueRequest) -> WorkerResult<Verdict> {
        tracing::info!(algorithm = %request.algorithm, "Requesting critique from LLM");

        let prompt = InferenceRequest::new(CRITIC_SYSTEM_PROMPT, self.format_prompt(&request));
        let response: CriticResponse = self.inference.infer(&prompt).await?;

        let verdict = if response.is_approved {
            Verdict::approve(response.reasoning)
        } else {
            Verdict::reject(response.reasoning, response.suggested_fixes)
        };
        Ok(verdict.with_leakage_flag(request.risk.is_flagged()))
    }
}
