//! Modeler worker: clean schema → candidate training script.
//!
//! Persona: machine-learning architect. Picks the problem family for the
//! schema, selects an algorithm, and asks the model for a complete training
//! script along with the validation metrics it reports.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::WorkerResult;
use super::types::{CandidateArtifact, CleanSchema, ProblemKind};
use super::worker::Worker;
use crate::llm::{InferenceRequest, StructuredInference, StructuredOutput};
use crate::utils::render_template;

const MODELER_SYSTEM_PROMPT: &str = r#"You are a machine learning architect writing a training pipeline.

Given a target variable, a feature list and a problem family:
1. Select the most suitable algorithm and justify it.
2. Write a complete, runnable Python training script with proper cross-validation.
   Fit every preprocessing step inside the validation folds (no target leakage).
3. Report the validation metrics the script produces. Use "rmse" for regression
   and "accuracy" for classification, plus any others you find useful.

You MUST respond with ONLY a valid JSON object in this exact format:
{
  "python_code": "<training script>",
  "reasoning": "<why this algorithm and setup>",
  "algorithm_used": "<algorithm name>",
  "metrics": {"<metric>": <number>}
}"#;

const MODELER_USER_TEMPLATE: &str = r#"Problem family: {kind}
Target variable: {target}
Features ({feature_count}): {features}"#;

/// Analysis result handed from `analyze` to `execute`.
#[derive(Debug, Clone)]
pub struct ModelingRequest {
    pub schema: CleanSchema,
    pub kind: ProblemKind,
}

#[derive(Debug, Deserialize)]
struct ModelerResponse {
    python_code: String,
    #[serde(default)]
    reasoning: String,
    algorithm_used: String,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
}

impl StructuredOutput for ModelerResponse {
    const SCHEMA: &'static str = "candidate_artifact";

    fn validate(&self) -> Result<(), String> {
        if self.python_code.trim().is_empty() {
            return Err("python_code is empty".to_string());
        }
        if self.algorithm_used.trim().is_empty() {
            return Err("algorithm_used is empty".to_string());
        }
        if let Some((name, value)) = self.metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("metric '{}' is not finite ({})", name, value));
        }
        Ok(())
    }
}

/// Turns a [`CleanSchema`] into a fresh [`CandidateArtifact`].
#[derive(Debug, Clone)]
pub struct Modeler {
    inference: StructuredInference,
}

impl Modeler {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "modeler";

    pub fn new(inference: StructuredInference) -> Self {
        Self { inference }
    }

    fn format_prompt(&self, request: &ModelingRequest) -> String {
        let kind = request.kind.to_string();
        let feature_count = request.schema.features().len().to_string();
        let features = request.schema.features().join(", ");

        render_template(
            MODELER_USER_TEMPLATE,
            &[
                ("kind", kind.as_str()),
                ("target", request.schema.target()),
                ("feature_count", feature_count.as_str()),
                ("features", features.as_str()),
            ],
        )
    }
}

#[async_trait]
impl Worker for Modeler {
    type Context = CleanSchema;
    type Request = ModelingRequest;
    type Output = CandidateArtifact;

    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn analyze(&self, schema: &CleanSchema) -> WorkerResult<ModelingRequest> {
        let kind = ProblemKind::for_schema(schema);
        tracing::info!(
            target_variable = %schema.target(),
            kind = %kind,
            "Evaluating candidate architectures"
        );
        Ok(ModelingRequest {
            schema: schema.clone(),
            kind,
        })
    }

    async fn execute(&self, request: ModelingRequest) -> WorkerResult<CandidateArtifact> {
        tracing::info!(kind = %request.kind, "Requesting training script from LLM");

        let prompt = InferenceRequest::new(MODELER_SYSTEM_PROMPT, self.format_prompt(&request));
        let response: ModelerResponse = self.inference.infer(&prompt).await?;

        Ok(CandidateArtifact {
            script: response.python_code,
            rationale: response.reasoning,
            algorithm: response.algorithm_used,
            metrics: response.metrics,
        })
    }
}
