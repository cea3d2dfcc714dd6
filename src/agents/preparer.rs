//! Preparer worker: raw dataset → clean schema.
//!
//! Persona: senior data engineer. Reads the dataset summary (types, missing
//! values, distributions), decides on imputation and cleaning, and commits
//! to a target variable plus the ordered feature list every later modeling
//! attempt will use.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::WorkerResult;
use super::types::{CleanSchema, PreparedData};
use super::worker::Worker;
use crate::data::{DataSummary, DatasetAnalyzer, DatasetReference};
use crate::llm::{InferenceRequest, StructuredInference, StructuredOutput};
use crate::utils::render_template;

const PREPARER_SYSTEM_PROMPT: &str = r#"You are a senior data engineer preparing a tabular dataset for supervised learning.

From the statistical summary you receive:
1. Pick the single most plausible TARGET variable.
2. Choose the FEATURES to keep, in a stable order. Never list the target as a feature.
3. Write a pandas cleaning script: load the file, impute or drop missing values, fix dtypes.
4. Explain the imputation choices briefly.

You MUST respond with ONLY a valid JSON object in this exact format:
{
  "python_code": "<cleaning script>",
  "reasoning": "<why these cleaning steps>",
  "target_variable": "<column name>",
  "features": ["<column>", "<column>"]
}"#;

const PREPARER_USER_TEMPLATE: &str = r#"Dataset: {dataset}
Shape: {rows} rows x {columns} columns
Total missing cells: {missing}

Statistical summary (JSON):
{summary}"#;

/// Analysis result handed from `analyze` to `execute`.
#[derive(Debug, Clone)]
pub struct PreparationRequest {
    pub dataset: DatasetReference,
    pub summary: DataSummary,
}

#[derive(Debug, Deserialize)]
struct PreparerResponse {
    python_code: String,
    #[serde(default)]
    reasoning: String,
    target_variable: String,
    features: Vec<String>,
}

impl StructuredOutput for PreparerResponse {
    const SCHEMA: &'static str = "clean_schema";

    fn validate(&self) -> Result<(), String> {
        CleanSchema::new(self.target_variable.clone(), self.features.clone()).validate()
    }
}

/// Turns a dataset reference into a [`PreparedData`].
pub struct Preparer {
    analyzer: Arc<dyn DatasetAnalyzer>,
    inference: StructuredInference,
}

impl std::fmt::Debug for Preparer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preparer")
            .field("inference", &self.inference)
            .finish_non_exhaustive()
    }
}

impl Preparer {
    /// Agent name constant for identification.
    pub const AGENT_NAME: &'static str = "preparer";

    pub fn new(analyzer: Arc<dyn DatasetAnalyzer>, inference: StructuredInference) -> Self {
        Self {
            analyzer,
            inference,
        }
    }

    fn format_prompt(&self, request: &PreparationRequest) -> String {
        let summary_json = serde_json::to_string_pretty(&request.summary)
            .unwrap_or_else(|_| format!("{:?}", request.summary));

        let rows = request.summary.shape.rows.to_string();
        let columns = request.summary.shape.columns.to_string();
        let missing = request.summary.total_missing().to_string();

        render_template(
            PREPARER_USER_TEMPLATE,
            &[
                ("dataset", request.dataset.as_str()),
                ("rows", rows.as_str()),
                ("columns", columns.as_str()),
                ("missing", missing.as_str()),
                ("summary", summary_json.as_str()),
            ],
        )
    }
}

#[async_trait]
impl Worker for Preparer {
    type Context = DatasetReference;
    type Request = PreparationRequest;
    type Output = PreparedData;

    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn analyze(&self, dataset: &DatasetReference) -> WorkerResult<PreparationRequest> {
        let summary = self.analyzer.summarize(dataset).await.map_err(|e| {
            tracing::error!(dataset = %dataset, error = %e, "Failed to analyze data");
            e
        })?;

        Ok(PreparationRequest {
            dataset: dataset.clone(),
            summary,
        })
    }

    async fn execute(&self, request: PreparationRequest) -> WorkerResult<PreparedData> {
        tracing::info!(dataset = %request.dataset, "Requesting clean schema from LLM");

        let prompt = InferenceRequest::new(PREPARER_SYSTEM_PROMPT, self.format_prompt(&request));
        let response: PreparerResponse = self.inference.infer(&prompt).await?;

        tracing::info!(
            target_variable = %response.target_variable,
            features = response.features.len(),
            "Received clean schema"
        );

        Ok(PreparedData {
            schema: CleanSchema::new(response.target_variable, response.features),
            cleaning_script: response.python_code,
            rationale: response.reasoning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CsvAnalyzer;
    use crate::error::{AnalysisError, InferenceError, LlmError};
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
    use crate::agents::error::WorkerError;
    use std::io::Write;
    use std::sync::Mutex;

    /// Mock LLM provider that returns a fixed response and records prompts.
    struct MockLlmProvider {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlmProvider {
        fn new(response: impl Into<String>) -> Self {
            Self {
                response: response.into(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            if let Some(user) = request.messages.last() {
                self.prompts
                    .lock()
                    .expect("lock not poisoned")
                    .push(user.content.clone());
            }
            Ok(GenerationResponse {
                id: "mock-id".to_string(),
                model: "mock-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.response.clone()),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }
    }

    const VALID_RESPONSE: &str = r#"{
        "python_code": "import pandas as pd\ndf = pd.read_csv('train.csv')\ndf = df.fillna(df.median(numeric_only=True))",
        "reasoning": "Imputed missing values using median to mitigate outlier skew.",
        "target_variable": "SalePrice",
        "features": ["LotArea", "YearBuilt"]
    }"#;

    fn write_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"LotArea,YearBuilt,SalePrice\n8450,2003,208500\n9600,,181500\n")
            .expect("write csv");
        file
    }

    fn preparer(provider: Arc<MockLlmProvider>) -> Preparer {
        Preparer::new(
            Arc::new(CsvAnalyzer::new()),
            StructuredInference::with_defaults(provider),
        )
    }

    #[tokio::test]
    async fn test_prepare_produces_schema() {
        let file = write_csv();
        let provider = Arc::new(MockLlmProvider::new(VALID_RESPONSE));
        let worker = preparer(provider.clone());
        let dataset = DatasetReference::from(file.path().to_path_buf());

        let prepared = worker.run(&dataset).await.expect("preparation succeeds");

        assert_eq!(prepared.schema.target(), "SalePrice");
        assert_eq!(prepared.schema.features(), ["LotArea", "YearBuilt"]);
        assert!(prepared.cleaning_script.contains("read_csv"));

        let prompts = provider.prompts.lock().expect("lock not poisoned");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Shape: 2 rows x 3 columns"));
        assert!(prompts[0].contains("Total missing cells: 1"));
    }

    #[tokio::test]
    async fn test_unreadable_dataset_is_analysis_error() {
        let provider = Arc::new(MockLlmProvider::new(VALID_RESPONSE));
        let worker = preparer(provider.clone());

        let result = worker.analyze(&DatasetReference::new("/missing/train.csv")).await;

        assert!(matches!(
            result,
            Err(WorkerError::Analysis(AnalysisError::Unreadable { .. }))
        ));
        assert!(provider.prompts.lock().expect("lock not poisoned").is_empty());
    }

    #[tokio::test]
    async fn test_target_listed_as_feature_is_rejected() {
        let file = write_csv();
        let provider = Arc::new(MockLlmProvider::new(
            r#"{"python_code": "x", "target_variable": "SalePrice", "features": ["SalePrice"]}"#,
        ));
        let worker = preparer(provider);
        let dataset = DatasetReference::from(file.path().to_path_buf());

        let result = worker.run(&dataset).await;

        assert!(matches!(
            result,
            Err(WorkerError::Inference(InferenceError::Exhausted { .. }))
        ));
    }

    #[test]
    fn test_dataset_name_with_braces_is_not_expanded() {
        let worker = preparer(Arc::new(MockLlmProvider::new(VALID_RESPONSE)));
        let summary = CsvAnalyzer::new()
            .summarize_str("x.csv", "LotArea,SalePrice\n8450,208500\n")
            .expect("valid csv");
        let request = PreparationRequest {
            dataset: DatasetReference::new("exports/{summary}.csv"),
            summary,
        };

        let prompt = worker.format_prompt(&request);

        assert!(prompt.starts_with("Dataset: exports/{summary}.csv\n"));
        assert_eq!(prompt.matches("\"numerical_stats\"").count(), 1);
    }
}
