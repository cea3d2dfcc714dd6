//! Dataset handles and the statistical summary handed to the Preparer.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Opaque handle to a raw tabular input, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetReference(String);

impl DatasetReference {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets the handle as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for DatasetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PathBuf> for DatasetReference {
    fn from(value: PathBuf) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}

/// Descriptive statistics for one numeric column (pandas `describe` layout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

/// Row and column counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub columns: usize,
}

/// Statistical summary of a dataset, used only as prompt context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Inferred type per column (`int64`, `float64`, `bool`, `object`).
    pub dtypes: BTreeMap<String, String>,
    /// Missing-value count per column.
    pub missing_values: BTreeMap<String, usize>,
    pub shape: Shape,
    /// Statistics for numeric columns only.
    pub numerical_stats: BTreeMap<String, NumericStats>,
}

impl DataSummary {
    /// Total missing cells across all columns.
    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.numerical_stats.keys().map(String::as_str)
    }
}

/// Analysis collaborator: turns a dataset reference into a summary.
#[async_trait]
pub trait DatasetAnalyzer: Send + Sync {
    async fn summarize(&self, dataset: &DatasetReference) -> Result<DataSummary, AnalysisError>;
}
