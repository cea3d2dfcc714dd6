//! CSV-backed analysis collaborator.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;

use super::summary::{DataSummary, DatasetAnalyzer, DatasetReference, NumericStats, Shape};
use crate::error::AnalysisError;

/// Cell spellings treated as missing (compared case-insensitively).
const MISSING_MARKERS: &[&str] = &["", "na", "nan", "null", "none", "n/a"];

/// Summarizes a headered CSV file.
#[derive(Debug, Clone)]
pub struct CsvAnalyzer {
    delimiter: u8,
}

impl Default for CsvAnalyzer {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Summarizes CSV text already held in memory.
    pub fn summarize_str(&self, name: &str, data: &str) -> Result<DataSummary, AnalysisError> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(data.as_bytes());
        summarize_reader(name, reader)
    }
}

#[async_trait]
impl DatasetAnalyzer for CsvAnalyzer {
    async fn summarize(&self, dataset: &DatasetReference) -> Result<DataSummary, AnalysisError> {
        tracing::info!(dataset = %dataset, "Analyzing raw dataset");

        let data = tokio::fs::read_to_string(dataset.as_path())
            .await
            .map_err(|e| AnalysisError::Unreadable {
                dataset: dataset.to_string(),
                reason: e.to_string(),
            })?;

        let summary = self.summarize_str(dataset.as_str(), &data)?;
        tracing::info!(
            dataset = %dataset,
            rows = summary.shape.rows,
            columns = summary.shape.columns,
            "Generated statistical summary"
        );
        Ok(summary)
    }
}

fn summarize_reader<R: std::io::Read>(
    name: &str,
    mut reader: csv::Reader<R>,
) -> Result<DataSummary, AnalysisError> {
    let malformed = |e: csv::Error| AnalysisError::Malformed {
        dataset: name.to_string(),
        reason: e.to_string(),
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(AnalysisError::MissingHeader(name.to_string()));
    }
    let columns = dedupe_columns(headers.into_iter());

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); columns.len()];
    let mut rows = 0usize;
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        for (idx, value) in record.iter().enumerate() {
            let value = value.trim();
            let is_missing = MISSING_MARKERS
                .iter()
                .any(|marker| value.eq_ignore_ascii_case(marker));
            cells[idx].push((!is_missing).then(|| value.to_string()));
        }
        rows += 1;
    }
    if rows == 0 {
        return Err(AnalysisError::Empty(name.to_string()));
    }

    let mut dtypes = BTreeMap::new();
    let mut missing_values = BTreeMap::new();
    let mut numerical_stats = BTreeMap::new();

    for (column, values) in columns.iter().zip(&cells) {
        let present: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
        missing_values.insert(column.clone(), values.len() - present.len());

        let dtype = infer_dtype(&present);
        if matches!(dtype, "int64" | "float64") {
            let numbers: Vec<f64> = present.iter().filter_map(|v| v.parse().ok()).collect();
            if let Some(stats) = describe(&numbers) {
                numerical_stats.insert(column.clone(), stats);
            }
        }
        dtypes.insert(column.clone(), dtype.to_string());
    }

    Ok(DataSummary {
        shape: Shape {
            rows,
            columns: columns.len(),
        },
        columns,
        dtypes,
        missing_values,
        numerical_stats,
    })
}

/// Renames repeated header names to `name.1`, `name.2`, ... (pandas style)
/// so every per-column map keeps one entry per column.
fn dedupe_columns(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();

    raw.map(|name| {
        let mut candidate = name.clone();
        while seen.contains(&candidate) {
            let suffix = suffixes.entry(name.clone()).or_insert(0);
            *suffix += 1;
            candidate = format!("{}.{}", name, suffix);
        }
        seen.insert(candidate.clone());
        candidate
    })
    .collect()
}

fn infer_dtype(present: &[&str]) -> &'static str {
    if present.is_empty() {
        "object"
    } else if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        "int64"
    } else if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        "float64"
    } else if present
        .iter()
        .all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"))
    {
        "bool"
    } else {
        "object"
    }
}

/// Computes count/mean/std/min/quartiles/max over `values`.
pub fn describe(values: &[f64]) -> Option<NumericStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let variance =
            sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    });

    Some(NumericStats {
        count,
        mean,
        std,
        min: sorted[0],
        p25: quantile(&sorted, 0.25),
        p50: quantile(&sorted, 0.50),
        p75: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

/// Linear-interpolated quantile over pre-sorted, non-empty input.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
