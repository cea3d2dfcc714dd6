//! Typed values exchanged between workers and the orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Target variable and ordered feature list, fixed for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanSchema {
    target: String,
    features: Vec<String>,
}

impl CleanSchema {
    pub fn new(target: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            target: target.into(),
            features,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Checks the invariants every schema handed to the Modeler must hold.
    pub fn validate(&self) -> Result<(), String> {
        if self.target.trim().is_empty() {
            return Err("target variable is empty".to_string());
        }
        if self.features.is_empty() {
            return Err("feature list is empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for feature in &self.features {
            if feature.trim().is_empty() {
                return Err("feature list contains an empty name".to_string());
            }
            if feature == &self.target {
                return Err(format!("target '{}' is also listed as a feature", feature));
            }
            if !seen.insert(feature.as_str()) {
                return Err(format!("feature '{}' is listed more than once", feature));
            }
        }
        Ok(())
    }
}

/// Everything the Preparer produces: the schema plus generation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedData {
    pub schema: CleanSchema,
    /// Generated cleaning script.
    pub cleaning_script: String,
    pub rationale: String,
}

/// One modeling attempt's output. Replaced wholesale by the next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub script: String,
    pub rationale: String,
    pub algorithm: String,
    /// Metric name → reported value.
    pub metrics: BTreeMap<String, f64>,
}

impl CandidateArtifact {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// The Critic's decision on one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub rationale: String,
    /// Ordered fixes; always empty on an approved verdict.
    pub suggested_fixes: Vec<String>,
    /// Whether the Critic's local leakage pre-check fired (advisory).
    #[serde(default)]
    pub leakage_flagged: bool,
}

impl Verdict {
    pub fn approve(rationale: impl Into<String>) -> Self {
        Self {
            approved: true,
            rationale: rationale.into(),
            suggested_fixes: Vec::new(),
            leakage_flagged: false,
        }
    }

    pub fn reject(rationale: impl Into<String>, suggested_fixes: Vec<String>) -> Self {
        Self {
            approved: false,
            rationale: rationale.into(),
            suggested_fixes,
            leakage_flagged: false,
        }
    }

    /// Records the outcome of the leakage pre-check.
    pub fn with_leakage_flag(mut self, flagged: bool) -> Self {
        self.leakage_flagged = flagged;
        self
    }
}

/// Learning problem family chosen by the Modeler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Regression,
    Classification,
}

impl ProblemKind {
    /// Regression when any schema name mentions "Price", classification otherwise.
    pub fn for_schema(schema: &CleanSchema) -> Self {
        let mentions_price = std::iter::once(schema.target())
            .chain(schema.features().iter().map(String::as_str))
            .any(|name| name.contains("Price"));
        if mentions_price {
            ProblemKind::Regression
        } else {
            ProblemKind::Classification
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::Regression => f.write_str("Regression"),
            ProblemKind::Classification => f.write_str("Classification"),
        }
    }
}

/// Leakage suspicion derived from reported metrics. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakageRisk {
    High,
    WithinThresholds,
}

impl LeakageRisk {
    /// Accuracy above this is treated as suspicious.
    pub const ACCURACY_CEILING: f64 = 0.99;
    /// RMSE below this is treated as suspicious.
    pub const RMSE_FLOOR: f64 = 100.0;

    /// Flags `accuracy > 0.99` or `rmse < 100`.
    ///
    /// A missing accuracy reads as 0 and a missing rmse as 999999, so an
    /// absent metric never raises the flag on its own.
    pub fn assess(metrics: &BTreeMap<String, f64>) -> Self {
        let accuracy = metrics.get("accuracy").copied().unwrap_or(0.0);
        let rmse = metrics.get("rmse").copied().unwrap_or(999_999.0);
        if accuracy > Self::ACCURACY_CEILING || rmse < Self::RMSE_FLOOR {
            LeakageRisk::High
        } else {
            LeakageRisk::WithinThresholds
        }
    }

    pub fn is_flagged(self) -> bool {
        matches!(self, LeakageRisk::High)
    }

    /// Note passed to the critique prompt.
    pub fn advisory(self) -> &'static str {
        match self {
            LeakageRisk::High => "HIGH RISK OF TARGET LEAKAGE DETECTED.",
            LeakageRisk::WithinThresholds => "Metrics within statistical probability thresholds.",
        }
    }
}
