//! Configuration for the cleaning and modeling pipeline.
//!
//! Values come from three places, in increasing priority: defaults,
//! `FORGE_*` / `LITELLM_*` environment variables, and CLI flags applied
//! through the builder methods.

use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{InferenceSettings, DEFAULT_API_BASE, DEFAULT_MODEL};

/// Default number of re-attempts after the first rejected candidate.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default exponential base for the backoff between attempts.
pub const DEFAULT_BACKOFF_BASE: u32 = 2;
/// Default wall-clock length of one backoff unit.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Retry and backoff settings for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Rejections tolerated before giving up. `0` means a single attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff (`base^retries` units).
    pub backoff_base: u32,
    /// Length of one backoff unit.
    pub backoff_unit: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry ceiling.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff base.
    pub fn with_backoff_base(mut self, base: u32) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the length of one backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_base == 0 {
            return Err(ConfigError::ValidationFailed(
                "backoff_base must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection and generation settings for the LLM backend.
#[derive(Clone)]
pub struct LlmSettings {
    /// OpenAI-compatible endpoint.
    pub api_base: String,
    /// Bearer token, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// How many times a structurally invalid answer is re-requested.
    pub parse_attempts: u32,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("parse_attempts", &self.parse_attempts)
            .finish()
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        let inference = InferenceSettings::default();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: inference.temperature,
            max_tokens: inference.max_tokens,
            parse_attempts: inference.max_attempts,
        }
    }
}

impl LlmSettings {
    /// Settings for the structured inference layer.
    pub fn inference_settings(&self) -> InferenceSettings {
        InferenceSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_attempts: self.parse_attempts,
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base must not be empty".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model must not be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        if self.parse_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "parse_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a run needs, loaded in one place.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub orchestrator: OrchestratorConfig,
    pub llm: LlmSettings,
}

impl RunSettings {
    /// Loads settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `FORGE_MAX_RETRIES`: retry ceiling (default: 5)
    /// - `FORGE_BACKOFF_BASE`: exponential base (default: 2)
    /// - `FORGE_BACKOFF_UNIT_MS`: length of one backoff unit (default: 1000)
    /// - `FORGE_MODEL`: model identifier
    /// - `FORGE_TEMPERATURE`: sampling temperature (default: 0.2)
    /// - `FORGE_MAX_TOKENS`: completion limit (default: 4000)
    /// - `FORGE_PARSE_ATTEMPTS`: structured-output attempts (default: 3)
    /// - `LITELLM_API_BASE`: endpoint (default: OpenRouter)
    /// - `LITELLM_API_KEY` or `OPENROUTER_API_KEY`: bearer token
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(val) = lookup("FORGE_MAX_RETRIES") {
            settings.orchestrator.max_retries = parse_env_value(&val, "FORGE_MAX_RETRIES")?;
        }
        if let Some(val) = lookup("FORGE_BACKOFF_BASE") {
            settings.orchestrator.backoff_base = parse_env_value(&val, "FORGE_BACKOFF_BASE")?;
        }
        if let Some(val) = lookup("FORGE_BACKOFF_UNIT_MS") {
            let millis: u64 = parse_env_value(&val, "FORGE_BACKOFF_UNIT_MS")?;
            settings.orchestrator.backoff_unit = Duration::from_millis(millis);
        }

        if let Some(val) = lookup("LITELLM_API_BASE") {
            settings.llm.api_base = val;
        }
        settings.llm.api_key = lookup("LITELLM_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY"));
        if let Some(val) = lookup("FORGE_MODEL") {
            settings.llm.model = val;
        }
        if let Some(val) = lookup("FORGE_TEMPERATURE") {
            settings.llm.temperature = parse_env_value(&val, "FORGE_TEMPERATURE")?;
        }
        if let Some(val) = lookup("FORGE_MAX_TOKENS") {
            settings.llm.max_tokens = parse_env_value(&val, "FORGE_MAX_TOKENS")?;
        }
        if let Some(val) = lookup("FORGE_PARSE_ATTEMPTS") {
            settings.llm.parse_attempts = parse_env_value(&val, "FORGE_PARSE_ATTEMPTS")?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validates both halves of the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orchestrator.validate()?;
        self.llm.validate()
    }
}

/// Parse an environment variable value to the target type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
