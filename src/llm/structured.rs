//! Structured inference: prompt in, typed and validated value out.
//!
//! Workers describe the shape they expect by implementing [`StructuredOutput`]
//! on a `Deserialize` type. [`StructuredInference::infer`] asks the provider
//! for a JSON object, extracts it from whatever prose surrounds it, decodes
//! it and runs the type's own structural checks. Decoding or validation
//! failures are retried up to `max_attempts`; transport errors are not (the
//! provider already retries those).

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::types::{GenerationRequest, LlmProvider, Message};
use crate::error::InferenceError;
use crate::utils::json_extraction::{try_extract_json_object, JsonExtractionResult};

/// A value the model is asked to produce as a JSON object.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Name used in prompts, logs and errors.
    const SCHEMA: &'static str;

    /// Structural checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Sampling and retry settings for structured inference.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSettings {
    /// Model identifier; empty uses the provider default.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Attempts per call before giving up on a malformed response.
    pub max_attempts: u32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.2,
            max_tokens: 4000,
            max_attempts: 3,
        }
    }
}

/// A prompt pair destined for one structured call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub system: String,
    pub user: String,
}

impl InferenceRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Inference collaborator shared by all workers.
#[derive(Clone)]
pub struct StructuredInference {
    provider: Arc<dyn LlmProvider>,
    settings: InferenceSettings,
}

impl std::fmt::Debug for StructuredInference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredInference")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StructuredInference {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: InferenceSettings) -> Self {
        Self { provider, settings }
    }

    pub fn with_defaults(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, InferenceSettings::default())
    }

    pub fn settings(&self) -> &InferenceSettings {
        &self.settings
    }

    /// Produces a validated `T` for the given prompt.
    ///
    /// # Errors
    ///
    /// - `InferenceError::Transport` when the provider fails outright.
    /// - `InferenceError::Exhausted` when every attempt returned content that
    ///   could not be decoded into a valid `T`.
    pub async fn infer<T: StructuredOutput>(
        &self,
        request: &InferenceRequest,
    ) -> Result<T, InferenceError> {
        let attempts = self.settings.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.attempt::<T>(request).await {
                Ok(value) => return Ok(value),
                Err(InferenceError::Transport(err)) => return Err(InferenceError::Transport(err)),
                Err(err) => {
                    tracing::warn!(
                        schema = T::SCHEMA,
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %err,
                        "Structured response rejected, retrying"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(InferenceError::Exhausted {
            schema: T::SCHEMA.to_string(),
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    async fn attempt<T: StructuredOutput>(
        &self,
        request: &InferenceRequest,
    ) -> Result<T, InferenceError> {
        let generation = GenerationRequest::new(
            self.settings.model.clone(),
            vec![
                Message::system(request.system.clone()),
                Message::user(request.user.clone()),
            ],
        )
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens)
        .with_json_mode();

        let response = self.provider.generate(generation).await?;
        let content = response
            .first_content()
            .filter(|c| !c.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)?;

        decode::<T>(content)
    }
}

/// Extracts, decodes and validates a `T` from raw model output.
pub fn decode<T: StructuredOutput>(content: &str) -> Result<T, InferenceError> {
    let invalid = |reason: String| InferenceError::InvalidStructure {
        schema: T::SCHEMA.to_string(),
        reason,
    };

    let json = match try_extract_json_object(content) {
        JsonExtractionResult::Success(json) => json,
        JsonExtractionResult::Truncated {
            unclosed_braces, ..
        } => {
            return Err(invalid(format!(
                "JSON appears truncated ({} unclosed braces)",
                unclosed_braces
            )))
        }
        JsonExtractionResult::NotFound => {
            let preview: String = content.trim().chars().take(80).collect();
            return Err(invalid(format!("no JSON object found, content starts with '{}'", preview)));
        }
    };

    let value: T = serde_json::from_str(&json).map_err(|e| invalid(e.to_string()))?;
    value.validate().map_err(invalid)?;
    Ok(value)
}
