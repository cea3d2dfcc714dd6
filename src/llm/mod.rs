//! LLM integration for ds-forge.
//!
//! The inference collaborator is split in two layers:
//!
//! - [`LlmProvider`] is the transport seam: a chat request in, raw text out.
//!   [`ChatClient`] implements it for OpenAI-compatible endpoints (LiteLLM,
//!   OpenRouter, vLLM, ...). Tests implement it directly.
//! - [`StructuredInference`] sits on top and turns raw text into a typed,
//!   structurally validated value with its own bounded retry policy.
//!
//! ```ignore
//! use std::sync::Arc;
//! use ds_forge::llm::{ChatClient, StructuredInference, DEFAULT_API_BASE, DEFAULT_MODEL};
//!
//! let client = ChatClient::new(DEFAULT_API_BASE, Some(api_key), DEFAULT_MODEL)?;
//! let inference = StructuredInference::with_defaults(Arc::new(client));
//! ```

pub mod client;
pub mod structured;
pub mod types;

pub use client::{ChatClient, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use structured::{
    InferenceRequest, InferenceSettings, StructuredInference, StructuredOutput,
};
pub use types::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
