#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Station analysis backed by hosted LLM providers.
//!
//! Supports Google Gemini (with Google Search grounding), Anthropic Claude,
//! and `OpenAI` or any `OpenAI`-compatible server (Ollama, vLLM, LM Studio)
//! via the `AI_BASE_URL` environment variable. The [`analysis`] module
//! turns one station plus a viewer role into an [`AnalysisResult`]; the
//! dashboard shows that result as-is and never interprets it.

pub mod analysis;
pub mod providers;

pub use analysis::{
    AnalysisResult, Analyzer, Confidence, GroundingLink, LlmAnalyzer, NewsItem, Recommendation,
    RecommendationKind, SourceAttribution,
};

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The model answered, but not with a usable analysis.
    #[error("Malformed analysis: {message}")]
    Malformed {
        /// Description of what was wrong with the answer.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
