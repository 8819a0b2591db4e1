//! Reasoning engine transports and the extractor factory.
//!
//! Each transport implements [`ReasoningEngine`] for one hosted API and
//! does nothing beyond sending the prompt with the forced function
//! declaration and collecting the function calls from the response. The
//! single-call contract and argument validation are applied on top by
//! [`ProposalExtractor`].
//!
//! # Providers
//!
//! | `langmodel.provider` | Engine | API key variable |
//! |----------------------|--------|------------------|
//! | `"gemini"` | [`GeminiEngine`] | `GEMINI_API_KEY` |
//! | `"openai"` | [`OpenAIEngine`] | `OPENAI_API_KEY` |
//!
//! # Retry Policy
//!
//! Extraction is never retried by default. With `langmodel.max_retries > 0`
//! the extractor is wrapped in a [`RetryingExtractor`], which retries
//! engine-unavailable failures only, with exponential backoff
//! (1s, 2s, 4s, ... capped at 32s).

pub mod gemini;
pub mod openai;
pub mod retry;

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;

use rfp_intake_core::error::EngineFailure;
use rfp_intake_core::extraction::{Extractor, ProposalExtractor, ReasoningEngine};

use crate::config::LangModelConfig;

pub use gemini::GeminiEngine;
pub use openai::OpenAIEngine;
pub use retry::RetryingExtractor;

/// Create the [`ReasoningEngine`] named by `langmodel.provider`.
pub fn create_engine(config: &LangModelConfig) -> Result<Arc<dyn ReasoningEngine>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiEngine::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIEngine::new(config)?)),
        other => bail!("Unknown langmodel provider: {}", other),
    }
}

/// Create the proposal [`Extractor`], with the configured retry policy.
pub fn create_extractor(config: &LangModelConfig) -> Result<Arc<dyn Extractor>> {
    let engine = create_engine(config)?;
    Ok(extractor_for(engine, config.max_retries))
}

/// Wrap an engine in the single-call contract and, if requested, retries.
pub fn extractor_for(engine: Arc<dyn ReasoningEngine>, max_retries: u32) -> Arc<dyn Extractor> {
    let extractor: Arc<dyn Extractor> = Arc::new(ProposalExtractor::new(engine));
    if max_retries == 0 {
        extractor
    } else {
        Arc::new(RetryingExtractor::new(extractor, max_retries))
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Send a prepared request and decode the JSON body of a 2xx response.
///
/// Network errors, 429 and 5xx are [`EngineFailure::Unavailable`]. Any
/// other non-2xx status is [`EngineFailure::Rejected`] and is not worth
/// retrying. A 2xx body that is not JSON is [`EngineFailure::Malformed`].
async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> std::result::Result<serde_json::Value, EngineFailure> {
    let response = request
        .send()
        .await
        .map_err(|e| EngineFailure::Unavailable(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(EngineFailure::from_status(
            status.as_u16(),
            format!("{} API error {}: {}", provider, status, body_text),
        ));
    }

    response.json().await.map_err(|e| {
        if e.is_decode() {
            EngineFailure::Malformed(format!("{} returned a non-JSON body: {}", provider, e))
        } else {
            EngineFailure::Unavailable(format!("{} response body failed: {}", provider, e))
        }
    })
}

fn api_key(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| anyhow::anyhow!("{} environment variable not set", var))
}
