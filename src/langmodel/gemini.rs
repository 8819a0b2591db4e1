//! Gemini `generateContent` transport.
//!
//! The declaration is sent as the only tool, and function calling is forced
//! with `toolConfig.functionCallingConfig.mode = "ANY"` restricted to that
//! one function name:
//!
//! ```json
//! {
//!   "contents": [{ "role": "user", "parts": [{ "text": "..." }] }],
//!   "tools": [{ "functionDeclarations": [{ "name": "add_proposal_to_database", ... }] }],
//!   "toolConfig": {
//!     "functionCallingConfig": {
//!       "mode": "ANY",
//!       "allowedFunctionNames": ["add_proposal_to_database"]
//!     }
//!   }
//! }
//! ```
//!
//! Function calls are read from the parts of the first candidate.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use rfp_intake_core::error::EngineFailure;
use rfp_intake_core::extraction::{FunctionCall, FunctionDeclaration, ReasoningEngine};

use crate::config::LangModelConfig;

use super::{api_key, http_client, send_json};

pub const DEFAULT_URL: &str = "https://generativelanguage.googleapis.com";

/// Reasoning engine backed by the Gemini API.
pub struct GeminiEngine {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
}

impl GeminiEngine {
    /// Create an engine from configuration, reading `GEMINI_API_KEY`.
    pub fn new(config: &LangModelConfig) -> Result<Self> {
        Self::with_api_key(config, api_key("GEMINI_API_KEY")?)
    }

    pub fn with_api_key(config: &LangModelConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            model: config.version.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.url, self.model)
    }
}

#[async_trait]
impl ReasoningEngine for GeminiEngine {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn call_function(
        &self,
        prompt: &str,
        function: &FunctionDeclaration,
    ) -> std::result::Result<Vec<FunctionCall>, EngineFailure> {
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt, function));

        let json = send_json("Gemini", request).await?;
        Ok(parse_response(&json))
    }
}

/// Build a forced-call `generateContent` request body.
pub fn build_request(prompt: &str, function: &FunctionDeclaration) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "tools": [{
            "functionDeclarations": [function],
        }],
        "toolConfig": {
            "functionCallingConfig": {
                "mode": "ANY",
                "allowedFunctionNames": [function.name],
            },
        },
    })
}

/// Collect the function calls of the first candidate.
///
/// A response without candidates (e.g. a blocked prompt) yields no calls.
/// A call without `args` gets an empty argument object, which fails
/// schema validation downstream instead of here.
pub fn parse_response(json: &Value) -> Vec<FunctionCall> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let Some(parts) = parts else {
        return Vec::new();
    };

    parts
        .iter()
        .filter_map(|part| part.get("functionCall"))
        .map(|call| {
            FunctionCall::new(
                call.get("name").and_then(|n| n.as_str()).unwrap_or_default(),
                call.get("args").cloned().unwrap_or_else(|| json!({})),
            )
        })
        .collect()
}
