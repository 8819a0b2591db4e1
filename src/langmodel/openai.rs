//! OpenAI chat completions transport.
//!
//! Calls `POST /v1/chat/completions` with the declaration as the only tool
//! and `tool_choice` naming it, so the model must answer with a tool call.
//! Tool call arguments arrive as a JSON-encoded string; a string that does
//! not parse is passed through as a JSON string value so the schema check
//! rejects it.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use rfp_intake_core::error::EngineFailure;
use rfp_intake_core::extraction::{FunctionCall, FunctionDeclaration, ReasoningEngine};

use crate::config::LangModelConfig;

use super::{api_key, http_client, send_json};

pub const DEFAULT_URL: &str = "https://api.openai.com";

/// Reasoning engine backed by the OpenAI API.
pub struct OpenAIEngine {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
}

impl OpenAIEngine {
    /// Create an engine from configuration, reading `OPENAI_API_KEY`.
    pub fn new(config: &LangModelConfig) -> Result<Self> {
        Self::with_api_key(config, api_key("OPENAI_API_KEY")?)
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
}

#[async_trait]
impl ReasoningEngine for OpenAIEngine {
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
            .post(format!("{}/v1/chat/completions", self.url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&build_request(&self.model, prompt, function));

        let json = send_json("OpenAI", request).await?;
        Ok(parse_response(&json))
    }
}

/// Build a chat completions body with a forced `tool_choice`.
pub fn build_request(model: &str, prompt: &str, function: &FunctionDeclaration) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "tools": [{ "type": "function", "function": function }],
        "tool_choice": { "type": "function", "function": { "name": function.name } },
    })
}

/// Collect the tool calls of the first choice.
pub fn parse_response(json: &Value) -> Vec<FunctionCall> {
    let tool_calls = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("tool_calls"))
        .and_then(|t| t.as_array());

    let Some(tool_calls) = tool_calls else {
        return Vec::new();
    };

    tool_calls
        .iter()
        .filter_map(|call| call.get("function"))
        .map(|function| {
            let name = function
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or_default();
            let args = match function.get("arguments") {
                Some(Value::String(raw)) => {
                    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
                }
                Some(other) => other.clone(),
                None => json!({}),
            };
            FunctionCall::new(name, args)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_intake_core::extraction::proposal_function;

    #[test]
    fn test_request_forces_tool_choice() {
        let body = build_request("gpt-4o-mini", "email text", &proposal_function());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["tool_choice"]["function"]["name"], "add_proposal_to_database");
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_parse_tool_call_arguments() {
        let json = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "add_proposal_to_database",
                            "arguments": "{\"supplier_name\":\"Sup Co\",\"price_per_unit\":500}"
                        }
                    }]
                }
            }]
        });
        let calls = parse_response(&json);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "add_proposal_to_database");
        assert_eq!(calls[0].args["price_per_unit"], 500);
    }

    #[test]
    fn test_malformed_arguments_pass_through_as_string() {
        let json = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": { "name": "add_proposal_to_database", "arguments": "{not json" }
                    }]
                }
            }]
        });
        let calls = parse_response(&json);
        assert_eq!(calls[0].args, Value::String("{not json".into()));
    }

    #[test]
    fn test_plain_message_yields_no_calls() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Sure!" } }]
        });
        assert!(parse_response(&json).is_empty());
    }
}
