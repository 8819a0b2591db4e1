//! Forced single-function-call extraction contract.
//!
//! The reasoning engine is given exactly one function,
//! `add_proposal_to_database`, and is told it must call it. Everything
//! that is not exactly one well-formed call to that function is rejected:
//!
//! ```text
//! email text ──▶ render_prompt ──▶ ReasoningEngine::call_function
//!                                        │
//!                                        ▼
//!                             accept_single_call (0 / >1 / wrong name → error)
//!                                        │
//!                                        ▼
//!                             proposal_from_args (schema check, no coercion)
//!                                        │
//!                                        ▼
//!                                    Proposal
//! ```
//!
//! Transports (Gemini, OpenAI) implement [`ReasoningEngine`] and only move
//! bytes. The contract itself lives in [`ProposalExtractor`], so it is the
//! same for every backend and testable without a network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{EngineFailure, ExtractionError};
use crate::models::Proposal;

/// Name of the only function the engine may call.
pub const PROPOSAL_FUNCTION: &str = "add_proposal_to_database";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Text,
    Number,
    TextList,
}

impl ParamKind {
    fn schema_type(self) -> &'static str {
        match self {
            ParamKind::Text => "string",
            ParamKind::Number => "number",
            ParamKind::TextList => "array",
        }
    }
}

/// Parameter table for `add_proposal_to_database`. Drives both the schema
/// sent to the engine and the validation of what comes back.
const PARAMETERS: [(&str, ParamKind, &str); 8] = [
    (
        "supplier_name",
        ParamKind::Text,
        "Name of the supplier. Pass 'Unknown' if information is not provided.",
    ),
    (
        "contact_name",
        ParamKind::Text,
        "Name of the contact person. Pass 'Unknown' if information is not provided.",
    ),
    (
        "price_per_unit",
        ParamKind::Number,
        "Price per unit of goods (e.g. pound or ton) in any currency. Pass 0 if information is not provided.",
    ),
    (
        "price_currency",
        ParamKind::Text,
        "Currency of the price (USD, EUR, etc). Pass 'Unknown' if information is not provided.",
    ),
    (
        "minimum_order_quantity",
        ParamKind::Number,
        "Minimum order quantity. Pass 0 if information is not provided.",
    ),
    (
        "country_of_origin",
        ParamKind::Text,
        "Country of origin without state or city. Pass 'Unknown' if information is not provided.",
    ),
    (
        "payment_terms",
        ParamKind::Text,
        "Payment terms, for example 'Net 30' or 'Net 60'. Pass 'Unknown' if information is not provided.",
    ),
    (
        "certifications",
        ParamKind::TextList,
        "Array of certification names. Pass an empty array if none are mentioned.",
    ),
];

/// A function the engine is allowed to call, in JSON-schema form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One function invocation returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Builds the `add_proposal_to_database` declaration.
pub fn proposal_function() -> FunctionDeclaration {
    let mut properties = Map::new();
    for (name, kind, description) in PARAMETERS {
        let mut prop = json!({
            "type": kind.schema_type(),
            "description": description,
        });
        if kind == ParamKind::TextList {
            prop["items"] = json!({ "type": "string" });
        }
        properties.insert(name.to_string(), prop);
    }

    let required: Vec<&str> = PARAMETERS.iter().map(|(name, _, _)| *name).collect();

    FunctionDeclaration {
        name: PROPOSAL_FUNCTION.to_string(),
        description: "Add a proposal to the database.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Wraps the raw email body in the fixed extraction instructions.
pub fn render_prompt(email_text: &str) -> String {
    format!(
        "{}\n\n\
         Please add the proposal from this email to the database.\n\
         Fill every argument from the email content. Use 'Unknown' for text you \
         cannot determine, 0 for numbers you cannot determine, and an empty list \
         when no certifications are mentioned.",
        email_text.trim()
    )
}

/// Accepts exactly one call, and only to `expected`.
pub fn accept_single_call(
    calls: Vec<FunctionCall>,
    expected: &str,
) -> Result<FunctionCall, ExtractionError> {
    let count = calls.len();
    let mut calls = calls.into_iter();
    let call = match (calls.next(), count) {
        (None, _) => return Err(ExtractionError::NoCallMade),
        (Some(call), 1) => call,
        (Some(_), n) => return Err(ExtractionError::MultipleCalls(n)),
    };
    if call.name != expected {
        return Err(ExtractionError::UnexpectedFunction(call.name));
    }
    Ok(call)
}

/// Builds a [`Proposal`] from call arguments by exact field-name match.
///
/// Missing fields, extra fields, wrong JSON types, and negative quantities
/// are all [`ExtractionError::SchemaMismatch`]. Nothing is coerced: a price
/// of `"500"` is rejected just like a price of `"five hundred"`.
pub fn proposal_from_args(args: &Value) -> Result<Proposal, ExtractionError> {
    let obj = args.as_object().ok_or_else(|| {
        ExtractionError::SchemaMismatch(format!(
            "arguments must be an object, got {}",
            json_type_name(args)
        ))
    })?;

    let mut unexpected: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|key| !PARAMETERS.iter().any(|(name, _, _)| name == key))
        .collect();
    if !unexpected.is_empty() {
        unexpected.sort_unstable();
        return Err(ExtractionError::SchemaMismatch(format!(
            "unexpected field(s): {}",
            unexpected.join(", ")
        )));
    }

    for (name, kind, _) in PARAMETERS {
        let value = obj
            .get(name)
            .ok_or_else(|| ExtractionError::SchemaMismatch(format!("missing field: {}", name)))?;
        check_kind(name, kind, value)?;
    }

    serde_json::from_value(args.clone())
        .map_err(|e| ExtractionError::SchemaMismatch(e.to_string()))
}

fn check_kind(name: &str, kind: ParamKind, value: &Value) -> Result<(), ExtractionError> {
    let ok = match kind {
        ParamKind::Text => value.is_string(),
        ParamKind::Number => match value.as_f64() {
            Some(n) if n < 0.0 => {
                return Err(ExtractionError::SchemaMismatch(format!(
                    "{} must be non-negative, got {}",
                    name, n
                )))
            }
            Some(_) => true,
            None => false,
        },
        ParamKind::TextList => value
            .as_array()
            .map(|items| items.iter().all(Value::is_string))
            .unwrap_or(false),
    };
    if ok {
        Ok(())
    } else {
        let expected = match kind {
            ParamKind::TextList => "array of strings",
            other => other.schema_type(),
        };
        Err(ExtractionError::SchemaMismatch(format!(
            "{} must be of type '{}', got {}",
            name,
            expected,
            json_type_name(value)
        )))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A generative model that can be forced to call a declared function.
///
/// Implementations send `prompt` together with `function` in the engine's
/// forced tool-call mode and return every function call found in the
/// response, unvalidated. Failures are classified as [`EngineFailure`] so
/// that only transient ones are treated as retryable.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash-002"`).
    fn model_name(&self) -> &str;

    async fn call_function(
        &self,
        prompt: &str,
        function: &FunctionDeclaration,
    ) -> Result<Vec<FunctionCall>, EngineFailure>;
}

/// Turns raw email text into a [`Proposal`].
///
/// This is the capability the ingestion pipeline depends on. Tests
/// substitute a deterministic stub.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, email_text: &str) -> Result<Proposal, ExtractionError>;
}

/// [`Extractor`] that enforces the single-call contract over any
/// [`ReasoningEngine`]. One request per extraction, never retried here.
pub struct ProposalExtractor {
    engine: Arc<dyn ReasoningEngine>,
    function: FunctionDeclaration,
}

impl ProposalExtractor {
    pub fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            engine,
            function: proposal_function(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }
}

#[async_trait]
impl Extractor for ProposalExtractor {
    async fn extract(&self, email_text: &str) -> Result<Proposal, ExtractionError> {
        let prompt = render_prompt(email_text);
        let calls = self
            .engine
            .call_function(&prompt, &self.function)
            .await?;

        tracing::debug!(
            model = self.engine.model_name(),
            calls = calls.len(),
            "engine responded"
        );

        let call = accept_single_call(calls, &self.function.name)?;
        proposal_from_args(&call.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn valid_args() -> Value {
        json!({
            "supplier_name": "Sup Co",
            "contact_name": "Unknown",
            "price_per_unit": 500,
            "price_currency": "USD",
            "minimum_order_quantity": 10,
            "country_of_origin": "Brazil",
            "payment_terms": "Net 30",
            "certifications": []
        })
    }

    /// Engine double that replays a canned response and records prompts.
    struct ScriptedEngine {
        response: Mutex<Option<Result<Vec<FunctionCall>, EngineFailure>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        fn new(response: Result<Vec<FunctionCall>, EngineFailure>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReasoningEngine for ScriptedEngine {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn call_function(
            &self,
            prompt: &str,
            function: &FunctionDeclaration,
        ) -> Result<Vec<FunctionCall>, EngineFailure> {
            assert_eq!(function.name, PROPOSAL_FUNCTION);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("engine called more than once")
        }
    }

    #[test]
    fn test_declaration_requires_every_field() {
        let decl = proposal_function();
        assert_eq!(decl.name, "add_proposal_to_database");
        let required: Vec<&str> = decl.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, Proposal::FIELDS.to_vec());
        assert_eq!(
            decl.parameters["properties"]["certifications"]["items"]["type"],
            "string"
        );
        assert_eq!(
            decl.parameters["properties"]["price_per_unit"]["type"],
            "number"
        );
    }

    #[test]
    fn test_every_text_field_describes_unknown_policy() {
        let decl = proposal_function();
        for (name, prop) in decl.parameters["properties"].as_object().unwrap() {
            let description = prop["description"].as_str().unwrap();
            match prop["type"].as_str().unwrap() {
                "string" => assert!(description.contains("'Unknown'"), "{}", name),
                "number" => assert!(description.contains("Pass 0"), "{}", name),
                _ => assert!(description.contains("empty array"), "{}", name),
            }
        }
    }

    #[test]
    fn test_prompt_wraps_email() {
        let prompt = render_prompt("  We offer steel at $500/ton.\n");
        assert!(prompt.starts_with("We offer steel at $500/ton.\n\n"));
        assert!(prompt.contains("Please add the proposal from this email to the database."));
    }

    #[test]
    fn test_accept_single_call() {
        let call = FunctionCall::new(PROPOSAL_FUNCTION, valid_args());
        assert_eq!(
            accept_single_call(vec![call.clone()], PROPOSAL_FUNCTION).unwrap(),
            call
        );
        assert_eq!(
            accept_single_call(vec![], PROPOSAL_FUNCTION),
            Err(ExtractionError::NoCallMade)
        );
        assert_eq!(
            accept_single_call(vec![call.clone(), call], PROPOSAL_FUNCTION),
            Err(ExtractionError::MultipleCalls(2))
        );
        assert_eq!(
            accept_single_call(
                vec![FunctionCall::new("delete_database", json!({}))],
                PROPOSAL_FUNCTION
            ),
            Err(ExtractionError::UnexpectedFunction("delete_database".into()))
        );
    }

    #[test]
    fn test_proposal_from_valid_args() {
        let proposal = proposal_from_args(&valid_args()).unwrap();
        assert_eq!(proposal.supplier_name, "Sup Co");
        assert_eq!(proposal.price_per_unit, 500.0);
        assert_eq!(proposal.minimum_order_quantity, 10.0);
        assert!(proposal.certifications.is_empty());
    }

    #[test]
    fn test_zero_is_accepted_as_unknown_number() {
        let mut args = valid_args();
        args["price_per_unit"] = json!(0);
        args["minimum_order_quantity"] = json!(0.0);
        let proposal = proposal_from_args(&args).unwrap();
        assert_eq!(proposal.price_per_unit, 0.0);
        assert_eq!(proposal.minimum_order_quantity, 0.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut args = valid_args();
        args.as_object_mut().unwrap().remove("payment_terms");
        let err = proposal_from_args(&args).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::SchemaMismatch("missing field: payment_terms".into())
        );
    }

    #[test]
    fn test_extra_field_rejected() {
        let mut args = valid_args();
        args["discount"] = json!("5%");
        let err = proposal_from_args(&args).unwrap_err();
        assert!(err.to_string().contains("unexpected field(s): discount"));
    }

    #[test]
    fn test_numeric_string_not_coerced() {
        let mut args = valid_args();
        args["price_per_unit"] = json!("500");
        let err = proposal_from_args(&args).unwrap_err();
        assert!(err
            .to_string()
            .contains("price_per_unit must be of type 'number', got string"));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut args = valid_args();
        args["minimum_order_quantity"] = json!(-3);
        let err = proposal_from_args(&args).unwrap_err();
        assert!(err.to_string().contains("must be non-negative"));
    }

    #[test]
    fn test_certifications_must_be_strings() {
        let mut args = valid_args();
        args["certifications"] = json!(["ISO 9001", 14001]);
        assert!(matches!(
            proposal_from_args(&args),
            Err(ExtractionError::SchemaMismatch(_))
        ));
        args["certifications"] = json!("ISO 9001");
        assert!(matches!(
            proposal_from_args(&args),
            Err(ExtractionError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_non_object_args_rejected() {
        let err = proposal_from_args(&json!("{\"supplier_name\": 1}")).unwrap_err();
        assert!(err.to_string().contains("must be an object, got string"));
    }

    #[tokio::test]
    async fn test_extractor_happy_path() {
        let engine = ScriptedEngine::new(Ok(vec![FunctionCall::new(
            PROPOSAL_FUNCTION,
            valid_args(),
        )]));
        let extractor = ProposalExtractor::new(engine.clone());
        let proposal = extractor
            .extract("We offer steel at $500/ton, Net 30")
            .await
            .unwrap();
        assert_eq!(proposal.payment_terms, "Net 30");

        let prompts = engine.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("We offer steel at $500/ton, Net 30"));
    }

    #[tokio::test]
    async fn test_extractor_maps_engine_failure() {
        let engine = ScriptedEngine::new(Err(EngineFailure::Unavailable("connection reset".into())));
        let extractor = ProposalExtractor::new(engine);
        let err = extractor.extract("text").await.unwrap_err();
        assert_eq!(err, ExtractionError::EngineError("connection reset".into()));
    }

    #[tokio::test]
    async fn test_extractor_maps_rejected_request() {
        let engine = ScriptedEngine::new(Err(EngineFailure::Rejected(
            "Gemini API error 401 Unauthorized".into(),
        )));
        let extractor = ProposalExtractor::new(engine);
        let err = extractor.extract("text").await.unwrap_err();
        assert_eq!(
            err,
            ExtractionError::EngineRejected("Gemini API error 401 Unauthorized".into())
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_extractor_rejects_two_calls() {
        let call = FunctionCall::new(PROPOSAL_FUNCTION, valid_args());
        let engine = ScriptedEngine::new(Ok(vec![call.clone(), call]));
        let extractor = ProposalExtractor::new(engine);
        assert_eq!(
            extractor.extract("text").await.unwrap_err(),
            ExtractionError::MultipleCalls(2)
        );
    }
}
