//! Error taxonomy for extraction, storage, and ingestion.
//!
//! [`ExtractionError`] is the tagged outcome of one extraction attempt,
//! [`StoreError`] covers a store write or read, and [`IngestError`] is what
//! the pipeline surfaces to its caller. Every ingestion failure maps to
//! exactly one of the four caller-visible kinds:
//!
//! | Kind | Source |
//! |------|--------|
//! | `extraction_failed` | no call, several calls, a call to another function, a rejected request, or an undecodable response |
//! | `validation_failed` | arguments do not match the proposal schema |
//! | `engine_unavailable` | transport or service failure reaching the engine |
//! | `persistence_failed` | store write unacknowledged or store unreachable |

use thiserror::Error;

use crate::ingest::IngestStage;

/// Why an extraction attempt did not produce a [`Proposal`](crate::models::Proposal).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    /// The engine answered without invoking the function.
    #[error("engine returned no function call")]
    NoCallMade,
    /// The engine invoked the function more than once.
    #[error("engine returned {0} function calls, expected exactly one")]
    MultipleCalls(usize),
    /// The engine invoked a function that was never declared.
    #[error("engine called undeclared function '{0}'")]
    UnexpectedFunction(String),
    /// The call arguments do not match the declared parameter schema.
    #[error("function arguments do not match schema: {0}")]
    SchemaMismatch(String),
    /// The engine could not be reached, was rate limited, or answered with a
    /// server error.
    #[error("reasoning engine error: {0}")]
    EngineError(String),
    /// The engine refused the request (bad key, unknown model, invalid argument).
    #[error("engine rejected the request: {0}")]
    EngineRejected(String),
    /// The engine answered with success but the body could not be decoded.
    #[error("engine returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl ExtractionError {
    /// Whether a caller-side retry policy may try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionError::EngineError(_))
    }
}

/// Failure reported by a [`ReasoningEngine`](crate::extraction::ReasoningEngine) transport.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineFailure {
    /// Network error, timeout, 429, or 5xx.
    #[error("{0}")]
    Unavailable(String),
    /// Any other non-success status.
    #[error("{0}")]
    Rejected(String),
    /// A success status with a body that is not the expected JSON.
    #[error("{0}")]
    Malformed(String),
}

impl EngineFailure {
    /// Classify a non-success HTTP status. Only 429 and 5xx are transient.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if status == 429 || (500..600).contains(&status) {
            EngineFailure::Unavailable(message.into())
        } else {
            EngineFailure::Rejected(message.into())
        }
    }
}

impl From<EngineFailure> for ExtractionError {
    fn from(err: EngineFailure) -> Self {
        match err {
            EngineFailure::Unavailable(msg) => ExtractionError::EngineError(msg),
            EngineFailure::Rejected(msg) => ExtractionError::EngineRejected(msg),
            EngineFailure::Malformed(msg) => ExtractionError::MalformedResponse(msg),
        }
    }
}

/// A store operation that did not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The backend reported a row count other than one for a single-row insert.
    #[error("write to {table} not acknowledged ({rows_affected} rows affected)")]
    Unacknowledged {
        table: &'static str,
        rows_affected: u64,
    },
    /// The backend failed the statement or could not be reached.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    /// Returns an error unless exactly one row was written.
    pub fn check_single_row(table: &'static str, rows_affected: u64) -> Result<(), StoreError> {
        if rows_affected == 1 {
            Ok(())
        } else {
            Err(StoreError::Unacknowledged {
                table,
                rows_affected,
            })
        }
    }
}

/// Caller-visible failure of one ingestion request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    #[error("reasoning engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("persistence failed: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl IngestError {
    /// Stable machine-readable code for the boundary layer.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::ExtractionFailure(_) => "extraction_failed",
            IngestError::ValidationFailure(_) => "validation_failed",
            IngestError::EngineUnavailable(_) => "engine_unavailable",
            IngestError::PersistenceFailure(_) => "persistence_failed",
        }
    }

    /// The pipeline stage the request was in when it failed.
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::PersistenceFailure(_) => IngestStage::Persisting,
            _ => IngestStage::Extracting,
        }
    }
}

impl From<ExtractionError> for IngestError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::SchemaMismatch(msg) => IngestError::ValidationFailure(msg),
            ExtractionError::EngineError(msg) => IngestError::EngineUnavailable(msg),
            other => IngestError::ExtractionFailure(other.to_string()),
        }
    }
}
