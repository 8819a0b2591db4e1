//! Ingestion orchestration: extract, attach provenance, commit.
//!
//! Each request walks a fixed state machine and keeps no state afterwards:
//!
//! ```text
//! Received ──▶ Extracting ──▶ Extracted ──▶ Persisting ──▶ Committed
//!                  │                            │
//!                  ▼                            ▼
//!           ExtractionFailed              PersistFailed
//! ```
//!
//! Nothing is retried and nothing is rolled back. If the store write fails
//! after a successful extraction the email is dropped; ingestion is
//! at-most-once.

use std::fmt;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::error::IngestError;
use crate::extraction::Extractor;
use crate::models::{ProposalEmail, ProposalRecord};
use crate::store::Store;

/// Stage of one ingestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Extracting,
    Extracted,
    Persisting,
    Committed,
}

impl IngestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Extracting => "extracting",
            IngestStage::Extracted => "extracted",
            IngestStage::Persisting => "persisting",
            IngestStage::Committed => "committed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composes an [`Extractor`] and a [`Store`] into the ingestion flow.
///
/// Both collaborators are built once at startup and shared by every
/// request; the pipeline itself holds no mutable state.
#[derive(Clone)]
pub struct IngestionPipeline {
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn Store>,
}

impl IngestionPipeline {
    pub fn new(extractor: Arc<dyn Extractor>, store: Arc<dyn Store>) -> Self {
        Self { extractor, store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Ingest one proposal email and return the committed record.
    pub async fn ingest(&self, email: ProposalEmail) -> Result<ProposalRecord, IngestError> {
        let span = tracing::info_span!(
            "ingest",
            request_id = %Uuid::new_v4(),
            rfp_name = %email.rfp_name,
            from_address = %email.from_address,
        );
        self.run(email).instrument(span).await
    }

    async fn run(&self, email: ProposalEmail) -> Result<ProposalRecord, IngestError> {
        let ProposalEmail {
            rfp_name,
            from_address,
            text,
        } = email;
        tracing::debug!(stage = %IngestStage::Received, bytes = text.len());

        tracing::debug!(stage = %IngestStage::Extracting);
        let proposal = self.extractor.extract(&text).await.map_err(|e| {
            let err = IngestError::from(e);
            tracing::warn!(kind = err.kind(), error = %err, "extraction failed");
            err
        })?;
        drop(text);
        tracing::debug!(stage = %IngestStage::Extracted, supplier_name = %proposal.supplier_name);

        tracing::debug!(stage = %IngestStage::Persisting);
        self.store
            .record_proposal(&proposal, &rfp_name, &from_address)
            .await
            .map_err(|e| {
                let err = IngestError::from(e);
                tracing::warn!(kind = err.kind(), error = %err, "persist failed");
                err
            })?;

        tracing::info!(stage = %IngestStage::Committed, "proposal committed");
        Ok(ProposalRecord::new(proposal, &rfp_name, &from_address))
    }
}
