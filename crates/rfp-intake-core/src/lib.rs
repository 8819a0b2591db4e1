//! # RFP Intake Core
//!
//! Shared, runtime-neutral logic for RFP Intake: data models, the
//! forced-function-call extraction contract, the store abstraction, and the
//! ingestion pipeline that composes them.
//!
//! This crate contains no tokio, sqlx, HTTP client, or other I/O
//! dependencies. Concrete reasoning engines and databases live in the
//! `rfp-intake` application crate and plug in through the
//! [`extraction::ReasoningEngine`] and [`store::Store`] traits.

pub mod error;
pub mod extraction;
pub mod ingest;
pub mod models;
pub mod store;

pub use error::IngestError;
pub use extraction::{Extractor, ProposalExtractor, ReasoningEngine};
pub use ingest::{IngestStage, IngestionPipeline};
pub use models::{Proposal, ProposalEmail, ProposalRecord, Supplier};
pub use store::Store;
