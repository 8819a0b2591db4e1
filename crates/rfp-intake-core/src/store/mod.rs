//! Storage abstraction for suppliers and proposals.
//!
//! The [`Store`] trait defines the two independent logical tables the
//! pipeline needs, enabling pluggable backends (PostgreSQL, SQLite,
//! in-memory). Implementations must be `Send + Sync` to be shared across
//! request tasks.
//!
//! # Semantics
//!
//! | Method | Behavior |
//! |--------|----------|
//! | [`register_supplier`](Store::register_supplier) | Appends a row; never updates in place |
//! | [`list_suppliers`](Store::list_suppliers) | One row per email: the one with the highest id |
//! | [`record_proposal`](Store::record_proposal) | Appends one immutable row |
//! | [`list_proposals_for_rfp`](Store::list_proposals_for_rfp) | All rows for an RFP, in insertion order |
//!
//! Supplier registration is a soft update: older rows for the same email
//! remain stored, they are only hidden from [`list_suppliers`](Store::list_suppliers).
//!
//! Each call commits on its own. There is no transaction spanning a
//! supplier write and a proposal write.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Proposal, ProposalRecord, Supplier};

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract storage backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create tables and indexes if absent. Safe to call on an initialized store.
    async fn initialize_schema(&self) -> StoreResult<()>;

    /// Append a supplier row.
    ///
    /// Fails with [`StoreError::Unacknowledged`] unless the backend reports
    /// exactly one row written.
    async fn register_supplier(&self, supplier: &Supplier) -> StoreResult<()>;

    /// The current supplier view: the most recently inserted row per email.
    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>>;

    /// Append one proposal row, storing `from_address` as `supplier_email`.
    async fn record_proposal(
        &self,
        proposal: &Proposal,
        rfp_name: &str,
        from_address: &str,
    ) -> StoreResult<()>;

    /// All proposals recorded for `rfp_name`. An unknown RFP yields an empty list.
    async fn list_proposals_for_rfp(&self, rfp_name: &str) -> StoreResult<Vec<ProposalRecord>>;

    /// Release pooled connections. Called once at shutdown.
    async fn close(&self) {}
}
