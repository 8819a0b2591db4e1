//! # RFP Intake
//!
//! Ingests supplier proposal emails, extracts their commercial terms through
//! a forced single-function call to a reasoning engine, and stores the
//! validated result next to a supplier directory for retrieval by RFP name.
//!
//! ## Architecture
//!
//! ```text
//!                ┌────────────────────┐
//!  POST email ──▶│ IngestionPipeline  │
//!                └───┬────────────┬───┘
//!                    │            │
//!                    ▼            ▼
//!          ┌──────────────┐  ┌──────────────┐
//!          │  Extractor   │  │    Store     │
//!          │ Gemini/OpenAI│  │ Postgres/    │
//!          │ forced call  │  │ SQLite       │
//!          └──────────────┘  └──────────────┘
//! ```
//!
//! The pipeline, the extraction contract, and the store trait live in
//! `rfp-intake-core`. This crate adds the concrete engines and databases,
//! configuration, the HTTP server, and the `rfpd` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! rfpd init                          # create tables (idempotent)
//! rfpd extract ./email.txt           # dry-run extraction, nothing stored
//! rfpd serve                         # start HTTP server
//! rfpd proposals RFP-1               # list proposals for an RFP
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Store backend selection and connection pools |
//! | [`migrate`] | Idempotent schema creation |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`pg_store`] | PostgreSQL `Store` implementation |
//! | [`langmodel`] | Gemini and OpenAI engines, retry policy, extractor factory |
//! | [`server`] | HTTP API (Axum) |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod db;
pub mod langmodel;
pub mod logging;
pub mod migrate;
pub mod pg_store;
pub mod server;
pub mod sqlite_store;

pub use rfp_intake_core::{
    error, extraction, ingest, models, store, IngestError, IngestionPipeline, Proposal,
    ProposalEmail, ProposalRecord, Store, Supplier,
};
