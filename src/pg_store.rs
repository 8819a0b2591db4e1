//! PostgreSQL-backed [`Store`] implementation.
//!
//! Surrogate ids are `BIGSERIAL`. Prices and quantities are
//! `DOUBLE PRECISION` and certifications a native `TEXT[]`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use rfp_intake_core::error::StoreError;
use rfp_intake_core::models::{Proposal, ProposalRecord, Supplier};
use rfp_intake_core::store::{Store, StoreResult};

/// PostgreSQL implementation of the [`Store`] trait.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> Result<ProposalRecord, sqlx::Error> {
    Ok(ProposalRecord {
        rfp_name: row.try_get("rfp_name")?,
        supplier_email: row.try_get("supplier_email")?,
        proposal: Proposal {
            supplier_name: row.try_get("supplier_name")?,
            contact_name: row.try_get("contact_name")?,
            price_per_unit: row.try_get("price_per_unit")?,
            price_currency: row.try_get("price_currency")?,
            minimum_order_quantity: row.try_get("minimum_order_quantity")?,
            country_of_origin: row.try_get("country_of_origin")?,
            payment_terms: row.try_get("payment_terms")?,
            certifications: row.try_get("certifications")?,
        },
    })
}

#[async_trait]
impl Store for PgStore {
    async fn initialize_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS suppliers (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email VARCHAR(255) NOT NULL,
                address TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS proposals (
                id BIGSERIAL PRIMARY KEY,
                rfp_name TEXT NOT NULL,
                supplier_email VARCHAR(255) NOT NULL,
                supplier_name TEXT NOT NULL,
                contact_name TEXT NOT NULL,
                price_per_unit DOUBLE PRECISION NOT NULL DEFAULT 0,
                price_currency TEXT NOT NULL,
                minimum_order_quantity DOUBLE PRECISION NOT NULL DEFAULT 0,
                country_of_origin TEXT NOT NULL,
                payment_terms TEXT NOT NULL,
                certifications TEXT[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_suppliers_email ON suppliers(email, id DESC)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_proposals_rfp_name ON proposals(rfp_name)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn register_supplier(&self, supplier: &Supplier) -> StoreResult<()> {
        let result = sqlx::query("INSERT INTO suppliers (name, email, address) VALUES ($1, $2, $3)")
            .bind(&supplier.name)
            .bind(&supplier.email)
            .bind(&supplier.address)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        StoreError::check_single_row("suppliers", result.rows_affected())
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        // DISTINCT ON keeps the first row of each email group, i.e. the highest id.
        let rows = sqlx::query(
            r#"
            SELECT name, email, address FROM (
                SELECT DISTINCT ON (email) id, name, email, address
                FROM suppliers
                ORDER BY email, id DESC
            ) latest
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter()
            .map(|row| -> Result<Supplier, sqlx::Error> {
                Ok(Supplier {
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    address: row.try_get("address")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::backend)
    }

    async fn record_proposal(
        &self,
        proposal: &Proposal,
        rfp_name: &str,
        from_address: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO proposals (rfp_name, supplier_email, supplier_name, contact_name,
                                   price_per_unit, price_currency, minimum_order_quantity,
                                   country_of_origin, payment_terms, certifications)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(rfp_name)
        .bind(from_address)
        .bind(&proposal.supplier_name)
        .bind(&proposal.contact_name)
        .bind(proposal.price_per_unit)
        .bind(&proposal.price_currency)
        .bind(proposal.minimum_order_quantity)
        .bind(&proposal.country_of_origin)
        .bind(&proposal.payment_terms)
        .bind(&proposal.certifications)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        StoreError::check_single_row("proposals", result.rows_affected())
    }

    async fn list_proposals_for_rfp(&self, rfp_name: &str) -> StoreResult<Vec<ProposalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT rfp_name, supplier_email, supplier_name, contact_name, price_per_unit,
                   price_currency, minimum_order_quantity, country_of_origin, payment_terms,
                   certifications
            FROM proposals
            WHERE rfp_name = $1
            ORDER BY id
            "#,
        )
        .bind(rfp_name)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::backend)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
