//! In-memory [`Store`] implementation for tests and dry runs.
//!
//! Rows live in `Vec`s behind `std::sync::RwLock`. Vector position is the
//! surrogate id, so "latest per email" is the last matching position.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Proposal, ProposalRecord, Supplier};

use super::{Store, StoreResult};

/// In-memory store. Every row ever written is kept.
pub struct InMemoryStore {
    suppliers: RwLock<Vec<Supplier>>,
    proposals: RwLock<Vec<ProposalRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            suppliers: RwLock::new(Vec::new()),
            proposals: RwLock::new(Vec::new()),
        }
    }

    /// Number of supplier rows, including superseded ones.
    pub fn supplier_row_count(&self) -> StoreResult<usize> {
        Ok(self.suppliers.read().map_err(poisoned)?.len())
    }

    /// Number of proposal rows across all RFPs.
    pub fn proposal_row_count(&self) -> StoreResult<usize> {
        Ok(self.proposals.read().map_err(poisoned)?.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn initialize_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn register_supplier(&self, supplier: &Supplier) -> StoreResult<()> {
        let mut rows = self.suppliers.write().map_err(poisoned)?;
        rows.push(supplier.clone());
        Ok(())
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        let rows = self.suppliers.read().map_err(poisoned)?;

        let mut latest: HashMap<&str, usize> = HashMap::new();
        for (id, row) in rows.iter().enumerate() {
            latest.insert(row.email.as_str(), id);
        }

        let mut ids: Vec<usize> = latest.into_values().collect();
        ids.sort_unstable();
        Ok(ids.into_iter().map(|id| rows[id].clone()).collect())
    }

    async fn record_proposal(
        &self,
        proposal: &Proposal,
        rfp_name: &str,
        from_address: &str,
    ) -> StoreResult<()> {
        let mut rows = self.proposals.write().map_err(poisoned)?;
        rows.push(ProposalRecord::new(proposal.clone(), rfp_name, from_address));
        Ok(())
    }

    async fn list_proposals_for_rfp(&self, rfp_name: &str) -> StoreResult<Vec<ProposalRecord>> {
        let rows = self.proposals.read().map_err(poisoned)?;
        Ok(rows
            .iter()
            .filter(|r| r.rfp_name == rfp_name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier(name: &str, email: &str, address: &str) -> Supplier {
        Supplier {
            name: name.into(),
            email: email.into(),
            address: address.into(),
        }
    }

    fn proposal(supplier_name: &str) -> Proposal {
        Proposal {
            supplier_name: supplier_name.into(),
            contact_name: "Unknown".into(),
            price_per_unit: 1.5,
            price_currency: "EUR".into(),
            minimum_order_quantity: 100.0,
            country_of_origin: "Spain".into(),
            payment_terms: "Net 60".into(),
            certifications: vec!["ISO 9001".into()],
        }
    }

    #[tokio::test]
    async fn test_latest_supplier_wins() {
        let store = InMemoryStore::new();
        store
            .register_supplier(&supplier("Acme", "a@acme.com", "1 Main St"))
            .await
            .unwrap();
        store
            .register_supplier(&supplier("Beta", "b@beta.com", "9 Side St"))
            .await
            .unwrap();
        store
            .register_supplier(&supplier("Acme Corp", "a@acme.com", "2 Main St"))
            .await
            .unwrap();

        let listed = store.list_suppliers().await.unwrap();
        assert_eq!(
            listed,
            vec![
                supplier("Beta", "b@beta.com", "9 Side St"),
                supplier("Acme Corp", "a@acme.com", "2 Main St"),
            ]
        );
        // History is kept even though only the latest row is visible.
        assert_eq!(store.supplier_row_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_registration_always_appends() {
        let store = InMemoryStore::new();
        let acme = supplier("Acme", "a@acme.com", "1 Main St");
        store.register_supplier(&acme).await.unwrap();
        store.register_supplier(&acme).await.unwrap();

        assert_eq!(store.supplier_row_count().unwrap(), 2);
        assert_eq!(store.list_suppliers().await.unwrap(), vec![acme]);
    }

    #[tokio::test]
    async fn test_proposals_scoped_by_rfp() {
        let store = InMemoryStore::new();
        store
            .record_proposal(&proposal("One"), "RFP-1", "one@x.com")
            .await
            .unwrap();
        store
            .record_proposal(&proposal("Two"), "RFP-2", "two@x.com")
            .await
            .unwrap();
        store
            .record_proposal(&proposal("Three"), "RFP-1", "three@x.com")
            .await
            .unwrap();

        let rfp1 = store.list_proposals_for_rfp("RFP-1").await.unwrap();
        let names: Vec<&str> = rfp1
            .iter()
            .map(|r| r.proposal.supplier_name.as_str())
            .collect();
        assert_eq!(names, vec!["One", "Three"]);
        assert_eq!(rfp1[1].supplier_email, "three@x.com");

        assert!(store
            .list_proposals_for_rfp("RFP-UNKNOWN")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_listing_is_repeatable() {
        let store = InMemoryStore::new();
        store
            .register_supplier(&supplier("Acme", "a@acme.com", "1 Main St"))
            .await
            .unwrap();
        store
            .record_proposal(&proposal("One"), "RFP-1", "one@x.com")
            .await
            .unwrap();

        assert_eq!(
            store.list_suppliers().await.unwrap(),
            store.list_suppliers().await.unwrap()
        );
        assert_eq!(
            store.list_proposals_for_rfp("RFP-1").await.unwrap(),
            store.list_proposals_for_rfp("RFP-1").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_backend_error() {
        let store = InMemoryStore::new();
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = store.proposals.write().unwrap();
                    panic!("writer died holding the lock");
                })
                .join();
        });

        assert!(matches!(
            store.proposal_row_count(),
            Err(StoreError::Backend(_))
        ));
        assert!(store
            .record_proposal(&proposal("One"), "RFP-1", "one@x.com")
            .await
            .is_err());
        assert_eq!(store.supplier_row_count().unwrap(), 0);
    }
}
