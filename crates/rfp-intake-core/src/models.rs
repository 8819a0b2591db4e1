//! Core data models for suppliers and their proposals.
//!
//! These are plain records. Field names are the wire names used by the
//! HTTP API and the `add_proposal_to_database` function schema.

use serde::{Deserialize, Serialize};

/// Placeholder the reasoning engine is told to use for text it cannot determine.
pub const UNKNOWN: &str = "Unknown";

/// A supplier directory entry.
///
/// `email` is the natural key. The store keeps every submitted row and
/// reads back the latest one per email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Supplier {
    pub name: String,
    pub email: String,
    pub address: String,
}

/// Commercial terms extracted from a proposal email.
///
/// Numeric fields use `0` and text fields use [`UNKNOWN`] when the engine
/// could not determine a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub supplier_name: String,
    pub contact_name: String,
    pub price_per_unit: f64,
    pub price_currency: String,
    pub minimum_order_quantity: f64,
    pub country_of_origin: String,
    pub payment_terms: String,
    #[serde(default)]
    pub certifications: Vec<String>,
}

impl Proposal {
    /// Field names in schema order.
    pub const FIELDS: [&'static str; 8] = [
        "supplier_name",
        "contact_name",
        "price_per_unit",
        "price_currency",
        "minimum_order_quantity",
        "country_of_origin",
        "payment_terms",
        "certifications",
    ];
}

/// A persisted proposal: the extracted terms plus the provenance that the
/// email body alone cannot supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub rfp_name: String,
    pub supplier_email: String,
    #[serde(flatten)]
    pub proposal: Proposal,
}

impl ProposalRecord {
    pub fn new(proposal: Proposal, rfp_name: &str, supplier_email: &str) -> Self {
        Self {
            rfp_name: rfp_name.to_string(),
            supplier_email: supplier_email.to_string(),
            proposal,
        }
    }
}

/// An inbound proposal submission. Lives for one ingestion request only.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalEmail {
    pub rfp_name: String,
    pub from_address: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Proposal {
        Proposal {
            supplier_name: "Sup Co".into(),
            contact_name: UNKNOWN.into(),
            price_per_unit: 500.0,
            price_currency: "USD".into(),
            minimum_order_quantity: 10.0,
            country_of_origin: "Brazil".into(),
            payment_terms: "Net 30".into(),
            certifications: vec![],
        }
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = ProposalRecord::new(sample(), "RFP-1", "s@sup.com");
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 10);
        assert_eq!(obj["rfp_name"], "RFP-1");
        assert_eq!(obj["supplier_email"], "s@sup.com");
        assert_eq!(obj["price_per_unit"], 500.0);
        assert_eq!(obj["certifications"], json!([]));
    }

    #[test]
    fn test_supplier_rejects_unknown_fields() {
        let err = serde_json::from_value::<Supplier>(json!({
            "name": "Acme",
            "email": "a@acme.com",
            "address": "1 Main St",
            "phone": "555"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_email_requires_all_fields() {
        let err = serde_json::from_value::<ProposalEmail>(json!({
            "rfp_name": "RFP-1",
            "text": "hello"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("from_address"));
    }
}
