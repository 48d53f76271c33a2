//! Parameter types for service operations.
//!
//! These are the shapes callers hand to the services. They deliberately
//! carry raw values (e.g. payment methods as strings) so the services can
//! report every invalid field at once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    InvoiceId, InvoiceStatus, LineItem, Party, TransactionId, TransactionPaymentMethod,
    TransactionType, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Invoice parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for creating an invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInvoiceParams {
    /// Generated by the service when absent
    #[serde(default)]
    pub id: Option<InvoiceId>,
    /// Owning user, set from the authenticated caller
    #[serde(skip)]
    pub user_id: UserId,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub po_number: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub bill_to: Party,
    #[serde(default)]
    pub pay_to: Party,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Accepted methods, each one of `card` or `ach`
    #[serde(default)]
    pub payment_methods: Vec<String>,
    #[serde(default)]
    pub tax_rate: String,
}

/// Filter shared by invoice listing and counting.
///
/// `offset` and `limit` only apply to listing. A `limit` of zero lists
/// everything after `offset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub id: Option<InvoiceId>,
    pub user_id: Option<UserId>,
    pub status: Option<InvoiceStatus>,
    /// Inclusive lower bound on creation time
    pub created_at_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time
    pub created_at_end: Option<DateTime<Utc>>,
    pub offset: u64,
    pub limit: u64,
}

impl InvoiceFilter {
    /// Returns true if the invoice satisfies every set criterion.
    pub fn matches(&self, invoice: &crate::domain::Invoice) -> bool {
        self.id.is_none_or(|id| invoice.id == id)
            && self.user_id.is_none_or(|u| invoice.user_id == u)
            && self.status.is_none_or(|s| invoice.status == s)
            && self.created_at_start.is_none_or(|t| invoice.created_at >= t)
            && self.created_at_end.is_none_or(|t| invoice.created_at <= t)
    }
}

/// Field-level overrides for a party; `None` leaves the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PartyUpdate {
    /// Overwrites the supplied fields of `party`.
    pub fn apply_to(self, party: &mut Party) {
        let fields = [
            (self.first_name, &mut party.first_name),
            (self.last_name, &mut party.last_name),
            (self.company, &mut party.company),
            (self.address_line_1, &mut party.address_line_1),
            (self.address_line_2, &mut party.address_line_2),
            (self.city, &mut party.city),
            (self.state, &mut party.state),
            (self.postal_code, &mut party.postal_code),
            (self.country, &mut party.country),
            (self.email, &mut party.email),
            (self.phone, &mut party.phone),
        ];

        for (value, slot) in fields {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

/// Partial update of an invoice. Only supplied fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateInvoiceParams {
    #[serde(skip)]
    pub id: InvoiceId,
    pub invoice_number: Option<String>,
    pub po_number: Option<String>,
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub message: Option<String>,
    pub bill_to: Option<PartyUpdate>,
    pub pay_to: Option<PartyUpdate>,
    pub line_items: Option<Vec<LineItem>>,
    pub payment_methods: Option<Vec<String>>,
    pub tax_rate: Option<String>,
}

impl UpdateInvoiceParams {
    /// Returns true if applying these params changes the invoice total.
    pub fn touches_amounts(&self) -> bool {
        self.line_items.is_some() || self.tax_rate.is_some()
    }
}

/// Direct write of an invoice's financial fields after a transaction.
///
/// `expected_version` is the version the caller read; the write fails
/// with a conflict if the invoice changed since.
#[derive(Debug, Clone)]
pub struct UpdateInvoiceForTransactionParams {
    pub id: InvoiceId,
    pub expected_version: u64,
    pub amount_due: Option<u64>,
    pub amount_paid: Option<u64>,
    pub status: Option<InvoiceStatus>,
}

/// Parameters for paying an invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayInvoiceParams {
    /// Amount to capture in minor currency units
    pub amount: u64,
    #[serde(default)]
    pub payment_method: TransactionPaymentMethod,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for processing a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTransactionParams {
    /// Generated by the service when absent
    #[serde(default)]
    pub id: Option<TransactionId>,
    /// Owning user, set from the authenticated caller
    #[serde(skip)]
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    /// Requested amount in minor currency units
    pub amount: u64,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub payment_method: TransactionPaymentMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_update_only_touches_supplied_fields() {
        let mut party = Party {
            first_name: "John".into(),
            last_name: "Smith".into(),
            city: "Chicago".into(),
            ..Default::default()
        };

        PartyUpdate {
            last_name: Some("Doe".into()),
            postal_code: Some("60601".into()),
            ..Default::default()
        }
        .apply_to(&mut party);

        assert_eq!(party.first_name, "John");
        assert_eq!(party.last_name, "Doe");
        assert_eq!(party.city, "Chicago");
        assert_eq!(party.postal_code, "60601");
    }

    #[test]
    fn test_touches_amounts() {
        let mut params = UpdateInvoiceParams::default();
        assert!(!params.touches_amounts());

        params.tax_rate = Some("5".into());
        assert!(params.touches_amounts());
    }
}
