//! Invoice domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserId;

/// Unique identifier for an Invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(Uuid);

impl InvoiceId {
    /// Creates a new random InvoiceId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an InvoiceId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InvoiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Financial status of an invoice.
///
/// `Pending` is the only initial state. A sale moves it to `Paid`, a refund
/// moves it back to `Pending`; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
}

impl AsRef<str> for InvoiceStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

/// Payment methods an invoice can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Ach,
}

impl AsRef<str> for PaymentMethod {
    fn as_ref(&self) -> &str {
        match self {
            Self::Card => "card",
            Self::Ach => "ach",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "ach" => Ok(Self::Ach),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// Contact and address details of a bill-to or pay-to party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub email: String,
    pub phone: String,
}

/// A single billable line on an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u64,
    /// Unit price in minor currency units
    pub price: u64,
}

/// An invoice issued by a user.
///
/// `amount_due + amount_paid` always equals the tax-inclusive total of the
/// line items as of the last calculation. The invoice service is the only
/// writer that keeps this true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Owning user
    pub user_id: UserId,
    /// Unguessable token for unauthenticated view/pay links
    pub public_hash: String,
    pub invoice_number: String,
    pub po_number: String,
    /// ISO currency code, e.g. "USD"
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    pub message: String,
    pub bill_to: Party,
    pub pay_to: Party,
    pub line_items: Vec<LineItem>,
    pub payment_methods: Vec<PaymentMethod>,
    /// Tax percentage as a decimal string, e.g. "7.5"; empty means no tax
    pub tax_rate: String,
    /// Outstanding amount in minor currency units
    pub amount_due: u64,
    /// Captured amount in minor currency units
    pub amount_paid: u64,
    pub status: InvoiceStatus,
    /// Optimistic concurrency token, bumped by the repository on every update
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Returns the tax-inclusive total the invoice was last calculated at.
    pub fn total(&self) -> u64 {
        self.amount_due.saturating_add(self.amount_paid)
    }
}
