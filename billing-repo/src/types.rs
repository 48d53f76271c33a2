//! SQLite row types and their conversion to and from the domain.
//!
//! UUIDs and timestamps are stored as text, nested records (parties, line
//! items, payment methods) as JSON text, and amounts as `INTEGER`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::FromRow;

use billing_types::{
    Invoice, InvoiceId, InvoiceStatus, RepoError, Transaction, TransactionId, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Invoice row from database.
#[derive(FromRow)]
pub struct DbInvoice {
    pub id: String,
    pub user_id: String,
    pub public_hash: String,
    pub invoice_number: String,
    pub po_number: String,
    pub currency: String,
    pub due_date: Option<String>,
    pub message: String,
    pub bill_to: String,
    pub pay_to: String,
    pub line_items: String,
    pub payment_methods: String,
    pub tax_rate: String,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub status: String,
    pub version: i64,
    pub created_at: String,
}

/// Transaction row from database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub user_id: String,
    pub invoice_id: Option<String>,
    pub transaction_type: String,
    pub amount_captured: i64,
    pub card_type: String,
    pub status: String,
    pub payment_method: String,
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Formats a timestamp with fixed-width nanoseconds so text order matches
/// time order.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

pub fn encode_json<T: Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(|e| RepoError::Database(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(s: &str) -> Result<T, RepoError> {
    serde_json::from_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

fn parse_text<T>(s: &str) -> Result<T, RepoError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse()
        .map_err(|e: T::Err| RepoError::Database(format!("invalid column value {:?}: {}", s, e)))
}

/// Converts an amount to SQLite's signed integer.
pub fn to_db_int(value: u64) -> Result<i64, RepoError> {
    i64::try_from(value)
        .map_err(|_| RepoError::Database(format!("value {} does not fit a database integer", value)))
}

fn from_db_int(value: i64) -> Result<u64, RepoError> {
    u64::try_from(value)
        .map_err(|_| RepoError::Database(format!("negative value {} in database", value)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbInvoice {
    /// Convert database row to domain Invoice.
    pub fn into_domain(self) -> Result<Invoice, RepoError> {
        let due_date = self
            .due_date
            .as_deref()
            .map(parse_text::<NaiveDate>)
            .transpose()?;

        Ok(Invoice {
            id: parse_text::<InvoiceId>(&self.id)?,
            user_id: parse_text::<UserId>(&self.user_id)?,
            public_hash: self.public_hash,
            invoice_number: self.invoice_number,
            po_number: self.po_number,
            currency: self.currency,
            due_date,
            message: self.message,
            bill_to: parse_json(&self.bill_to)?,
            pay_to: parse_json(&self.pay_to)?,
            line_items: parse_json(&self.line_items)?,
            payment_methods: parse_json(&self.payment_methods)?,
            tax_rate: self.tax_rate,
            amount_due: from_db_int(self.amount_due)?,
            amount_paid: from_db_int(self.amount_paid)?,
            status: parse_text::<InvoiceStatus>(&self.status)?,
            version: from_db_int(self.version)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let invoice_id = self
            .invoice_id
            .as_deref()
            .map(parse_text::<InvoiceId>)
            .transpose()?;

        Ok(Transaction {
            id: parse_text::<TransactionId>(&self.id)?,
            user_id: parse_text::<UserId>(&self.user_id)?,
            invoice_id,
            transaction_type: parse_text(&self.transaction_type)?,
            amount_captured: from_db_int(self.amount_captured)?,
            card_type: parse_text(&self.card_type)?,
            status: parse_text(&self.status)?,
            payment_method: parse_json(&self.payment_method)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
