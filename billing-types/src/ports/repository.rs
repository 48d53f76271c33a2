//! Repository port traits.
//!
//! Adapters (SQLite, in-memory) implement these. Lookups return `Ok(None)`
//! for a missing record so callers can tell "not found" apart from a
//! storage failure.

use crate::domain::{Invoice, InvoiceId, Transaction, TransactionId};
use crate::dto::InvoiceFilter;
use crate::error::RepoError;

/// Storage for invoice records.
#[async_trait::async_trait]
pub trait InvoiceRepository: Send + Sync + 'static {
    /// Inserts a new invoice. Fails with `Conflict` if the ID or public hash
    /// is already taken.
    async fn create(&self, invoice: Invoice) -> Result<Invoice, RepoError>;

    /// Lists invoices matching the filter, honoring offset and limit.
    ///
    /// Results are ordered newest first, ties broken by ID.
    async fn get(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, RepoError>;

    /// Counts invoices matching the filter, ignoring offset and limit.
    async fn get_count(&self, filter: &InvoiceFilter) -> Result<u64, RepoError>;

    /// Gets an invoice by ID.
    async fn get_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError>;

    /// Gets an invoice by its public hash.
    async fn get_by_public_hash(&self, hash: &str) -> Result<Option<Invoice>, RepoError>;

    /// Replaces a stored invoice if its version still equals
    /// `expected_version`, storing it with the version incremented.
    ///
    /// Fails with `NotFound` if the invoice does not exist and with
    /// `Conflict` if it changed since the caller read it.
    async fn update(&self, invoice: Invoice, expected_version: u64) -> Result<Invoice, RepoError>;

    /// Hard-deletes an invoice. Fails with `NotFound` if it does not exist.
    async fn delete(&self, id: InvoiceId) -> Result<(), RepoError>;
}

/// Storage for transaction records. Transactions are append-only.
#[async_trait::async_trait]
pub trait TransactionRepository: Send + Sync + 'static {
    /// Inserts a new transaction. Fails with `Conflict` if the ID is taken.
    async fn create(&self, transaction: Transaction) -> Result<Transaction, RepoError>;

    /// Gets a transaction by ID.
    async fn get_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError>;
}
