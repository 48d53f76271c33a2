//! Cross-service capability ports.
//!
//! The invoice service needs to run transactions and the transaction
//! service needs to reopen invoices on refund. Each side depends only on
//! the narrow trait for the other, never on its concrete type.

use crate::domain::{Invoice, InvoiceId, Transaction};
use crate::dto::{ProcessTransactionParams, UpdateInvoiceForTransactionParams};
use crate::error::AppError;

/// What the transaction service may ask of the invoice service.
#[async_trait::async_trait]
pub trait InvoiceOps: Send + Sync {
    /// Gets an invoice by ID, `DomainError::InvoiceNotFound` if absent.
    async fn get_by_id(&self, id: InvoiceId) -> Result<Invoice, AppError>;

    /// Writes amounts and status directly, without recalculating from line
    /// items.
    async fn update_for_transaction(
        &self,
        params: UpdateInvoiceForTransactionParams,
    ) -> Result<Invoice, AppError>;
}

/// What the invoice service may ask of the transaction service.
#[async_trait::async_trait]
pub trait TransactionOps: Send + Sync {
    /// Validates, classifies and records a transaction.
    async fn process(&self, params: ProcessTransactionParams) -> Result<Transaction, AppError>;
}
