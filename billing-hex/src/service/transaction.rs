//! Transaction application service.

use std::sync::Arc;

use billing_types::{
    AppError, DomainError, InvoiceStatus, ParamErrors, ProcessTransactionParams, Transaction,
    TransactionId, TransactionOps, TransactionRepository, TransactionStatus, TransactionType,
    UpdateInvoiceForTransactionParams, UserId,
};
use chrono::Utc;

use super::MAX_PAYMENT_AMOUNT;
use super::registry::ServiceRegistry;

/// Application service for transactions.
///
/// Records sales and refunds. A refund reopens its invoice through the
/// invoice capability held in the [`ServiceRegistry`].
pub struct TransactionService<R: TransactionRepository> {
    repo: R,
    registry: Arc<ServiceRegistry>,
}

impl<R: TransactionRepository> TransactionService<R> {
    /// Creates a new transaction service with the given repository and registry.
    pub fn new(repo: R, registry: Arc<ServiceRegistry>) -> Self {
        Self { repo, registry }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Validates, classifies and records a transaction.
    ///
    /// The card type is derived from the card number. A refund must name an
    /// invoice owned by the same user and cannot return more than was paid
    /// on it; once recorded, the invoice is reopened with the refunded
    /// amount moved back to due. If that reopening fails the error is
    /// returned but the transaction stays recorded.
    #[tracing::instrument(
        skip(self, params),
        fields(
            user_id = %params.user_id,
            transaction_type = %params.transaction_type,
            amount = params.amount,
        )
    )]
    pub async fn process(&self, params: ProcessTransactionParams) -> Result<Transaction, AppError> {
        let mut errors = ParamErrors::new();
        if params.amount == 0 {
            errors.add("amount", "amount must be greater than zero");
        } else if params.amount > MAX_PAYMENT_AMOUNT {
            errors.add(
                "amount",
                format!("amount cannot exceed {}", MAX_PAYMENT_AMOUNT),
            );
        }
        if params.transaction_type == TransactionType::Refund && params.invoice_id.is_none() {
            errors.add("invoice_id", "a refund must reference an invoice");
        }
        errors.into_result()?;

        // Refunds are checked against the invoice before anything is recorded.
        let refunded_invoice = match (params.transaction_type, params.invoice_id) {
            (TransactionType::Refund, Some(invoice_id)) => {
                let invoice = self.registry.invoice()?.get_by_id(invoice_id).await?;
                if invoice.user_id != params.user_id {
                    return Err(DomainError::InvoiceNotFound.into());
                }
                if params.amount > invoice.amount_paid {
                    let mut errors = ParamErrors::new();
                    errors.add("amount", "refund cannot exceed the amount paid");
                    return Err(errors.into());
                }
                Some(invoice)
            }
            _ => None,
        };

        let transaction = Transaction {
            id: params.id.unwrap_or_default(),
            user_id: params.user_id,
            invoice_id: params.invoice_id,
            transaction_type: params.transaction_type,
            amount_captured: params.amount,
            card_type: params.payment_method.card_type(),
            status: TransactionStatus::Approved,
            payment_method: params.payment_method,
            created_at: Utc::now(),
        };

        let transaction = self.repo.create(transaction).await?;

        tracing::info!(
            transaction_id = %transaction.id,
            card_type = %transaction.card_type,
            "Transaction recorded"
        );

        if let Some(invoice) = refunded_invoice {
            let captured = transaction.amount_captured;
            let amount_due = invoice
                .amount_due
                .checked_add(captured)
                .ok_or(DomainError::AmountOverflow)?;

            let reopened = self
                .registry
                .invoice()?
                .update_for_transaction(UpdateInvoiceForTransactionParams {
                    id: invoice.id,
                    expected_version: invoice.version,
                    amount_due: Some(amount_due),
                    amount_paid: Some(invoice.amount_paid - captured),
                    status: Some(InvoiceStatus::Pending),
                })
                .await;

            match reopened {
                Ok(_) => tracing::info!(
                    invoice_id = %invoice.id,
                    transaction_id = %transaction.id,
                    captured,
                    "Refund reversed on invoice"
                ),
                Err(e) => {
                    tracing::error!(
                        invoice_id = %invoice.id,
                        transaction_id = %transaction.id,
                        error = %e,
                        "Refund recorded but invoice reversal failed"
                    );
                    return Err(e);
                }
            }
        }

        Ok(transaction)
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TransactionNotFound.into())
    }

    /// Gets a transaction by ID, treating another user's transaction as not found.
    pub async fn get_by_id_and_user_id(
        &self,
        id: TransactionId,
        user_id: UserId,
    ) -> Result<Transaction, AppError> {
        let transaction = self.get_by_id(id).await?;
        if transaction.user_id != user_id {
            return Err(DomainError::TransactionNotFound.into());
        }
        Ok(transaction)
    }
}

#[async_trait::async_trait]
impl<R: TransactionRepository> TransactionOps for TransactionService<R> {
    async fn process(&self, params: ProcessTransactionParams) -> Result<Transaction, AppError> {
        TransactionService::process(self, params).await
    }
}
