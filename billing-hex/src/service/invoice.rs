//! Invoice application service.

use std::collections::HashSet;
use std::sync::Arc;

use billing_types::{
    AppError, CreateInvoiceParams, DomainError, Invoice, InvoiceFilter, InvoiceId, InvoiceOps,
    InvoiceRepository, InvoiceStatus, ParamErrors, PayInvoiceParams, PaymentMethod,
    ProcessTransactionParams, RepoError, TransactionType, UpdateInvoiceForTransactionParams,
    UpdateInvoiceParams, UserId, calculate_amounts, validate_tax_rate,
};
use chrono::Utc;

use super::MAX_PAYMENT_AMOUNT;
use super::registry::ServiceRegistry;
use crate::security::generate_public_hash;

/// Application service for invoices.
///
/// Generic over `R: InvoiceRepository` - the adapter is injected at compile
/// time. Transactions are reached through the shared [`ServiceRegistry`].
pub struct InvoiceService<R: InvoiceRepository> {
    repo: R,
    registry: Arc<ServiceRegistry>,
}

impl<R: InvoiceRepository> InvoiceService<R> {
    /// Creates a new invoice service with the given repository and registry.
    pub fn new(repo: R, registry: Arc<ServiceRegistry>) -> Self {
        Self { repo, registry }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates an invoice.
    ///
    /// Assigns an ID when none is given, a fresh public hash, and computes
    /// the amounts. The invoice always starts `pending` with nothing paid.
    #[tracing::instrument(skip(self, params), fields(user_id = %params.user_id))]
    pub async fn create(&self, params: CreateInvoiceParams) -> Result<Invoice, AppError> {
        let mut errors = ParamErrors::new();
        let payment_methods = parse_payment_methods(&params.payment_methods, &mut errors);
        if let Err(msg) = validate_tax_rate(&params.tax_rate) {
            errors.add("tax_rate", msg);
        }
        errors.into_result()?;

        let amounts = calculate_amounts(&params.line_items, &params.tax_rate)?;

        let invoice = Invoice {
            id: params.id.unwrap_or_default(),
            user_id: params.user_id,
            public_hash: generate_public_hash(),
            invoice_number: params.invoice_number,
            po_number: params.po_number,
            currency: params.currency,
            due_date: params.due_date,
            message: params.message,
            bill_to: params.bill_to,
            pay_to: params.pay_to,
            line_items: params.line_items,
            payment_methods,
            tax_rate: params.tax_rate,
            amount_due: amounts.amount_due,
            amount_paid: amounts.amount_paid,
            status: InvoiceStatus::Pending,
            version: 1,
            created_at: Utc::now(),
        };

        let invoice = self.repo.create(invoice).await?;

        tracing::info!(
            invoice_id = %invoice.id,
            amount_due = invoice.amount_due,
            "Invoice created"
        );

        Ok(invoice)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Retrieval
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists invoices matching the filter, newest first.
    pub async fn get(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        validate_filter(filter)?;
        self.repo.get(filter).await.map_err(Into::into)
    }

    /// Counts invoices matching the filter. Offset and limit are ignored.
    pub async fn get_count(&self, filter: &InvoiceFilter) -> Result<u64, AppError> {
        validate_filter(filter)?;
        self.repo.get_count(filter).await.map_err(Into::into)
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: InvoiceId) -> Result<Invoice, AppError> {
        self.repo
            .get_by_id(id)
            .await
            .map_err(invoice_repo_error)?
            .ok_or_else(|| DomainError::InvoiceNotFound.into())
    }

    /// Gets an invoice by ID, treating another user's invoice as not found.
    pub async fn get_by_id_and_user_id(
        &self,
        id: InvoiceId,
        user_id: UserId,
    ) -> Result<Invoice, AppError> {
        let invoice = self.get_by_id(id).await?;
        if invoice.user_id != user_id {
            return Err(DomainError::InvoiceNotFound.into());
        }
        Ok(invoice)
    }

    /// Gets an invoice by its public hash.
    pub async fn get_by_public_hash(&self, hash: &str) -> Result<Invoice, AppError> {
        self.repo
            .get_by_public_hash(hash)
            .await
            .map_err(invoice_repo_error)?
            .ok_or_else(|| DomainError::InvoiceNotFound.into())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Updates
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies a partial update. Only supplied fields are written.
    ///
    /// Changing line items or the tax rate recalculates the amount due
    /// against what has already been paid; the amount paid never changes.
    #[tracing::instrument(skip(self, params), fields(invoice_id = %params.id))]
    pub async fn update(&self, params: UpdateInvoiceParams) -> Result<Invoice, AppError> {
        let payment_methods = validate_update(&params)?;
        let invoice = self.get_by_id(params.id).await?;
        self.apply_update(invoice, params, payment_methods).await
    }

    /// Applies a partial update to an invoice owned by `user_id`.
    #[tracing::instrument(skip(self, params), fields(invoice_id = %params.id))]
    pub async fn update_by_id_and_user_id(
        &self,
        user_id: UserId,
        params: UpdateInvoiceParams,
    ) -> Result<Invoice, AppError> {
        let payment_methods = validate_update(&params)?;
        let invoice = self.get_by_id_and_user_id(params.id, user_id).await?;
        self.apply_update(invoice, params, payment_methods).await
    }

    async fn apply_update(
        &self,
        mut invoice: Invoice,
        params: UpdateInvoiceParams,
        payment_methods: Option<Vec<PaymentMethod>>,
    ) -> Result<Invoice, AppError> {
        let read_version = invoice.version;
        let recalculate = params.touches_amounts();

        if let Some(v) = params.invoice_number {
            invoice.invoice_number = v;
        }
        if let Some(v) = params.po_number {
            invoice.po_number = v;
        }
        if let Some(v) = params.currency {
            invoice.currency = v;
        }
        if let Some(v) = params.due_date {
            invoice.due_date = Some(v);
        }
        if let Some(v) = params.message {
            invoice.message = v;
        }
        if let Some(update) = params.bill_to {
            update.apply_to(&mut invoice.bill_to);
        }
        if let Some(update) = params.pay_to {
            update.apply_to(&mut invoice.pay_to);
        }
        if let Some(v) = params.line_items {
            invoice.line_items = v;
        }
        if let Some(v) = payment_methods {
            invoice.payment_methods = v;
        }
        if let Some(v) = params.tax_rate {
            invoice.tax_rate = v;
        }

        if recalculate {
            let total = calculate_amounts(&invoice.line_items, &invoice.tax_rate)?.amount_due;
            let Some(amount_due) = total.checked_sub(invoice.amount_paid) else {
                let mut errors = ParamErrors::new();
                errors.add(
                    "line_items",
                    "invoice total cannot be less than the amount already paid",
                );
                return Err(errors.into());
            };
            invoice.amount_due = amount_due;
        }

        self.store(invoice, read_version).await
    }

    /// Writes amounts and status directly, without recalculating.
    ///
    /// Used by payment and refund settlement. Fails with a conflict if the
    /// invoice changed after the caller read `expected_version`.
    #[tracing::instrument(skip(self, params), fields(invoice_id = %params.id))]
    pub async fn update_for_transaction(
        &self,
        params: UpdateInvoiceForTransactionParams,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get_by_id(params.id).await?;

        if let Some(v) = params.amount_due {
            invoice.amount_due = v;
        }
        if let Some(v) = params.amount_paid {
            invoice.amount_paid = v;
        }
        if let Some(v) = params.status {
            invoice.status = v;
        }

        self.store(invoice, params.expected_version).await
    }

    async fn store(&self, invoice: Invoice, expected_version: u64) -> Result<Invoice, AppError> {
        let id = invoice.id;
        self.repo
            .update(invoice, expected_version)
            .await
            .map_err(|e| {
                if let RepoError::Conflict(reason) = &e {
                    tracing::warn!(invoice_id = %id, expected_version, %reason, "Invoice update conflict");
                }
                invoice_repo_error(e)
            })
    }

    /// Hard-deletes an invoice.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: InvoiceId) -> Result<(), AppError> {
        self.repo.delete(id).await.map_err(invoice_repo_error)?;
        tracing::info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────────

    /// Pays a pending invoice.
    ///
    /// The invoice is claimed with a compare-and-swap write before the sale
    /// is processed, so concurrent payments of the same invoice cannot both
    /// charge. On success the captured amount is applied and the invoice
    /// stays `paid`. If the sale fails the claim is released and the
    /// invoice's amounts and status are left as they were.
    #[tracing::instrument(skip(self, params), fields(amount = params.amount))]
    pub async fn pay(&self, id: InvoiceId, params: PayInvoiceParams) -> Result<Invoice, AppError> {
        let mut errors = ParamErrors::new();
        if params.amount == 0 {
            errors.add("amount", "amount must be greater than zero");
        } else if params.amount > MAX_PAYMENT_AMOUNT {
            errors.add(
                "amount",
                format!("amount cannot exceed {}", MAX_PAYMENT_AMOUNT),
            );
        }
        errors.into_result()?;

        let invoice = self.get_by_id(id).await?;

        if invoice.status != InvoiceStatus::Pending {
            tracing::warn!(invoice_id = %id, status = %invoice.status, "Pay rejected");
            return Err(DomainError::StatusNotPending.into());
        }

        if params.amount > invoice.amount_due {
            let mut errors = ParamErrors::new();
            errors.add("amount", "amount cannot exceed the amount due");
            return Err(errors.into());
        }
        invoice
            .amount_paid
            .checked_add(params.amount)
            .ok_or(DomainError::AmountOverflow)?;

        let transactions = self.registry.transaction()?;

        // Only one payer can move the invoice off `pending` at this version.
        let claimed = self
            .update_for_transaction(UpdateInvoiceForTransactionParams {
                id: invoice.id,
                expected_version: invoice.version,
                amount_due: None,
                amount_paid: None,
                status: Some(InvoiceStatus::Paid),
            })
            .await?;

        let sale = transactions
            .process(ProcessTransactionParams {
                id: None,
                user_id: claimed.user_id,
                transaction_type: TransactionType::Sale,
                amount: params.amount,
                invoice_id: Some(claimed.id),
                payment_method: params.payment_method,
            })
            .await;

        let transaction = match sale {
            Ok(transaction) => transaction,
            Err(e) => {
                self.release_claim(&claimed).await;
                return Err(e);
            }
        };

        let captured = transaction.amount_captured;
        let amount_paid = claimed
            .amount_paid
            .checked_add(captured)
            .ok_or(DomainError::AmountOverflow)?;

        let invoice = self
            .update_for_transaction(UpdateInvoiceForTransactionParams {
                id: claimed.id,
                expected_version: claimed.version,
                amount_due: Some(claimed.amount_due.saturating_sub(captured)),
                amount_paid: Some(amount_paid),
                status: Some(InvoiceStatus::Paid),
            })
            .await?;

        tracing::info!(
            invoice_id = %invoice.id,
            transaction_id = %transaction.id,
            captured,
            "Invoice paid"
        );

        Ok(invoice)
    }

    /// Puts a claimed invoice back to `pending` after its sale failed.
    async fn release_claim(&self, claimed: &Invoice) {
        let released = self
            .update_for_transaction(UpdateInvoiceForTransactionParams {
                id: claimed.id,
                expected_version: claimed.version,
                amount_due: None,
                amount_paid: None,
                status: Some(InvoiceStatus::Pending),
            })
            .await;

        if let Err(e) = released {
            tracing::error!(
                invoice_id = %claimed.id,
                error = %e,
                "Failed to release invoice after its sale failed"
            );
        }
    }
}

#[async_trait::async_trait]
impl<R: InvoiceRepository> InvoiceOps for InvoiceService<R> {
    async fn get_by_id(&self, id: InvoiceId) -> Result<Invoice, AppError> {
        InvoiceService::get_by_id(self, id).await
    }

    async fn update_for_transaction(
        &self,
        params: UpdateInvoiceForTransactionParams,
    ) -> Result<Invoice, AppError> {
        InvoiceService::update_for_transaction(self, params).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Parses accepted payment methods, recording every problem under
/// `payment_methods`. Duplicates are dropped, first occurrence wins.
fn parse_payment_methods(raw: &[String], errors: &mut ParamErrors) -> Vec<PaymentMethod> {
    if raw.is_empty() {
        errors.add("payment_methods", "at least one payment method is required");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut methods = Vec::with_capacity(raw.len());
    for value in raw {
        match value.parse::<PaymentMethod>() {
            Ok(method) => {
                if seen.insert(method) {
                    methods.push(method);
                }
            }
            Err(msg) => errors.add("payment_methods", msg),
        }
    }
    methods
}

fn validate_update(params: &UpdateInvoiceParams) -> Result<Option<Vec<PaymentMethod>>, AppError> {
    let mut errors = ParamErrors::new();
    let payment_methods = params
        .payment_methods
        .as_deref()
        .map(|raw| parse_payment_methods(raw, &mut errors));
    if let Some(Err(msg)) = params.tax_rate.as_deref().map(validate_tax_rate) {
        errors.add("tax_rate", msg);
    }
    errors.into_result()?;
    Ok(payment_methods)
}

fn validate_filter(filter: &InvoiceFilter) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (filter.created_at_start, filter.created_at_end) {
        if start <= end {
            return Ok(());
        }
        let mut errors = ParamErrors::new();
        errors.add("created_at_start", "start of range cannot be after its end");
        return Err(errors.into());
    }
    Ok(())
}

/// Maps a repository failure on an invoice lookup or write, turning a missing
/// record into the domain's not-found.
fn invoice_repo_error(err: RepoError) -> AppError {
    match err {
        RepoError::NotFound => DomainError::InvoiceNotFound.into(),
        other => other.into(),
    }
}
