//! Cross-service registry.
//!
//! The invoice and transaction services call each other: paying an invoice
//! processes a sale, and a refund reopens the invoice. Neither service
//! holds the other's concrete type. Both hold an `Arc<ServiceRegistry>`
//! and look the other side up through its capability trait.
//!
//! The registry stores `Weak` handles so the two services do not keep each
//! other alive; the owning [`Services`] struct holds the strong ones.

use std::sync::{Arc, OnceLock, Weak};

use billing_types::{
    AppError, InvoiceOps, InvoiceRepository, TransactionOps, TransactionRepository,
};

use super::invoice::InvoiceService;
use super::transaction::TransactionService;

/// Late-bound handles to the invoice and transaction capabilities.
#[derive(Default)]
pub struct ServiceRegistry {
    invoice: OnceLock<Weak<dyn InvoiceOps>>,
    transaction: OnceLock<Weak<dyn TransactionOps>>,
}

impl ServiceRegistry {
    /// Creates an empty registry. Calls through it fail until
    /// [`Services::new`] binds both sides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the invoice capability.
    pub fn invoice(&self) -> Result<Arc<dyn InvoiceOps>, AppError> {
        self.invoice
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| AppError::Internal("invoice service is not available".into()))
    }

    /// Returns the transaction capability.
    pub fn transaction(&self) -> Result<Arc<dyn TransactionOps>, AppError> {
        self.transaction
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| AppError::Internal("transaction service is not available".into()))
    }
}

/// The wired pair of services.
///
/// Construct once at startup; clone the `Arc`s into whatever needs them.
pub struct Services<IR: InvoiceRepository, TR: TransactionRepository> {
    pub invoice: Arc<InvoiceService<IR>>,
    pub transaction: Arc<TransactionService<TR>>,
}

impl<IR: InvoiceRepository, TR: TransactionRepository> Services<IR, TR> {
    /// Builds both services over their repositories and binds each to the
    /// other through the registry.
    pub fn new(invoice_repo: IR, transaction_repo: TR) -> Self {
        let registry = Arc::new(ServiceRegistry::new());

        let invoice = Arc::new(InvoiceService::new(invoice_repo, registry.clone()));
        let transaction = Arc::new(TransactionService::new(transaction_repo, registry.clone()));

        let invoice_ops: Arc<dyn InvoiceOps> = invoice.clone();
        let transaction_ops: Arc<dyn TransactionOps> = transaction.clone();

        // A fresh registry has nothing bound yet, so both cells take these.
        registry.invoice.get_or_init(|| Arc::downgrade(&invoice_ops));
        registry.transaction.get_or_init(|| Arc::downgrade(&transaction_ops));

        Self {
            invoice,
            transaction,
        }
    }
}

impl<IR: InvoiceRepository, TR: TransactionRepository> Clone for Services<IR, TR> {
    fn clone(&self) -> Self {
        Self {
            invoice: self.invoice.clone(),
            transaction: self.transaction.clone(),
        }
    }
}
