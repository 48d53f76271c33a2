//! In-memory repository adapter.
//!
//! Backed by `DashMap`, so it is safe to share across tasks. Used for local
//! runs without a database file and for HTTP-level tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use billing_types::{
    Invoice, InvoiceFilter, InvoiceId, InvoiceRepository, RepoError, Transaction, TransactionId,
    TransactionRepository,
};

/// In-memory repository implementation.
///
/// Cloning is cheap; clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryRepo {
    invoices: Arc<DashMap<InvoiceId, Invoice>>,
    transactions: Arc<DashMap<TransactionId, Transaction>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, filter: &InvoiceFilter) -> Vec<Invoice> {
        self.invoices
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl InvoiceRepository for MemoryRepo {
    async fn create(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        if self
            .invoices
            .iter()
            .any(|entry| entry.value().public_hash == invoice.public_hash)
        {
            return Err(RepoError::Conflict("public hash already in use".into()));
        }

        match self.invoices.entry(invoice.id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "invoice {} already exists",
                invoice.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(invoice.clone());
                Ok(invoice)
            }
        }
    }

    async fn get(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, RepoError> {
        let mut found = self.matching(filter);
        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });

        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = match filter.limit {
            0 => usize::MAX,
            l => usize::try_from(l).unwrap_or(usize::MAX),
        };

        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_count(&self, filter: &InvoiceFilter) -> Result<u64, RepoError> {
        Ok(self
            .invoices
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count() as u64)
    }

    async fn get_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
        Ok(self.invoices.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_by_public_hash(&self, hash: &str) -> Result<Option<Invoice>, RepoError> {
        Ok(self
            .invoices
            .iter()
            .find(|entry| entry.value().public_hash == hash)
            .map(|entry| entry.value().clone()))
    }

    async fn update(
        &self,
        mut invoice: Invoice,
        expected_version: u64,
    ) -> Result<Invoice, RepoError> {
        // The shard lock is held from the version check to the write.
        let mut stored = self.invoices.get_mut(&invoice.id).ok_or(RepoError::NotFound)?;

        if stored.version != expected_version {
            return Err(RepoError::Conflict(format!(
                "invoice {} changed since version {}",
                invoice.id, expected_version
            )));
        }

        invoice.version = expected_version
            .checked_add(1)
            .ok_or_else(|| RepoError::Database("invoice version overflow".into()))?;
        *stored = invoice.clone();

        Ok(invoice)
    }

    async fn delete(&self, id: InvoiceId) -> Result<(), RepoError> {
        self.invoices
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl TransactionRepository for MemoryRepo {
    async fn create(&self, transaction: Transaction) -> Result<Transaction, RepoError> {
        match self.transactions.entry(transaction.id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "transaction {} already exists",
                transaction.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(transaction.clone());
                Ok(transaction)
            }
        }
    }

    async fn get_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        Ok(self.transactions.get(&id).map(|entry| entry.value().clone()))
    }
}
