//! # Billing Repository
//!
//! Concrete repository implementations (adapters) for the billing service.
//! Every adapter implements both the `InvoiceRepository` and the
//! `TransactionRepository` port.

use async_trait::async_trait;
use billing_types::{
    Invoice, InvoiceFilter, InvoiceId, InvoiceRepository, RepoError, Transaction, TransactionId,
    TransactionRepository,
};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
mod types;

#[cfg(test)]
mod memory_tests;

pub use memory::MemoryRepo;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepo;

/// URL that selects the in-memory adapter.
pub const MEMORY_URL: &str = "memory://";

/// Unified repository wrapper over the available adapters.
#[derive(Clone)]
pub enum Repo {
    Memory(MemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteRepo),
}

/// Build and initialize a repository from a database URL.
///
/// This function:
/// 1. Picks the adapter from the URL scheme
/// 2. Connects and runs migrations (SQLite)
/// 3. Returns a ready-to-use `Repo`
///
/// # Examples
///
/// ```ignore
/// let repo = build_repo("memory://").await?;
///
/// // SQLite (with `sqlite` feature)
/// let repo = build_repo("sqlite://billing.db?mode=rwc").await?;
/// ```
pub async fn build_repo(database_url: &str) -> anyhow::Result<Repo> {
    Repo::new(database_url).await
}

impl Repo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        if database_url == MEMORY_URL {
            tracing::warn!("Using in-memory repository; data is lost on exit");
            return Ok(Self::Memory(MemoryRepo::new()));
        }

        #[cfg(feature = "sqlite")]
        if database_url.starts_with("sqlite:") {
            return Ok(Self::Sqlite(SqliteRepo::new(database_url).await?));
        }

        anyhow::bail!("Unsupported database URL: {}", database_url)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Implement the repository ports for Repo (delegation)
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! delegate {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            Repo::Memory($repo) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $call,
        }
    };
}

#[async_trait]
impl InvoiceRepository for Repo {
    async fn create(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        delegate!(self, r => InvoiceRepository::create(r, invoice).await)
    }

    async fn get(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, RepoError> {
        delegate!(self, r => r.get(filter).await)
    }

    async fn get_count(&self, filter: &InvoiceFilter) -> Result<u64, RepoError> {
        delegate!(self, r => r.get_count(filter).await)
    }

    async fn get_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
        delegate!(self, r => InvoiceRepository::get_by_id(r, id).await)
    }

    async fn get_by_public_hash(&self, hash: &str) -> Result<Option<Invoice>, RepoError> {
        delegate!(self, r => r.get_by_public_hash(hash).await)
    }

    async fn update(&self, invoice: Invoice, expected_version: u64) -> Result<Invoice, RepoError> {
        delegate!(self, r => r.update(invoice, expected_version).await)
    }

    async fn delete(&self, id: InvoiceId) -> Result<(), RepoError> {
        delegate!(self, r => r.delete(id).await)
    }
}

#[async_trait]
impl TransactionRepository for Repo {
    async fn create(&self, transaction: Transaction) -> Result<Transaction, RepoError> {
        delegate!(self, r => TransactionRepository::create(r, transaction).await)
    }

    async fn get_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        delegate!(self, r => TransactionRepository::get_by_id(r, id).await)
    }
}
