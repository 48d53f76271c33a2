//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use billing_types::{
    Invoice, InvoiceFilter, InvoiceId, InvoiceRepository, RepoError, Transaction, TransactionId,
    TransactionRepository,
};

use crate::types::{DbInvoice, DbTransaction, encode_json, encode_timestamp, to_db_int};

const MIGRATIONS: [&str; 2] = [
    include_str!("../migrations/0001_create_invoices.sql"),
    include_str!("../migrations/0002_create_transactions.sql"),
];

const INVOICE_COLUMNS: &str = "id, user_id, public_hash, invoice_number, po_number, currency, \
     due_date, message, bill_to, pay_to, line_items, payment_methods, tax_rate, amount_due, \
     amount_paid, status, version, created_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, invoice_id, transaction_type, amount_captured, \
     card_type, status, payment_method, created_at";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to an in-memory database sees its own empty database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;

        tracing::debug!(database_url, "SQLite repository ready");

        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema. Safe to run repeatedly.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        for ddl in MIGRATIONS {
            sqlx::raw_sql(ddl)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    async fn invoice_exists(&self, id: InvoiceId) -> Result<bool, RepoError> {
        let found: Option<(i64,)> = sqlx::query_as(r#"SELECT 1 FROM invoices WHERE id = ?"#)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(found.is_some())
    }
}

fn db_error(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

/// Maps an insert failure, reporting a duplicate key as a conflict.
fn insert_error(e: sqlx::Error) -> RepoError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => RepoError::Conflict(db.message().to_string()),
        _ => db_error(e),
    }
}

/// Appends the filter's `WHERE` clause.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &InvoiceFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id.to_string());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id.to_string());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(start) = filter.created_at_start {
        qb.push(" AND created_at >= ").push_bind(encode_timestamp(start));
    }
    if let Some(end) = filter.created_at_end {
        qb.push(" AND created_at <= ").push_bind(encode_timestamp(end));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoice repository
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl InvoiceRepository for SqliteRepo {
    async fn create(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        sqlx::query(&format!(
            "INSERT INTO invoices ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            INVOICE_COLUMNS
        ))
        .bind(invoice.id.to_string())
        .bind(invoice.user_id.to_string())
        .bind(&invoice.public_hash)
        .bind(&invoice.invoice_number)
        .bind(&invoice.po_number)
        .bind(&invoice.currency)
        .bind(invoice.due_date.map(|d| d.to_string()))
        .bind(&invoice.message)
        .bind(encode_json(&invoice.bill_to)?)
        .bind(encode_json(&invoice.pay_to)?)
        .bind(encode_json(&invoice.line_items)?)
        .bind(encode_json(&invoice.payment_methods)?)
        .bind(&invoice.tax_rate)
        .bind(to_db_int(invoice.amount_due)?)
        .bind(to_db_int(invoice.amount_paid)?)
        .bind(invoice.status.to_string())
        .bind(to_db_int(invoice.version)?)
        .bind(encode_timestamp(invoice.created_at))
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(invoice)
    }

    async fn get(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, RepoError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM invoices", INVOICE_COLUMNS));
        push_filter(&mut qb, filter);

        // SQLite treats a negative LIMIT as no limit.
        let limit = if filter.limit == 0 {
            -1
        } else {
            to_db_int(filter.limit)?
        };
        qb.push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(to_db_int(filter.offset)?);

        let rows: Vec<DbInvoice> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(DbInvoice::into_domain).collect()
    }

    async fn get_count(&self, filter: &InvoiceFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices");
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        u64::try_from(count).map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn get_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
        let row: Option<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = ?",
            INVOICE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(DbInvoice::into_domain).transpose()
    }

    async fn get_by_public_hash(&self, hash: &str) -> Result<Option<Invoice>, RepoError> {
        let row: Option<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE public_hash = ?",
            INVOICE_COLUMNS
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(DbInvoice::into_domain).transpose()
    }

    async fn update(
        &self,
        mut invoice: Invoice,
        expected_version: u64,
    ) -> Result<Invoice, RepoError> {
        let next_version = expected_version
            .checked_add(1)
            .ok_or_else(|| RepoError::Database("invoice version overflow".into()))?;

        let result = sqlx::query(
            r#"UPDATE invoices SET
                   invoice_number = ?, po_number = ?, currency = ?, due_date = ?, message = ?,
                   bill_to = ?, pay_to = ?, line_items = ?, payment_methods = ?, tax_rate = ?,
                   amount_due = ?, amount_paid = ?, status = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&invoice.invoice_number)
        .bind(&invoice.po_number)
        .bind(&invoice.currency)
        .bind(invoice.due_date.map(|d| d.to_string()))
        .bind(&invoice.message)
        .bind(encode_json(&invoice.bill_to)?)
        .bind(encode_json(&invoice.pay_to)?)
        .bind(encode_json(&invoice.line_items)?)
        .bind(encode_json(&invoice.payment_methods)?)
        .bind(&invoice.tax_rate)
        .bind(to_db_int(invoice.amount_due)?)
        .bind(to_db_int(invoice.amount_paid)?)
        .bind(invoice.status.to_string())
        .bind(to_db_int(next_version)?)
        .bind(invoice.id.to_string())
        .bind(to_db_int(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return if self.invoice_exists(invoice.id).await? {
                Err(RepoError::Conflict(format!(
                    "invoice {} changed since version {}",
                    invoice.id, expected_version
                )))
            } else {
                Err(RepoError::NotFound)
            };
        }

        invoice.version = next_version;
        Ok(invoice)
    }

    async fn delete(&self, id: InvoiceId) -> Result<(), RepoError> {
        let result = sqlx::query(r#"DELETE FROM invoices WHERE id = ?"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction repository
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TransactionRepository for SqliteRepo {
    async fn create(&self, transaction: Transaction) -> Result<Transaction, RepoError> {
        sqlx::query(&format!(
            "INSERT INTO transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction.id.to_string())
        .bind(transaction.user_id.to_string())
        .bind(transaction.invoice_id.map(|id| id.to_string()))
        .bind(transaction.transaction_type.to_string())
        .bind(to_db_int(transaction.amount_captured)?)
        .bind(transaction.card_type.to_string())
        .bind(transaction.status.to_string())
        .bind(encode_json(&transaction.payment_method)?)
        .bind(encode_timestamp(transaction.created_at))
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(transaction)
    }

    async fn get_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(DbTransaction::into_domain).transpose()
    }
}
