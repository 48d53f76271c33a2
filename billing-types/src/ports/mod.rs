//! Port traits (interfaces for adapters and sibling services).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod repository;
mod services;

pub use repository::{InvoiceRepository, TransactionRepository};
pub use services::{InvoiceOps, TransactionOps};
