//! Billing application services.
//!
//! Orchestrate domain operations through the repository ports.
//! Contain NO infrastructure logic - pure business orchestration.

mod invoice;
mod registry;
mod transaction;

pub use invoice::InvoiceService;
pub use registry::{ServiceRegistry, Services};
pub use transaction::TransactionService;

/// Largest amount, in minor currency units, a single payment or transaction
/// may carry.
pub const MAX_PAYMENT_AMOUNT: u64 = 1_000_000;
