//! Domain models for the billing service.

pub mod amounts;
pub mod invoice;
pub mod transaction;
pub mod user;

pub use amounts::{Amounts, calculate_amounts, validate_tax_rate};
pub use invoice::{Invoice, InvoiceId, InvoiceStatus, LineItem, Party, PaymentMethod};
pub use transaction::{
    Card, CardType, Transaction, TransactionId, TransactionPaymentMethod, TransactionStatus,
    TransactionType,
};
pub use user::UserId;
