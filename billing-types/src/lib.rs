//! # Billing Types
//!
//! Domain types and port traits for the billing service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Invoice, Transaction) and amount calculation
//! - `ports/` - Repository traits and the cross-service capability traits
//! - `dto/` - Parameter types for service operations
//! - `error/` - Validation, domain, repository and application errors

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Amounts, Card, CardType, Invoice, InvoiceId, InvoiceStatus, LineItem, Party, PaymentMethod,
    Transaction, TransactionId, TransactionPaymentMethod, TransactionStatus, TransactionType,
    UserId, calculate_amounts, validate_tax_rate,
};
pub use dto::*;
pub use error::{AppError, DomainError, ParamError, ParamErrors, RepoError};
pub use ports::{InvoiceOps, InvoiceRepository, TransactionOps, TransactionRepository};
