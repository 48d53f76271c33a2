//! # Billing Hex
//!
//! Application service layer and HTTP adapter for the billing service.
//!
//! ## Architecture
//!
//! - `service/` - Invoice and transaction services, wired through a registry
//! - `inbound/` - HTTP adapter (Axum server)
//! - `security` - Public hash generation
//!
//! The services are generic over their repository ports, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod security;
pub mod service;


pub use service::{
    InvoiceService, MAX_PAYMENT_AMOUNT, ServiceRegistry, Services, TransactionService,
};
