//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod handlers;
mod server;

pub use handlers::{ApiError, CurrentUser, USER_ID_HEADER};
pub use server::{HttpConfig, HttpServer};
