//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use billing_types::{InvoiceRepository, TransactionRepository};

use super::handlers::{self, AppState};
use crate::Services;

/// Settings the HTTP adapter needs beyond the services.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host (and port) used to build absolute pagination links
    pub api_host: String,
    /// Page size when a listing does not ask for one
    pub limit_default: u64,
    /// Largest page size a listing may ask for
    pub limit_max: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_host: "localhost:3000".into(),
            limit_default: 10,
            limit_max: 100,
        }
    }
}

/// HTTP Server for the Billing API.
pub struct HttpServer<IR: InvoiceRepository, TR: TransactionRepository> {
    state: Arc<AppState<IR, TR>>,
}

impl<IR: InvoiceRepository, TR: TransactionRepository> HttpServer<IR, TR> {
    /// Creates a new HTTP server over the wired services.
    pub fn new(services: Services<IR, TR>, config: HttpConfig) -> Self {
        Self {
            state: Arc::new(AppState { services, config }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api/v1/invoices",
                post(handlers::create_invoice::<IR, TR>).get(handlers::list_invoices::<IR, TR>),
            )
            .route(
                "/api/v1/invoices/{id}",
                get(handlers::get_invoice::<IR, TR>)
                    .patch(handlers::update_invoice::<IR, TR>)
                    .delete(handlers::delete_invoice::<IR, TR>),
            )
            .route(
                "/api/v1/public/invoices/{hash}",
                get(handlers::get_public_invoice::<IR, TR>),
            )
            .route(
                "/api/v1/public/invoices/{hash}/pay",
                post(handlers::pay_public_invoice::<IR, TR>),
            )
            .route(
                "/api/v1/transactions",
                post(handlers::process_transaction::<IR, TR>),
            )
            .route(
                "/api/v1/transactions/{id}",
                get(handlers::get_transaction::<IR, TR>),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
