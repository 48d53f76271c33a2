//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use billing_types::{
    AppError, CreateInvoiceParams, DomainError, Invoice, InvoiceFilter, InvoiceId,
    InvoiceRepository, InvoiceStatus, ParamErrors, PayInvoiceParams, ProcessTransactionParams,
    TransactionId, TransactionRepository, UpdateInvoiceParams, UserId,
};

use super::server::HttpConfig;
use crate::Services;

/// Header carrying the caller's user ID, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Application state shared across handlers.
pub struct AppState<IR: InvoiceRepository, TR: TransactionRepository> {
    pub services: Services<IR, TR>,
    pub config: HttpConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<ParamErrors> for ApiError {
    fn from(err: ParamErrors) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::Validation(pes) => {
                let body = serde_json::json!({
                    "error": "Invalid parameters",
                    "code": StatusCode::BAD_REQUEST.as_u16(),
                    "fields": pes,
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            AppError::Domain(
                e @ (DomainError::InvoiceNotFound | DomainError::TransactionNotFound),
            ) => (StatusCode::NOT_FOUND, e.to_string()),
            AppError::Domain(e @ (DomainError::StatusNotPending | DomainError::AmountOverflow)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            err @ (AppError::Domain(DomainError::CalculatingAmounts(_))
            | AppError::Storage(_)
            | AppError::Internal(_)) => {
                tracing::error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn invalid(field: &str, message: &str) -> ApiError {
    let mut pes = ParamErrors::new();
    pes.add(field, message);
    pes.into()
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated caller, read from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or_else(|| {
                let body = serde_json::json!({
                    "error": "Missing or invalid X-User-Id header",
                    "code": StatusCode::UNAUTHORIZED.as_u16()
                });
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            })
    }
}

fn parse_invoice_id(id: &str) -> Result<InvoiceId, ApiError> {
    id.parse().map_err(|_| invalid("id", "invalid invoice ID"))
}

fn parse_transaction_id(id: &str) -> Result<TransactionId, ApiError> {
    id.parse().map_err(|_| invalid("id", "invalid transaction ID"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoices
// ─────────────────────────────────────────────────────────────────────────────

/// Create an invoice for the caller.
#[tracing::instrument(skip(state, params), fields(user_id = %user.0))]
pub async fn create_invoice<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Json(mut params): Json<CreateInvoiceParams>,
) -> Result<impl IntoResponse, ApiError> {
    params.user_id = user.0;
    let invoice = state.services.invoice.create(params).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Query string accepted by the invoice listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<InvoiceStatus>,
    pub created_at_start: Option<DateTime<Utc>>,
    pub created_at_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct PageLinks {
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// One page of invoices with its position in the full result.
#[derive(Debug, Serialize)]
pub struct InvoicePage {
    pub data: Vec<Invoice>,
    pub meta: PageMeta,
    pub links: PageLinks,
}

/// List the caller's invoices, one page at a time.
#[tracing::instrument(skip(state), fields(user_id = %user.0))]
pub async fn list_invoices<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = match query.limit {
        None | Some(0) => state.config.limit_default,
        Some(l) => l.min(state.config.limit_max),
    };
    let offset = query.offset.unwrap_or(0);

    let filter = InvoiceFilter {
        id: None,
        user_id: Some(user.0),
        status: query.status,
        created_at_start: query.created_at_start,
        created_at_end: query.created_at_end,
        offset,
        limit,
    };

    let invoices = state.services.invoice.get(&filter).await?;
    let total = state.services.invoice.get_count(&filter).await?;

    let links = PageLinks {
        prev: (offset > 0).then(|| page_link(&state.config, &filter, offset.saturating_sub(limit))),
        next: (offset.saturating_add(limit) < total)
            .then(|| page_link(&state.config, &filter, offset + limit)),
    };

    Ok(Json(InvoicePage {
        data: invoices,
        meta: PageMeta {
            offset,
            limit,
            total,
        },
        links,
    }))
}

/// Builds an absolute listing URL for `offset`, keeping the other filters.
fn page_link(config: &HttpConfig, filter: &InvoiceFilter, offset: u64) -> String {
    let mut link = format!(
        "http://{}/api/v1/invoices?offset={}&limit={}",
        config.api_host, offset, filter.limit
    );
    if let Some(status) = filter.status {
        link.push_str(&format!("&status={}", status));
    }
    if let Some(start) = filter.created_at_start {
        link.push_str(&format!(
            "&created_at_start={}",
            start.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    if let Some(end) = filter.created_at_end {
        link.push_str(&format!(
            "&created_at_end={}",
            end.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    link
}

/// Get one of the caller's invoices.
#[tracing::instrument(skip(state), fields(user_id = %user.0, invoice_id = %id))]
pub async fn get_invoice<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice_id = parse_invoice_id(&id)?;
    let invoice = state
        .services
        .invoice
        .get_by_id_and_user_id(invoice_id, user.0)
        .await?;
    Ok(Json(invoice))
}

/// Partially update one of the caller's invoices.
#[tracing::instrument(skip(state, params), fields(user_id = %user.0, invoice_id = %id))]
pub async fn update_invoice<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(mut params): Json<UpdateInvoiceParams>,
) -> Result<impl IntoResponse, ApiError> {
    params.id = parse_invoice_id(&id)?;
    let invoice = state
        .services
        .invoice
        .update_by_id_and_user_id(user.0, params)
        .await?;
    Ok(Json(invoice))
}

/// Delete one of the caller's invoices.
#[tracing::instrument(skip(state), fields(user_id = %user.0, invoice_id = %id))]
pub async fn delete_invoice<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice_id = parse_invoice_id(&id)?;
    let invoice = state
        .services
        .invoice
        .get_by_id_and_user_id(invoice_id, user.0)
        .await?;
    state.services.invoice.delete(invoice.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Public invoice links
// ─────────────────────────────────────────────────────────────────────────────

/// View an invoice through its public link.
#[tracing::instrument(skip(state, hash))]
pub async fn get_public_invoice<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state.services.invoice.get_by_public_hash(&hash).await?;
    Ok(Json(invoice))
}

/// Pay an invoice through its public link.
#[tracing::instrument(skip(state, hash, params), fields(amount = params.amount))]
pub async fn pay_public_invoice<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    Path(hash): Path<String>,
    Json(params): Json<PayInvoiceParams>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state.services.invoice.get_by_public_hash(&hash).await?;
    let invoice = state.services.invoice.pay(invoice.id, params).await?;
    Ok(Json(invoice))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// Process a sale or refund for the caller.
#[tracing::instrument(
    skip(state, params),
    fields(user_id = %user.0, transaction_type = %params.transaction_type, amount = params.amount)
)]
pub async fn process_transaction<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Json(mut params): Json<ProcessTransactionParams>,
) -> Result<impl IntoResponse, ApiError> {
    params.user_id = user.0;
    let transaction = state.services.transaction.process(params).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Get one of the caller's transactions.
#[tracing::instrument(skip(state), fields(user_id = %user.0, transaction_id = %id))]
pub async fn get_transaction<IR: InvoiceRepository, TR: TransactionRepository>(
    State(state): State<Arc<AppState<IR, TR>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_transaction_id(&id)?;
    let transaction = state
        .services
        .transaction
        .get_by_id_and_user_id(transaction_id, user.0)
        .await?;
    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HttpConfig {
        HttpConfig {
            api_host: "billing.test".into(),
            limit_default: 10,
            limit_max: 100,
        }
    }

    #[test]
    fn test_page_link_keeps_filters() {
        let filter = InvoiceFilter {
            status: Some(InvoiceStatus::Paid),
            limit: 5,
            ..Default::default()
        };

        let link = page_link(&config(), &filter, 10);

        assert_eq!(
            link,
            "http://billing.test/api/v1/invoices?offset=10&limit=5&status=paid"
        );
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let response = invalid("amount", "amount must be greater than zero").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (
                AppError::Domain(DomainError::InvoiceNotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Domain(DomainError::StatusNotPending),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Conflict("stale".into()), StatusCode::CONFLICT),
            (
                AppError::Storage("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
