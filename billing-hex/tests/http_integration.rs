//! HTTP-level integration tests.
//!
//! Drive the full router (handlers, services, registry) over the in-memory
//! repository.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use billing_hex::{
    Services,
    inbound::{HttpConfig, HttpServer, USER_ID_HEADER},
};
use billing_repo::MemoryRepo;
use billing_types::UserId;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let repo = MemoryRepo::new();
    let services = Services::new(repo.clone(), repo);
    let config = HttpConfig {
        api_host: "billing.test".into(),
        limit_default: 2,
        limit_max: 3,
    };
    HttpServer::new(services, config).router()
}

fn request(
    method: Method,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn invoice_body() -> Value {
    json!({
        "invoice_number": "INV-100",
        "currency": "USD",
        "bill_to": { "first_name": "John", "last_name": "Smith", "city": "Chicago" },
        "line_items": [{ "name": "Widget", "quantity": 1, "price": 100 }],
        "payment_methods": ["card"]
    })
}

async fn create_invoice(app: &Router, user: UserId) -> Value {
    let (status, invoice) = send(
        app,
        request(Method::POST, "/api/v1/invoices", Some(user), Some(invoice_body())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    invoice
}

#[tokio::test]
async fn test_health() {
    let app = app();

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_invoice_requires_user() {
    let app = app();

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/invoices", None, Some(invoice_body())),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_invoice() {
    let app = app();
    let user = UserId::new();

    let invoice = create_invoice(&app, user).await;

    assert_eq!(invoice["amount_due"], 100);
    assert_eq!(invoice["amount_paid"], 0);
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["user_id"], user.to_string());
}

#[tokio::test]
async fn test_create_invoice_with_bogus_payment_method() {
    let app = app();
    let mut body = invoice_body();
    body["payment_methods"] = json!(["bogus"]);

    let (status, err) = send(
        &app,
        request(Method::POST, "/api/v1/invoices", Some(UserId::new()), Some(body)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["fields"][0]["field"], "payment_methods");
}

#[tokio::test]
async fn test_other_users_invoice_is_not_found() {
    let app = app();
    let invoice = create_invoice(&app, UserId::new()).await;
    let uri = format!("/api/v1/invoices/{}", invoice["id"].as_str().unwrap());

    let (status, _) = send(&app, request(Method::GET, &uri, Some(UserId::new()), None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_delete_invoice() {
    let app = app();
    let user = UserId::new();
    let invoice = create_invoice(&app, user).await;
    let uri = format!("/api/v1/invoices/{}", invoice["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        request(
            Method::PATCH,
            &uri,
            Some(user),
            Some(json!({ "bill_to": { "city": "Denver" }, "tax_rate": "5" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["bill_to"]["city"], "Denver");
    assert_eq!(updated["bill_to"]["first_name"], "John");
    assert_eq!(updated["amount_due"], 105);

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(user), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request(Method::GET, &uri, Some(user), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_invoices_paginates() {
    let app = app();
    let user = UserId::new();
    for _ in 0..3 {
        create_invoice(&app, user).await;
    }
    create_invoice(&app, UserId::new()).await;

    let (status, page) = send(
        &app,
        request(Method::GET, "/api/v1/invoices", Some(user), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["meta"]["total"], 3);
    assert_eq!(page["meta"]["limit"], 2);
    assert_eq!(page["links"]["prev"], Value::Null);
    assert_eq!(
        page["links"]["next"],
        "http://billing.test/api/v1/invoices?offset=2&limit=2"
    );

    let (_, capped) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/invoices?offset=1&limit=50",
            Some(user),
            None,
        ),
    )
    .await;
    assert_eq!(capped["meta"]["limit"], 3);
    assert_eq!(capped["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        capped["links"]["prev"],
        "http://billing.test/api/v1/invoices?offset=0&limit=3"
    );
    assert_eq!(capped["links"]["next"], Value::Null);
}

#[tokio::test]
async fn test_pay_and_refund_through_public_link() {
    let app = app();
    let user = UserId::new();
    let invoice = create_invoice(&app, user).await;
    let hash = invoice["public_hash"].as_str().unwrap();

    let (status, public) = send(
        &app,
        request(Method::GET, &format!("/api/v1/public/invoices/{}", hash), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["id"], invoice["id"]);

    let pay = json!({
        "amount": 100,
        "payment_method": { "card": { "number": "4111111111111111", "expiration_date": "1230" } }
    });
    let pay_uri = format!("/api/v1/public/invoices/{}/pay", hash);

    let (status, paid) = send(
        &app,
        request(Method::POST, &pay_uri, None, Some(pay.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["amount_due"], 0);
    assert_eq!(paid["amount_paid"], 100);
    assert_eq!(paid["status"], "paid");

    // Paying twice is rejected and changes nothing.
    let (status, _) = send(&app, request(Method::POST, &pay_uri, None, Some(pay))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, refund) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/transactions",
            Some(user),
            Some(json!({
                "transaction_type": "refund",
                "amount": 100,
                "invoice_id": invoice["id"],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(refund["transaction_type"], "refund");

    let uri = format!("/api/v1/invoices/{}", invoice["id"].as_str().unwrap());
    let (_, reopened) = send(&app, request(Method::GET, &uri, Some(user), None)).await;
    assert_eq!(reopened["amount_due"], 100);
    assert_eq!(reopened["amount_paid"], 0);
    assert_eq!(reopened["status"], "pending");

    let tx_uri = format!("/api/v1/transactions/{}", refund["id"].as_str().unwrap());
    let (status, fetched) = send(&app, request(Method::GET, &tx_uri, Some(user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["amount_captured"], 100);
}

#[tokio::test]
async fn test_pay_over_ceiling_is_rejected() {
    let app = app();
    let invoice = create_invoice(&app, UserId::new()).await;
    let pay_uri = format!(
        "/api/v1/public/invoices/{}/pay",
        invoice["public_hash"].as_str().unwrap()
    );

    let (status, err) = send(
        &app,
        request(
            Method::POST,
            &pay_uri,
            None,
            Some(json!({ "amount": 1_000_001 })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["fields"][0]["field"], "amount");
}

#[tokio::test]
async fn test_invalid_invoice_id_is_bad_request() {
    let app = app();

    let (status, err) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/invoices/not-a-uuid",
            Some(UserId::new()),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["fields"][0]["field"], "id");
}
