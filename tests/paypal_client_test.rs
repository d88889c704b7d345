//! Drives `PaypalClient` against a local stand-in for the PayPal REST API.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use paypal_connector::config::{PaypalConfig, PaypalEnvironment};
use paypal_connector::payments::amount::Money;
use paypal_connector::payments::error::PaymentError;
use paypal_connector::payments::types::{
    CreateOrderRequest, Intent, OrderStatus, PaymentSource, PaypalAmount, PurchaseUnit,
};
use paypal_connector::payments::{PaypalClient, PaypalOrderApi};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const TOKEN: &str = "A21AAFEpH4PsADK7qSS7pSRsgz";

#[derive(Clone)]
struct Scripted {
    status: StatusCode,
    debug_id: Option<&'static str>,
    body: String,
}

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: String,
}

#[derive(Clone, Default)]
struct FakeApi {
    responses: Arc<Mutex<HashMap<String, Scripted>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeApi {
    fn respond(&self, path: &str, status: StatusCode, body: Value) {
        self.respond_raw(path, status, None, body.to_string());
    }

    fn respond_raw(&self, path: &str, status: StatusCode, debug_id: Option<&'static str>, body: String) {
        self.responses.lock().unwrap().insert(
            path.to_string(),
            Scripted {
                status,
                debug_id,
                body,
            },
        );
    }

    fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

async fn handle(
    State(api): State<FakeApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    api.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });

    let scripted = api.responses.lock().unwrap().get(uri.path()).cloned();
    match scripted {
        Some(scripted) => {
            let mut response = (scripted.status, scripted.body).into_response();
            if let Some(debug_id) = scripted.debug_id {
                response
                    .headers_mut()
                    .insert("paypal-debug-id", HeaderValue::from_static(debug_id));
            }
            response
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start() -> (FakeApi, PaypalClient) {
    let api = FakeApi::default();
    api.respond(
        "/v1/oauth2/token",
        StatusCode::OK,
        json!({ "access_token": TOKEN, "token_type": "Bearer", "expires_in": 32400 }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(handle).with_state(api.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = PaypalClient::new(&PaypalConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        environment: PaypalEnvironment::Sandbox,
        webhook_id: "8PT597110X687430LKGECATA".to_string(),
        partner_attribution_id: "commercetools_Cart_PPCP".to_string(),
        request_timeout_secs: 5,
        base_url_override: Some(format!("http://{}", addr)),
    })
    .unwrap();

    (api, client)
}

fn order_request() -> CreateOrderRequest {
    CreateOrderRequest {
        intent: Intent::Capture,
        purchase_units: vec![PurchaseUnit {
            invoice_id: Some("pay-1".to_string()),
            amount: Some(PaypalAmount::from(&Money::new("EUR", 74600))),
            ..PurchaseUnit::default()
        }],
        payment_source: PaymentSource::default(),
    }
}

fn header<'a>(recorded: &'a Recorded, name: &str) -> Option<&'a str> {
    recorded.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn token_request_uses_client_credentials() {
    let (api, client) = start().await;

    let token = client.authenticate().await.unwrap();
    assert_eq!(token.access_token, TOKEN);

    let calls = api.requests_to("/v1/oauth2/token");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(header(&calls[0], "authorization"), Some("Basic Y2xpZW50OnNlY3JldA=="));
    assert_eq!(
        header(&calls[0], "content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(calls[0].body, "grant_type=client_credentials");
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_error() {
    let (api, client) = start().await;
    api.respond_raw(
        "/v1/oauth2/token",
        StatusCode::UNAUTHORIZED,
        Some("b1c3a9d2f0e11"),
        json!({ "error": "invalid_client", "error_description": "Client Authentication failed" })
            .to_string(),
    );

    let err = client.get_order("2WJ067824R598984A").await.unwrap_err();

    match &err {
        PaymentError::ProviderAuthError {
            http_status,
            provider_code,
            message,
            ..
        } => {
            assert_eq!(*http_status, 401);
            assert_eq!(provider_code.as_deref(), Some("invalid_client"));
            assert_eq!(message, "Client Authentication failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.debug_id(), Some("b1c3a9d2f0e11"));
    assert!(api.requests_to("/v2/checkout/orders/2WJ067824R598984A").is_empty());
}

#[tokio::test]
async fn create_order_sends_idempotency_and_attribution_headers() {
    let (api, client) = start().await;
    api.respond(
        "/v2/checkout/orders",
        StatusCode::OK,
        json!({ "id": "2WJ067824R598984A", "status": "PAYER_ACTION_REQUIRED" }),
    );

    let first = client.create_order(order_request()).await.unwrap();
    client.create_order(order_request()).await.unwrap();

    assert_eq!(first.id, "2WJ067824R598984A");
    assert_eq!(first.status, OrderStatus::PayerActionRequired);

    let calls = api.requests_to("/v2/checkout/orders");
    assert_eq!(calls.len(), 2);
    assert_eq!(header(&calls[0], "authorization"), Some(format!("Bearer {}", TOKEN).as_str()));
    assert_eq!(
        header(&calls[0], "paypal-partner-attribution-id"),
        Some("commercetools_Cart_PPCP")
    );

    let first_id = header(&calls[0], "paypal-request-id").unwrap();
    let second_id = header(&calls[1], "paypal-request-id").unwrap();
    assert!(uuid::Uuid::parse_str(first_id).is_ok());
    assert_ne!(first_id, second_id);

    let sent: Value = serde_json::from_str(&calls[0].body).unwrap();
    assert_eq!(sent["intent"], "CAPTURE");
    assert_eq!(sent["purchase_units"][0]["invoice_id"], "pay-1");
    assert_eq!(sent["purchase_units"][0]["amount"]["value"], "746.00");

    // one token per call
    assert_eq!(api.requests_to("/v1/oauth2/token").len(), 2);
}

#[tokio::test]
async fn get_order_carries_no_idempotency_key() {
    let (api, client) = start().await;
    api.respond(
        "/v2/checkout/orders/2WJ067824R598984A",
        StatusCode::OK,
        json!({
            "id": "2WJ067824R598984A",
            "status": "APPROVED",
            "purchase_units": [{ "invoice_id": "pay-1" }]
        }),
    );

    let order = client.get_order("2WJ067824R598984A").await.unwrap();
    assert_eq!(order.invoice_id(), Some("pay-1"));

    let calls = api.requests_to("/v2/checkout/orders/2WJ067824R598984A");
    assert_eq!(calls[0].method, Method::GET);
    assert!(header(&calls[0], "paypal-request-id").is_none());
}

#[tokio::test]
async fn capture_extracts_first_capture() {
    let (api, client) = start().await;
    api.respond(
        "/v2/checkout/orders/2WJ067824R598984A/capture",
        StatusCode::CREATED,
        json!({
            "id": "2WJ067824R598984A",
            "status": "COMPLETED",
            "purchase_units": [{
                "reference_id": "default",
                "payments": { "captures": [{
                    "id": "0CK67015SC9955729",
                    "status": "COMPLETED",
                    "amount": { "currency_code": "EUR", "value": "746.00" }
                }]}
            }]
        }),
    );

    let result = client.capture_order("2WJ067824R598984A").await.unwrap();
    assert_eq!(result.capture_id, "0CK67015SC9955729");
    assert_eq!(result.capture_status, "COMPLETED");
    assert!(result.is_completed());
}

#[tokio::test]
async fn declined_capture_keeps_paypal_error_details() {
    let (api, client) = start().await;
    api.respond_raw(
        "/v2/checkout/orders/2WJ067824R598984A/capture",
        StatusCode::UNPROCESSABLE_ENTITY,
        Some("header-debug-id"),
        json!({
            "name": "UNPROCESSABLE_ENTITY",
            "message": "The requested action could not be performed.",
            "debug_id": "f3a9e2c1b0d47",
            "details": [{ "issue": "INSTRUMENT_DECLINED", "description": "The instrument presented was declined." }]
        })
        .to_string(),
    );

    let err = client.capture_order("2WJ067824R598984A").await.unwrap_err();

    assert_eq!(err.http_status_code(), 422);
    assert_eq!(err.provider_code(), Some("UNPROCESSABLE_ENTITY"));
    assert_eq!(err.debug_id(), Some("f3a9e2c1b0d47"));
    assert_eq!(err.issue(), Some("INSTRUMENT_DECLINED"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_without_body_is_retryable() {
    let (api, client) = start().await;
    api.respond_raw(
        "/v2/checkout/orders/2WJ067824R598984A/capture",
        StatusCode::SERVICE_UNAVAILABLE,
        Some("c0ffee0ddba11"),
        String::new(),
    );

    let err = client.capture_order("2WJ067824R598984A").await.unwrap_err();

    match &err {
        PaymentError::ProviderApiError {
            http_status,
            message,
            ..
        } => {
            assert_eq!(*http_status, 503);
            assert_eq!(message, "Service Unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.debug_id(), Some("c0ffee0ddba11"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unparseable_success_body_is_parse_error() {
    let (api, client) = start().await;
    api.respond_raw(
        "/v2/checkout/orders/2WJ067824R598984A/capture",
        StatusCode::OK,
        None,
        "<html>gateway</html>".to_string(),
    );

    let err = client.capture_order("2WJ067824R598984A").await.unwrap_err();
    assert!(matches!(err, PaymentError::ResponseParseError { .. }));
}

#[tokio::test]
async fn partial_refund_sends_amount_and_full_refund_sends_empty_body() {
    let (api, client) = start().await;
    let path = "/v2/payments/captures/0CK67015SC9955729/refund";
    api.respond(
        path,
        StatusCode::CREATED,
        json!({ "id": "1JU08902781691411", "status": "COMPLETED" }),
    );

    let partial = client
        .refund_partial_payment("0CK67015SC9955729", &Money::new("EUR", 3000))
        .await
        .unwrap();
    client.refund_full_payment("0CK67015SC9955729").await.unwrap();

    assert_eq!(partial.id, "1JU08902781691411");
    let calls = api.requests_to(path);
    assert_eq!(calls.len(), 2);
    let partial_body: Value = serde_json::from_str(&calls[0].body).unwrap();
    assert_eq!(
        partial_body,
        json!({ "amount": { "currency_code": "EUR", "value": "30.00" } })
    );
    let full_body: Value = serde_json::from_str(&calls[1].body).unwrap();
    assert_eq!(full_body, json!({}));
}

#[tokio::test]
async fn partial_refund_in_zero_decimal_currency_never_leaves() {
    let (api, client) = start().await;

    let err = client
        .refund_partial_payment("0CK67015SC9955729", &Money::new("JPY", 3000))
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::MalformedAmount { .. }));
    assert!(api.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_check_reports_unreachable_api() {
    let (api, client) = start().await;
    api.respond(
        "/v1/notifications/webhooks-event-types",
        StatusCode::OK,
        json!({ "event_types": [] }),
    );
    client.health_check().await.unwrap();

    api.respond(
        "/v1/notifications/webhooks-event-types",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({}),
    );
    assert!(client.health_check().await.is_err());
}
