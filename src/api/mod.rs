//! HTTP surface of the connector

pub mod checkout;
pub mod operations;
pub mod webhooks;

use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::health::HealthChecker;
use crate::middleware::error::get_request_id_from_headers;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::services::{PaymentOrchestrator, WebhookProcessor};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub webhooks: Arc<WebhookProcessor>,
    pub health_checker: HealthChecker,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/checkout/orders", post(checkout::create_order))
        .route("/checkout/orders/{id}/capture", post(checkout::capture_order))
        .route("/notifications", post(webhooks::handle_notification))
        .route("/operations/config", get(operations::get_config))
        .route("/operations/status", get(operations::get_status))
        .route(
            "/operations/payment-components",
            get(operations::get_payment_components),
        )
        .route(
            "/operations/payment-intents/{payment_id}",
            post(operations::modify_payment),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Converts a service error and stamps it with the caller's request id.
pub(crate) fn with_request_id(err: impl Into<AppError>, headers: &HeaderMap) -> AppError {
    let err = err.into();
    match get_request_id_from_headers(headers) {
        Some(request_id) => err.with_request_id(request_id),
        None => err,
    }
}
