use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{with_request_id, AppState};
use crate::error::{AppError, AppErrorKind, AuthError, ValidationError};
use crate::services::payment_orchestrator::{
    ConfirmPaymentResponse, CreateOrderPayload, CreatePaymentResponse,
};

pub const SESSION_HEADER: &str = "x-session-id";

/// Checkout session taken from `X-Session-Id`. Requests without one are
/// rejected before reaching a handler.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| SessionId(v.to_string()))
            .ok_or_else(|| {
                with_request_id(AppError::new(AppErrorKind::Auth(AuthError::MissingSession)), &parts.headers)
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOrderPayload {
    #[serde(default)]
    pub payment_reference: Option<String>,
}

fn invalid_body(message: String, headers: &HeaderMap) -> AppError {
    with_request_id(
        AppError::new(AppErrorKind::Validation(ValidationError::InvalidRequest { message })),
        headers,
    )
}

/// POST /checkout/orders
pub async fn create_order(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderPayload>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| invalid_body(e.body_text(), &headers))?;

    let response = state
        .orchestrator
        .create_payment(&session_id, payload)
        .await
        .map_err(|e| with_request_id(e, &headers))?;

    info!(order_id = %response.id, payment_reference = %response.payment_reference, "order created");
    Ok(Json(response))
}

/// POST /checkout/orders/{id}/capture
///
/// The body is optional; without `paymentReference` the payment is found
/// through the PayPal order's invoice id.
pub async fn capture_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    SessionId(_session_id): SessionId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ConfirmPaymentResponse>), AppError> {
    let payload: CaptureOrderPayload = if body.iter().all(u8::is_ascii_whitespace) {
        CaptureOrderPayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| invalid_body(e.to_string(), &headers))?
    };

    let response = state
        .orchestrator
        .confirm_payment(&order_id, payload.payment_reference.as_deref())
        .await
        .map_err(|e| with_request_id(e, &headers))?;

    Ok((StatusCode::CREATED, Json(response)))
}
