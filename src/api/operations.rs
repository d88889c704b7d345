use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{with_request_id, AppState};
use crate::error::{AppError, AppErrorKind, ValidationError};
use crate::health::HealthStatus;
use crate::services::payment_orchestrator::{
    ConnectorConfigResponse, ModifyPaymentRequest, ModifyPaymentResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentComponent {
    #[serde(rename = "type")]
    pub component_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportedPaymentComponents {
    pub components: Vec<PaymentComponent>,
}

/// GET /operations/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConnectorConfigResponse> {
    Json(state.orchestrator.config())
}

/// GET /operations/status
pub async fn get_status(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let health_status = state.health_checker.check_health().await;
    if health_status.is_healthy() {
        (StatusCode::OK, Json(health_status))
    } else {
        error!("Status check failed - PayPal unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, Json(health_status))
    }
}

/// GET /operations/payment-components
pub async fn get_payment_components() -> Json<SupportedPaymentComponents> {
    Json(SupportedPaymentComponents {
        components: vec![PaymentComponent {
            component_type: "paypal".to_string(),
        }],
    })
}

/// POST /operations/payment-intents/{payment_id}
pub async fn modify_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    headers: HeaderMap,
    request: Result<Json<ModifyPaymentRequest>, JsonRejection>,
) -> Result<Json<ModifyPaymentResponse>, AppError> {
    let Json(request) = request.map_err(|e| {
        with_request_id(
            AppError::new(AppErrorKind::Validation(ValidationError::InvalidRequest {
                message: e.body_text(),
            })),
            &headers,
        )
    })?;

    info!(payment_id = %payment_id, "payment modification requested");

    let response = state
        .orchestrator
        .modify_payment(&payment_id, request)
        .await
        .map_err(|e| with_request_id(e, &headers))?;

    Ok(Json(response))
}
