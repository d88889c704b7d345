use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{info, warn};

use super::{with_request_id, AppState};
use crate::error::AppError;
use crate::services::webhook_processor::WebhookProcessorError;

/// POST /notifications
pub async fn handle_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    info!("Received PayPal notification");

    match state.webhooks.process_webhook(&headers, &body).await {
        Ok(payment) => {
            info!(payment_id = %payment.id, "Notification processed successfully");
            Ok(StatusCode::OK)
        }
        Err(e @ WebhookProcessorError::InvalidSignature(_)) => {
            warn!(error = %e, "Rejected PayPal notification");
            Err(with_request_id(e, &headers))
        }
        Err(e) => Err(with_request_id(e, &headers)),
    }
}
