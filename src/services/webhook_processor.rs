use http::HeaderMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::commerce::PaymentRecord;
use crate::error::{AppError, AppErrorKind, AuthError, ValidationError};
use crate::payments::error::PaymentError;
use crate::payments::provider::PaypalOrderApi;
use crate::payments::types::{NotificationVerificationRequest, VerificationStatus, WebhookNotification};
use crate::services::payment_orchestrator::{OrchestratorError, PaymentOrchestrator};

pub const AUTH_ALGO_HEADER: &str = "paypal-auth-algo";
pub const CERT_URL_HEADER: &str = "paypal-cert-url";
pub const TRANSMISSION_ID_HEADER: &str = "paypal-transmission-id";
pub const TRANSMISSION_SIG_HEADER: &str = "paypal-transmission-sig";
pub const TRANSMISSION_TIME_HEADER: &str = "paypal-transmission-time";

#[derive(Debug, Error)]
pub enum WebhookProcessorError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Malformed notification: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Verification(#[from] PaymentError),
    #[error(transparent)]
    Processing(#[from] OrchestratorError),
}

impl From<WebhookProcessorError> for AppError {
    fn from(err: WebhookProcessorError) -> Self {
        match err {
            WebhookProcessorError::InvalidSignature(reason) => {
                AppError::new(AppErrorKind::Auth(AuthError::InvalidWebhookSignature {
                    reason: reason.clone(),
                }))
                .with_context(reason)
            }
            WebhookProcessorError::MalformedPayload(message) => {
                AppError::new(AppErrorKind::Validation(ValidationError::InvalidRequest {
                    message: message.clone(),
                }))
                .with_context(message)
            }
            WebhookProcessorError::Verification(e) => e.into(),
            WebhookProcessorError::Processing(e) => e.into(),
        }
    }
}

/// Authenticates PayPal webhook deliveries against PayPal's verify endpoint,
/// then hands the event to the orchestrator.
pub struct WebhookProcessor {
    paypal: Arc<dyn PaypalOrderApi>,
    orchestrator: Arc<PaymentOrchestrator>,
    webhook_id: String,
}

impl WebhookProcessor {
    pub fn new(
        paypal: Arc<dyn PaypalOrderApi>,
        orchestrator: Arc<PaymentOrchestrator>,
        webhook_id: String,
    ) -> Self {
        Self {
            paypal,
            orchestrator,
            webhook_id,
        }
    }

    pub async fn process_webhook(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<PaymentRecord, WebhookProcessorError> {
        let event: JsonValue = serde_json::from_slice(body)
            .map_err(|e| WebhookProcessorError::InvalidSignature(format!("body is not JSON: {}", e)))?;

        self.verify(headers, &event).await?;

        let notification: WebhookNotification = serde_json::from_value(event)
            .map_err(|e| WebhookProcessorError::MalformedPayload(e.to_string()))?;

        info!(
            event_id = notification.id.as_deref().unwrap_or("-"),
            event_type = %notification.event_type,
            "Processing PayPal notification"
        );

        Ok(self.orchestrator.process_notification(&notification).await?)
    }

    async fn verify(
        &self,
        headers: &HeaderMap,
        event: &JsonValue,
    ) -> Result<(), WebhookProcessorError> {
        if event.get("resource").is_none() {
            return Err(WebhookProcessorError::InvalidSignature(
                "notification has no resource".to_string(),
            ));
        }

        let request = build_verification_request(headers, &self.webhook_id, event.clone())?;
        let transmission_id = request.transmission_id.clone();
        let response = self.paypal.verify_webhook_signature(request).await?;

        match response.verification_status {
            VerificationStatus::Success => Ok(()),
            VerificationStatus::Failure => {
                warn!(transmission_id = %transmission_id, "PayPal rejected webhook signature");
                Err(WebhookProcessorError::InvalidSignature(
                    "verification status FAILURE".to_string(),
                ))
            }
        }
    }
}

pub fn build_verification_request(
    headers: &HeaderMap,
    webhook_id: &str,
    event: JsonValue,
) -> Result<NotificationVerificationRequest, WebhookProcessorError> {
    Ok(NotificationVerificationRequest {
        auth_algo: single_header(headers, AUTH_ALGO_HEADER)?,
        cert_url: single_header(headers, CERT_URL_HEADER)?,
        transmission_id: single_header(headers, TRANSMISSION_ID_HEADER)?,
        transmission_sig: single_header(headers, TRANSMISSION_SIG_HEADER)?,
        transmission_time: single_header(headers, TRANSMISSION_TIME_HEADER)?,
        webhook_id: webhook_id.to_string(),
        webhook_event: event,
    })
}

/// Exactly one occurrence, valid visible ASCII.
fn single_header(headers: &HeaderMap, name: &str) -> Result<String, WebhookProcessorError> {
    let mut values = headers.get_all(name).iter();
    match (values.next(), values.next()) {
        (Some(value), None) => value
            .to_str()
            .map(str::to_string)
            .map_err(|_| WebhookProcessorError::InvalidSignature(format!("{} is not valid", name))),
        (None, _) => Err(WebhookProcessorError::InvalidSignature(format!(
            "missing {} header",
            name
        ))),
        (Some(_), Some(_)) => Err(WebhookProcessorError::InvalidSignature(format!(
            "{} header sent more than once",
            name
        ))),
    }
}
