//! Unified error handling for the PayPal connector
//!
//! Every failure surfaced over HTTP is an [`AppError`]: a tagged kind with a
//! stable machine code, an HTTP status, a user-facing message and a retry hint.
//! Provider diagnostics (debug id, PayPal error name) travel as structured
//! details and never replace the user-facing message.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Machine-readable error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Domain errors (4xx)
    InterfaceIdMismatch,
    OperationNotSupported,
    NoCaptureToRefund,
    RefundExceedsCaptured,
    PaymentNotFound,
    CartNotFound,
    ConcurrentModification,

    // Input errors (4xx)
    UnsupportedEventType,
    InvalidAmountFormat,
    ValidationError,

    // Authentication (401)
    Unauthorized,
    InvalidWebhookSignature,

    // External errors (502, 503, 504)
    PaypalAuthError,
    PaypalApiError,
    PaypalNetworkError,
    PaypalContractViolation,

    // Infrastructure errors (5xx)
    ConfigurationError,
    CommerceBackendError,

    InternalError,
}

/// Business rule violations in the payment lifecycle
#[derive(Debug, Clone)]
pub enum DomainError {
    /// The order id supplied on confirm differs from the one stored at creation
    InterfaceIdMismatch { order_id: String, payment_id: String },
    /// Operation intentionally unavailable at this integration point
    NotSupported {
        operation: String,
        psp_reference: Option<String>,
    },
    /// Refund requested but the ledger has no successful charge
    NoCaptureToRefund { payment_id: String },
    /// Refund would exceed what is left of the planned amount
    RefundExceedsCaptured {
        payment_id: String,
        requested: u64,
        refundable: u64,
    },
    PaymentNotFound { payment_id: String },
    CartNotFound { reference: String },
    /// Version-checked update lost a race; retry with a fresh version
    ConcurrentModification {
        resource: String,
        expected_version: u64,
        actual_version: u64,
    },
}

/// Malformed input that cannot be processed
#[derive(Debug, Clone)]
pub enum ValidationError {
    UnsupportedEventType {
        event_type: String,
        payment_id: Option<String>,
    },
    InvalidAmountFormat { amount: String },
    InvalidAmount { amount: String, reason: String },
    InvalidRequest { message: String },
}

#[derive(Debug, Clone)]
pub enum AuthError {
    MissingSession,
    InvalidWebhookSignature { reason: String },
}

/// Failures talking to PayPal
#[derive(Debug, Clone)]
pub enum ExternalError {
    ProviderAuth {
        debug_id: Option<String>,
    },
    /// `provider_status` is PayPal's own status; clients see 4xx as-is and 5xx as 502
    ProviderApi {
        provider_status: u16,
        provider_code: Option<String>,
        debug_id: Option<String>,
        details: Option<JsonValue>,
        is_retryable: bool,
    },
    Network {
        message: String,
    },
    /// 2xx response that did not match the expected contract
    ContractViolation {
        message: String,
    },
}

#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Configuration { message: String },
    CommerceBackend { message: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Validation(ValidationError),
    Auth(AuthError),
    External(ExternalError),
    Infrastructure(InfrastructureError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InterfaceIdMismatch { .. } => 400,
                DomainError::NotSupported { .. } => 400,
                DomainError::NoCaptureToRefund { .. } => 422,
                DomainError::RefundExceedsCaptured { .. } => 422,
                DomainError::PaymentNotFound { .. } => 404,
                DomainError::CartNotFound { .. } => 404,
                DomainError::ConcurrentModification { .. } => 409,
            },
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::Auth(_) => 401,
            AppErrorKind::External(err) => match err {
                ExternalError::ProviderAuth { .. } => 502,
                ExternalError::ProviderApi {
                    provider_status, ..
                } => match *provider_status {
                    400..=499 => *provider_status,
                    _ => 502,
                },
                ExternalError::Network { .. } => 503,
                ExternalError::ContractViolation { .. } => 502,
            },
            AppErrorKind::Infrastructure(_) => 500,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InterfaceIdMismatch { .. } => ErrorCode::InterfaceIdMismatch,
                DomainError::NotSupported { .. } => ErrorCode::OperationNotSupported,
                DomainError::NoCaptureToRefund { .. } => ErrorCode::NoCaptureToRefund,
                DomainError::RefundExceedsCaptured { .. } => ErrorCode::RefundExceedsCaptured,
                DomainError::PaymentNotFound { .. } => ErrorCode::PaymentNotFound,
                DomainError::CartNotFound { .. } => ErrorCode::CartNotFound,
                DomainError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::UnsupportedEventType { .. } => ErrorCode::UnsupportedEventType,
                ValidationError::InvalidAmountFormat { .. } => ErrorCode::InvalidAmountFormat,
                _ => ErrorCode::ValidationError,
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingSession => ErrorCode::Unauthorized,
                AuthError::InvalidWebhookSignature { .. } => ErrorCode::InvalidWebhookSignature,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::ProviderAuth { .. } => ErrorCode::PaypalAuthError,
                ExternalError::ProviderApi { .. } => ErrorCode::PaypalApiError,
                ExternalError::Network { .. } => ErrorCode::PaypalNetworkError,
                ExternalError::ContractViolation { .. } => ErrorCode::PaypalContractViolation,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
                InfrastructureError::CommerceBackend { .. } => ErrorCode::CommerceBackendError,
            },
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InterfaceIdMismatch { .. } => {
                    "Not able to confirm the payment: order does not belong to this payment"
                        .to_string()
                }
                DomainError::NotSupported { operation, .. } => {
                    format!("Operation '{}' is not supported", operation)
                }
                DomainError::NoCaptureToRefund { payment_id } => {
                    format!("Payment '{}' has no successful charge to refund", payment_id)
                }
                DomainError::RefundExceedsCaptured {
                    requested,
                    refundable,
                    ..
                } => format!(
                    "Refund of {} exceeds the refundable amount of {}",
                    requested, refundable
                ),
                DomainError::PaymentNotFound { payment_id } => {
                    format!("Payment '{}' not found", payment_id)
                }
                DomainError::CartNotFound { .. } => {
                    "No active cart found for this checkout session".to_string()
                }
                DomainError::ConcurrentModification { resource, .. } => format!(
                    "{} was modified concurrently. Please retry with the latest version",
                    resource
                ),
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::UnsupportedEventType { event_type, .. } => {
                    format!("Unsupported event type '{}'", event_type)
                }
                ValidationError::InvalidAmountFormat { amount } => {
                    format!("Invalid amount format '{}'", amount)
                }
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::InvalidRequest { message } => message.clone(),
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingSession => "A valid checkout session is required".to_string(),
                AuthError::InvalidWebhookSignature { .. } => {
                    "Webhook signature is not valid".to_string()
                }
            },
            AppErrorKind::External(err) => match err {
                ExternalError::ProviderAuth { .. } => {
                    "Error while authenticating with payment provider".to_string()
                }
                ExternalError::ProviderApi { is_retryable, .. } => {
                    if *is_retryable {
                        "Payment provider is temporarily unavailable. Please try again".to_string()
                    } else {
                        "Payment provider rejected the request".to_string()
                    }
                }
                ExternalError::Network { .. } => {
                    "Payment provider is temporarily unavailable. Please try again".to_string()
                }
                ExternalError::ContractViolation { .. } => {
                    "Payment provider returned an unexpected response. Please contact support"
                        .to_string()
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(err) => {
                matches!(err, DomainError::ConcurrentModification { .. })
            }
            AppErrorKind::Validation(_) => false,
            AppErrorKind::Auth(_) => false,
            AppErrorKind::External(err) => match err {
                ExternalError::ProviderAuth { .. } => false,
                ExternalError::ProviderApi { is_retryable, .. } => *is_retryable,
                ExternalError::Network { .. } => true,
                ExternalError::ContractViolation { .. } => false,
            },
            AppErrorKind::Infrastructure(err) => {
                matches!(err, InfrastructureError::CommerceBackend { .. })
            }
        }
    }

    /// Diagnostic fields attached to the response body
    pub fn details(&self) -> Option<JsonValue> {
        match &self.kind {
            AppErrorKind::External(ExternalError::ProviderApi {
                provider_status,
                provider_code,
                debug_id,
                details,
                ..
            }) => Some(serde_json::json!({
                "providerStatus": provider_status,
                "providerCode": provider_code,
                "debugId": debug_id,
                "issues": details,
            })),
            AppErrorKind::External(ExternalError::ProviderAuth { debug_id }) => {
                debug_id.as_ref().map(|id| serde_json::json!({ "debugId": id }))
            }
            AppErrorKind::Domain(DomainError::InterfaceIdMismatch {
                order_id,
                payment_id,
            }) => Some(serde_json::json!({
                "pspReference": order_id,
                "paymentReference": payment_id,
            })),
            AppErrorKind::Domain(DomainError::NotSupported {
                psp_reference: Some(psp_reference),
                ..
            }) => Some(serde_json::json!({ "pspReference": psp_reference })),
            AppErrorKind::Validation(ValidationError::UnsupportedEventType {
                event_type,
                payment_id,
            }) => Some(serde_json::json!({
                "eventType": event_type,
                "paymentId": payment_id,
            })),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: err.to_string(),
            },
        ))
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
