use serde_json::Value as JsonValue;
use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("PayPal authentication failed: status={http_status}, message={message}")]
    ProviderAuthError {
        http_status: u16,
        provider_code: Option<String>,
        debug_id: Option<String>,
        message: String,
    },

    #[error("PayPal API error: status={http_status}, code={}, message={message}", provider_code.as_deref().unwrap_or("unknown"))]
    ProviderApiError {
        http_status: u16,
        provider_code: Option<String>,
        debug_id: Option<String>,
        message: String,
        details: Option<JsonValue>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Unparseable PayPal response: {message}")]
    ResponseParseError { message: String },

    #[error("Unexpected PayPal response shape: {message}")]
    ExtractionError { message: String },

    #[error("Malformed amount '{value}': {reason}")]
    MalformedAmount { value: String, reason: String },
}

impl PaymentError {
    /// Business errors and contract drift are final; only transport failures and
    /// PayPal-side 5xx/429 may succeed on a later attempt by an outer layer.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ProviderAuthError { .. } => false,
            PaymentError::ProviderApiError { http_status, .. } => {
                *http_status == 429 || *http_status >= 500
            }
            PaymentError::NetworkError { .. } => true,
            PaymentError::ResponseParseError { .. } => false,
            PaymentError::ExtractionError { .. } => false,
            PaymentError::MalformedAmount { .. } => false,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::ProviderAuthError { .. } => 502,
            PaymentError::ProviderApiError { http_status, .. } => match *http_status {
                400..=499 => *http_status,
                _ => 502,
            },
            PaymentError::NetworkError { .. } => 503,
            PaymentError::ResponseParseError { .. } => 502,
            PaymentError::ExtractionError { .. } => 502,
            PaymentError::MalformedAmount { .. } => 400,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::ProviderAuthError { .. } => {
                "Payment provider rejected the connector credentials".to_string()
            }
            PaymentError::ProviderApiError { .. } => {
                "Payment provider returned an error".to_string()
            }
            PaymentError::NetworkError { .. } => {
                "Payment provider is temporarily unavailable".to_string()
            }
            PaymentError::ResponseParseError { .. } | PaymentError::ExtractionError { .. } => {
                "Payment provider returned an unexpected response".to_string()
            }
            PaymentError::MalformedAmount { value, reason } => {
                format!("Invalid amount '{}': {}", value, reason)
            }
        }
    }

    /// PayPal correlation id for support escalation, when PayPal sent one.
    pub fn debug_id(&self) -> Option<&str> {
        match self {
            PaymentError::ProviderAuthError { debug_id, .. }
            | PaymentError::ProviderApiError { debug_id, .. } => debug_id.as_deref(),
            _ => None,
        }
    }

    pub fn provider_code(&self) -> Option<&str> {
        match self {
            PaymentError::ProviderAuthError { provider_code, .. }
            | PaymentError::ProviderApiError { provider_code, .. } => provider_code.as_deref(),
            _ => None,
        }
    }

    /// First `details[].issue` of a PayPal error body, e.g. `INSTRUMENT_DECLINED`.
    pub fn issue(&self) -> Option<&str> {
        match self {
            PaymentError::ProviderApiError {
                details: Some(details),
                ..
            } => details
                .as_array()
                .and_then(|items| items.first())
                .and_then(|item| item.get("issue"))
                .and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

impl From<PaymentError> for crate::error::AppError {
    fn from(err: PaymentError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError, ValidationError};

        let kind = match &err {
            PaymentError::MalformedAmount { value, reason } => {
                AppErrorKind::Validation(ValidationError::InvalidAmount {
                    amount: value.clone(),
                    reason: reason.clone(),
                })
            }
            PaymentError::ProviderAuthError { debug_id, .. } => {
                AppErrorKind::External(ExternalError::ProviderAuth {
                    debug_id: debug_id.clone(),
                })
            }
            PaymentError::ProviderApiError {
                http_status,
                provider_code,
                debug_id,
                details,
                ..
            } => AppErrorKind::External(ExternalError::ProviderApi {
                provider_status: *http_status,
                provider_code: provider_code.clone(),
                debug_id: debug_id.clone(),
                details: details.clone(),
                is_retryable: err.is_retryable(),
            }),
            PaymentError::NetworkError { message } => {
                AppErrorKind::External(ExternalError::Network {
                    message: message.clone(),
                })
            }
            PaymentError::ResponseParseError { message }
            | PaymentError::ExtractionError { message } => {
                AppErrorKind::External(ExternalError::ContractViolation {
                    message: message.clone(),
                })
            }
        };

        AppError::new(kind).with_context(err.to_string())
    }
}
