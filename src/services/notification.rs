//! Maps PayPal webhook events onto ledger updates.

use crate::commerce::{TransactionDraft, TransactionState, TransactionType};
use crate::error::{AppError, AppErrorKind, ValidationError};
use crate::payments::amount::{from_decimal_string, Money};
use crate::payments::types::WebhookNotification;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEventType {
    CaptureCompleted,
    CaptureDeclined,
    CaptureRefunded,
    CaptureReversed,
}

impl NotificationEventType {
    /// Accepts PayPal's dotted names (`PAYMENT.CAPTURE.COMPLETED`) and the
    /// underscore spelling.
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type.replace('.', "_").as_str() {
            "PAYMENT_CAPTURE_COMPLETED" => Some(Self::CaptureCompleted),
            "PAYMENT_CAPTURE_DECLINED" => Some(Self::CaptureDeclined),
            "PAYMENT_CAPTURE_REFUNDED" => Some(Self::CaptureRefunded),
            "PAYMENT_CAPTURE_REVERSED" => Some(Self::CaptureReversed),
            _ => None,
        }
    }

    pub fn transaction(&self) -> (TransactionType, TransactionState) {
        match self {
            Self::CaptureCompleted => (TransactionType::Charge, TransactionState::Success),
            Self::CaptureDeclined => (TransactionType::Charge, TransactionState::Failure),
            Self::CaptureRefunded | Self::CaptureReversed => {
                (TransactionType::Refund, TransactionState::Success)
            }
        }
    }
}

/// Ledger row to append to the payment named by the event's invoice id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerUpdateInstruction {
    pub payment_id: String,
    pub transaction: TransactionDraft,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("unsupported notification event type '{event_type}' for payment {payment_id}")]
    UnsupportedEventType {
        event_type: String,
        payment_id: String,
    },

    #[error("invalid amount format '{amount}'")]
    InvalidAmountFormat { amount: String },
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        let context = err.to_string();
        let kind = match err {
            NotificationError::UnsupportedEventType {
                event_type,
                payment_id,
            } => ValidationError::UnsupportedEventType {
                event_type,
                payment_id: Some(payment_id),
            },
            NotificationError::InvalidAmountFormat { amount } => {
                ValidationError::InvalidAmountFormat { amount }
            }
        };
        AppError::new(AppErrorKind::Validation(kind)).with_context(context)
    }
}

pub struct NotificationConverter;

impl NotificationConverter {
    /// Pure mapping: the same notification always yields the same instruction.
    pub fn convert(
        notification: &WebhookNotification,
    ) -> Result<LedgerUpdateInstruction, NotificationError> {
        let resource = &notification.resource;

        let event = NotificationEventType::parse(&notification.event_type).ok_or_else(|| {
            NotificationError::UnsupportedEventType {
                event_type: notification.event_type.clone(),
                payment_id: resource.invoice_id.clone(),
            }
        })?;

        let cent_amount = from_decimal_string(&resource.amount.value).map_err(|_| {
            NotificationError::InvalidAmountFormat {
                amount: resource.amount.value.clone(),
            }
        })?;

        let (transaction_type, state) = event.transaction();

        Ok(LedgerUpdateInstruction {
            payment_id: resource.invoice_id.clone(),
            transaction: TransactionDraft {
                transaction_type,
                state,
                amount: Money::new(&resource.amount.currency_code, cent_amount),
                interaction_id: Some(resource.id.clone()),
            },
        })
    }
}
