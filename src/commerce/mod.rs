//! Commerce platform records and the services that own them.
//!
//! The connector never stores carts or payments itself. It reads and mutates
//! them through [`CartService`] and [`PaymentService`], whose updates are
//! version-checked at the boundary.

pub mod memory;

use crate::error::{AppError, AppErrorKind, DomainError, InfrastructureError};
use crate::payments::amount::Money;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryCommerce;

pub const PAYMENT_INTERFACE: &str = "paypal";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub additional_street_info: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub version: u64,
    pub customer_id: Option<String>,
    pub total_price: Money,
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub payment_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionType {
    Authorization,
    CancelAuthorization,
    Charge,
    Refund,
    Chargeback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionState {
    Initial,
    Pending,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub state: TransactionState,
    pub amount: Money,
    pub interaction_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Ledger row to append. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub state: TransactionState,
    pub amount: Money,
    pub interaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInfo {
    pub payment_interface: String,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub version: u64,
    pub amount_planned: Money,
    pub payment_method_info: PaymentMethodInfo,
    pub interface_id: Option<String>,
    pub customer_id: Option<String>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl PaymentRecord {
    /// Most recent successful Charge, the capture a refund is issued against.
    pub fn last_successful_charge(&self) -> Option<&Transaction> {
        self.transactions.iter().rev().find(|t| {
            t.transaction_type == TransactionType::Charge && t.state == TransactionState::Success
        })
    }

    pub fn refunded_amount(&self) -> u64 {
        self.transactions
            .iter()
            .filter(|t| {
                t.transaction_type == TransactionType::Refund
                    && t.state == TransactionState::Success
            })
            .map(|t| t.amount.cent_amount)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDraft {
    pub amount_planned: Money,
    pub payment_method_info: PaymentMethodInfo,
    pub customer_id: Option<String>,
}

/// Update actions the connector is allowed to apply to a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentUpdateAction {
    AddTransaction(TransactionDraft),
    SetInterfaceId(String),
    SetMethodInfoMethod(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommerceError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    #[error("{resource} version conflict: expected {expected}, actual {actual}")]
    ConcurrentModification {
        resource: String,
        expected: u64,
        actual: u64,
    },

    #[error("commerce backend error: {message}")]
    Backend { message: String },
}

impl CommerceError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommerceError::ConcurrentModification { .. } | CommerceError::Backend { .. }
        )
    }
}

pub type CommerceResult<T> = Result<T, CommerceError>;

impl From<CommerceError> for AppError {
    fn from(err: CommerceError) -> Self {
        let context = err.to_string();
        let kind = match err {
            CommerceError::NotFound { resource, id } if resource == "Cart" => {
                AppErrorKind::Domain(DomainError::CartNotFound { reference: id })
            }
            CommerceError::NotFound { id, .. } => {
                AppErrorKind::Domain(DomainError::PaymentNotFound { payment_id: id })
            }
            CommerceError::ConcurrentModification {
                resource,
                expected,
                actual,
            } => AppErrorKind::Domain(DomainError::ConcurrentModification {
                resource,
                expected_version: expected,
                actual_version: actual,
            }),
            CommerceError::Backend { message } => {
                AppErrorKind::Infrastructure(InfrastructureError::CommerceBackend { message })
            }
        };
        AppError::new(kind).with_context(context)
    }
}

#[async_trait]
pub trait CartService: Send + Sync {
    /// Active cart bound to a checkout session.
    async fn get_cart_for_session(&self, session_id: &str) -> CommerceResult<Cart>;

    /// Amount the shopper owes for the cart. Authoritative over anything the
    /// client sends.
    async fn get_planned_amount(&self, cart: &Cart) -> CommerceResult<Money>;

    async fn add_payment(&self, cart: &Cart, payment_id: &str) -> CommerceResult<Cart>;
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn create_payment(&self, draft: PaymentDraft) -> CommerceResult<PaymentRecord>;

    async fn get_payment(&self, payment_id: &str) -> CommerceResult<PaymentRecord>;

    /// Applies `actions` if `version` is still current.
    async fn update_payment(
        &self,
        payment_id: &str,
        version: u64,
        actions: Vec<PaymentUpdateAction>,
    ) -> CommerceResult<PaymentRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(transaction_type: TransactionType, state: TransactionState, cents: u64, id: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            transaction_type,
            state,
            amount: Money::new("EUR", cents),
            interaction_id: Some(id.to_string()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn finds_latest_successful_charge_and_refund_total() {
        let payment = PaymentRecord {
            id: "pay-1".to_string(),
            version: 5,
            amount_planned: Money::new("EUR", 5000),
            payment_method_info: PaymentMethodInfo::default(),
            interface_id: Some("ORDER".to_string()),
            customer_id: None,
            transactions: vec![
                tx(TransactionType::Charge, TransactionState::Success, 5000, "CAP-1"),
                tx(TransactionType::Charge, TransactionState::Failure, 5000, "CAP-2"),
                tx(TransactionType::Refund, TransactionState::Success, 1000, "R-1"),
                tx(TransactionType::Refund, TransactionState::Failure, 700, "R-2"),
            ],
        };
        assert_eq!(
            payment.last_successful_charge().and_then(|t| t.interaction_id.as_deref()),
            Some("CAP-1")
        );
        assert_eq!(payment.refunded_amount(), 1000);
    }

    #[test]
    fn concurrency_error_maps_to_retryable_conflict() {
        let err: AppError = CommerceError::ConcurrentModification {
            resource: "Payment".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(err.status_code(), 409);
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_maps_by_resource() {
        let cart: AppError = CommerceError::NotFound {
            resource: "Cart".to_string(),
            id: "session-1".to_string(),
        }
        .into();
        assert_eq!(cart.error_code(), crate::error::ErrorCode::CartNotFound);

        let payment: AppError = CommerceError::NotFound {
            resource: "Payment".to_string(),
            id: "pay-1".to_string(),
        }
        .into();
        assert_eq!(payment.error_code(), crate::error::ErrorCode::PaymentNotFound);
    }
}
