//! Payment Orchestrator Service
//!
//! Keeps the commerce payment ledger in step with PayPal order state. No
//! checkout state is held here: progress is read from, and written to, the
//! payment's transaction list.

use crate::commerce::{
    Address, Cart, CartService, CommerceError, PaymentDraft, PaymentMethodInfo, PaymentRecord,
    PaymentService, PaymentUpdateAction, TransactionDraft, TransactionState, TransactionType,
    PAYMENT_INTERFACE,
};
use crate::config::{PaypalConfig, PaypalEnvironment};
use crate::error::{AppError, AppErrorKind, DomainError, ExternalError, ValidationError};
use crate::payments::amount::Money;
use crate::payments::error::PaymentError;
use crate::payments::provider::PaypalOrderApi;
use crate::payments::types::{
    CreateOrderRequest, Intent, OrderStatus, PaymentSource, PaypalAmount, PurchaseUnit, Shipping,
    ShippingAddress, ShippingName, WebhookNotification,
};
use crate::services::interface_id::is_valid_interface_id;
use crate::services::notification::{NotificationConverter, NotificationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const REFERENCE_ID_PREFIX: &str = "ct-connect-paypal-";

/// Ledger appends re-read the payment and retry this many times when a
/// concurrent writer (usually a webhook) bumped the version in between.
const LEDGER_APPEND_ATTEMPTS: usize = 3;

// ============================================================================
// Configuration Types
// ============================================================================

/// Values the orchestrator exposes to the checkout frontend
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub client_id: String,
    pub environment: PaypalEnvironment,
}

impl From<&PaypalConfig> for OrchestratorConfig {
    fn from(config: &PaypalConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            environment: config.environment,
        }
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body of `POST /checkout/orders`. Only intent and payment preferences are
/// taken from the client; amounts always come from the cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderPayload {
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub payment_source: Option<PaymentSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    /// PayPal order id
    pub id: String,
    pub payment_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    /// PayPal capture id
    pub id: String,
    pub capture_status: String,
    pub payment_reference: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Approved,
    Rejected,
}

impl PaymentOutcome {
    fn from_status(status: &str) -> Self {
        if status.eq_ignore_ascii_case("COMPLETED") {
            PaymentOutcome::Approved
        } else {
            PaymentOutcome::Rejected
        }
    }

    fn transaction_state(&self) -> TransactionState {
        match self {
            PaymentOutcome::Approved => TransactionState::Success,
            PaymentOutcome::Rejected => TransactionState::Failure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModificationResult {
    pub outcome: PaymentOutcome,
    pub psp_reference: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PaymentAction {
    CapturePayment,
    CancelPayment,
    RefundPayment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentActionRequest {
    pub action: PaymentAction,
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifyPaymentRequest {
    pub actions: Vec<PaymentActionRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifyPaymentResponse {
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfigResponse {
    pub client_id: String,
    pub environment: String,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("order {order_id} does not belong to payment {payment_id}")]
    InterfaceIdMismatch { order_id: String, payment_id: String },

    #[error("operation '{operation}' is not supported")]
    NotSupported {
        operation: String,
        psp_reference: Option<String>,
    },

    #[error("payment {payment_id} has no successful charge to refund")]
    NoCaptureToRefund { payment_id: String },

    #[error("refund of {requested} exceeds refundable {refundable} on payment {payment_id}")]
    RefundExceedsCaptured {
        payment_id: String,
        requested: u64,
        refundable: u64,
    },

    #[error("PayPal order {order_id} carries no invoice id")]
    MissingInvoiceId { order_id: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        let context = err.to_string();
        let kind = match err {
            OrchestratorError::Payment(e) => return e.into(),
            OrchestratorError::Commerce(e) => return e.into(),
            OrchestratorError::Notification(e) => return e.into(),
            OrchestratorError::InterfaceIdMismatch {
                order_id,
                payment_id,
            } => AppErrorKind::Domain(DomainError::InterfaceIdMismatch {
                order_id,
                payment_id,
            }),
            OrchestratorError::NotSupported {
                operation,
                psp_reference,
            } => AppErrorKind::Domain(DomainError::NotSupported {
                operation,
                psp_reference,
            }),
            OrchestratorError::NoCaptureToRefund { payment_id } => {
                AppErrorKind::Domain(DomainError::NoCaptureToRefund { payment_id })
            }
            OrchestratorError::RefundExceedsCaptured {
                payment_id,
                requested,
                refundable,
            } => AppErrorKind::Domain(DomainError::RefundExceedsCaptured {
                payment_id,
                requested,
                refundable,
            }),
            OrchestratorError::MissingInvoiceId { .. } => {
                AppErrorKind::External(ExternalError::ContractViolation {
                    message: context.clone(),
                })
            }
            OrchestratorError::InvalidRequest { message } => {
                AppErrorKind::Validation(ValidationError::InvalidRequest { message })
            }
        };
        AppError::new(kind).with_context(context)
    }
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

// ============================================================================
// Main Payment Orchestrator
// ============================================================================

pub struct PaymentOrchestrator {
    paypal: Arc<dyn PaypalOrderApi>,
    carts: Arc<dyn CartService>,
    payments: Arc<dyn PaymentService>,
    config: OrchestratorConfig,
}

impl PaymentOrchestrator {
    pub fn new(
        paypal: Arc<dyn PaypalOrderApi>,
        carts: Arc<dyn CartService>,
        payments: Arc<dyn PaymentService>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            paypal,
            carts,
            payments,
            config,
        }
    }

    pub fn config(&self) -> ConnectorConfigResponse {
        ConnectorConfigResponse {
            client_id: self.config.client_id.clone(),
            environment: self.config.environment.as_str().to_string(),
        }
    }

    /// Creates the commerce payment and the PayPal order for the session's cart.
    #[instrument(skip(self, payload))]
    pub async fn create_payment(
        &self,
        session_id: &str,
        payload: CreateOrderPayload,
    ) -> OrchestratorResult<CreatePaymentResponse> {
        let cart = self.carts.get_cart_for_session(session_id).await?;
        let amount_planned = self.carts.get_planned_amount(&cart).await?;
        amount_planned.ensure_two_decimal_currency()?;

        let payment = self
            .payments
            .create_payment(PaymentDraft {
                amount_planned: amount_planned.clone(),
                payment_method_info: PaymentMethodInfo {
                    payment_interface: PAYMENT_INTERFACE.to_string(),
                    method: None,
                },
                customer_id: cart.customer_id.clone(),
            })
            .await?;

        // Linked before calling PayPal so a failed order still leaves a
        // traceable payment on the cart.
        self.carts.add_payment(&cart, &payment.id).await?;

        let request = build_order_request(&cart, &payment, &amount_planned, payload);
        let order = self.paypal.create_order(request).await?;

        let outcome = if order.status == OrderStatus::PayerActionRequired {
            PaymentOutcome::Approved
        } else {
            PaymentOutcome::Rejected
        };

        let updated = self
            .payments
            .update_payment(
                &payment.id,
                payment.version,
                vec![
                    PaymentUpdateAction::SetInterfaceId(order.id.clone()),
                    PaymentUpdateAction::SetMethodInfoMethod(PAYMENT_INTERFACE.to_string()),
                    PaymentUpdateAction::AddTransaction(TransactionDraft {
                        transaction_type: TransactionType::Authorization,
                        state: outcome.transaction_state(),
                        amount: amount_planned,
                        interaction_id: Some(order.id.clone()),
                    }),
                ],
            )
            .await?;

        info!(
            payment_id = %updated.id,
            order_id = %order.id,
            outcome = ?outcome,
            "payment created"
        );

        Ok(CreatePaymentResponse {
            id: order.id,
            payment_reference: updated.id,
        })
    }

    /// Captures the approved order. The ledger gets a Charge/Initial row before
    /// the capture call and a terminal Charge row after it, even when the
    /// capture fails.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: &str,
        payment_reference: Option<&str>,
    ) -> OrchestratorResult<ConfirmPaymentResponse> {
        let payment_id = match payment_reference {
            Some(reference) => reference.to_string(),
            None => self
                .paypal
                .get_order(order_id)
                .await?
                .invoice_id()
                .map(str::to_string)
                .ok_or_else(|| OrchestratorError::MissingInvoiceId {
                    order_id: order_id.to_string(),
                })?,
        };

        let payment = self.payments.get_payment(&payment_id).await?;

        if !is_valid_interface_id(&payment, order_id) {
            warn!(payment_id = %payment.id, order_id, "interface id mismatch");
            return Err(OrchestratorError::InterfaceIdMismatch {
                order_id: order_id.to_string(),
                payment_id: payment.id,
            });
        }

        let pending = self
            .append_transaction(
                &payment.id,
                TransactionDraft {
                    transaction_type: TransactionType::Charge,
                    state: TransactionState::Initial,
                    amount: payment.amount_planned.clone(),
                    interaction_id: None,
                },
            )
            .await?;

        let capture = match self.paypal.capture_order(order_id).await {
            Ok(capture) => capture,
            Err(e) => {
                error!(
                    payment_id = %pending.id,
                    order_id,
                    error = %e,
                    "capture failed, recording charge failure"
                );
                let failure = self
                    .append_transaction(
                        &pending.id,
                        TransactionDraft {
                            transaction_type: TransactionType::Charge,
                            state: TransactionState::Failure,
                            amount: pending.amount_planned.clone(),
                            interaction_id: None,
                        },
                    )
                    .await;
                if let Err(ledger_err) = failure {
                    error!(payment_id = %pending.id, error = %ledger_err, "could not record charge failure");
                }
                return Err(e.into());
            }
        };

        let state = if capture.is_completed() {
            TransactionState::Success
        } else {
            TransactionState::Failure
        };

        let updated = self
            .append_transaction(
                &pending.id,
                TransactionDraft {
                    transaction_type: TransactionType::Charge,
                    state,
                    amount: pending.amount_planned.clone(),
                    interaction_id: Some(capture.capture_id.clone()),
                },
            )
            .await?;

        info!(
            payment_id = %updated.id,
            capture_id = %capture.capture_id,
            capture_status = %capture.capture_status,
            "payment confirmed"
        );

        Ok(ConfirmPaymentResponse {
            id: capture.capture_id,
            capture_status: capture.capture_status,
            payment_reference: updated.id,
        })
    }

    /// Operator-initiated capture. Outcome only; the caller records the ledger row.
    pub async fn capture_payment(
        &self,
        payment: &PaymentRecord,
    ) -> OrchestratorResult<PaymentModificationResult> {
        let order_id = payment.interface_id.as_deref().ok_or_else(|| {
            OrchestratorError::InvalidRequest {
                message: format!("payment {} has no PayPal order", payment.id),
            }
        })?;

        let capture = self.paypal.capture_order(order_id).await?;
        Ok(PaymentModificationResult {
            outcome: PaymentOutcome::from_status(&capture.status),
            psp_reference: capture.capture_id,
        })
    }

    /// PayPal exposes no authorization void for this flow.
    pub async fn cancel_payment(
        &self,
        payment: &PaymentRecord,
    ) -> OrchestratorResult<PaymentModificationResult> {
        Err(OrchestratorError::NotSupported {
            operation: "cancelPayment".to_string(),
            psp_reference: payment.interface_id.clone(),
        })
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.id))]
    pub async fn refund_payment(
        &self,
        payment: &PaymentRecord,
        amount: &Money,
    ) -> OrchestratorResult<PaymentModificationResult> {
        if amount.currency_code != payment.amount_planned.currency_code {
            return Err(OrchestratorError::InvalidRequest {
                message: format!(
                    "refund currency {} does not match payment currency {}",
                    amount.currency_code, payment.amount_planned.currency_code
                ),
            });
        }
        if amount.cent_amount == 0 {
            return Err(OrchestratorError::InvalidRequest {
                message: "refund amount must be greater than zero".to_string(),
            });
        }

        let capture_id = payment
            .last_successful_charge()
            .and_then(|charge| charge.interaction_id.as_deref())
            .ok_or_else(|| OrchestratorError::NoCaptureToRefund {
                payment_id: payment.id.clone(),
            })?;

        let refundable = payment
            .amount_planned
            .cent_amount
            .saturating_sub(payment.refunded_amount());
        if amount.cent_amount > refundable {
            return Err(OrchestratorError::RefundExceedsCaptured {
                payment_id: payment.id.clone(),
                requested: amount.cent_amount,
                refundable,
            });
        }

        let refund = if payment.amount_planned.cent_amount > amount.cent_amount {
            self.paypal.refund_partial_payment(capture_id, amount).await?
        } else {
            self.paypal.refund_full_payment(capture_id).await?
        };

        info!(refund_id = %refund.id, status = %refund.status, "refund issued");

        Ok(PaymentModificationResult {
            outcome: PaymentOutcome::from_status(&refund.status),
            psp_reference: refund.id,
        })
    }

    /// Runs one capture/cancel/refund action and records its outcome on the ledger.
    #[instrument(skip(self, request))]
    pub async fn modify_payment(
        &self,
        payment_id: &str,
        request: ModifyPaymentRequest,
    ) -> OrchestratorResult<ModifyPaymentResponse> {
        let action = match request.actions.as_slice() {
            [action] => action.clone(),
            _ => {
                return Err(OrchestratorError::InvalidRequest {
                    message: "exactly one payment action is required".to_string(),
                })
            }
        };

        let payment = self.payments.get_payment(payment_id).await?;
        let amount = action
            .amount
            .clone()
            .unwrap_or_else(|| payment.amount_planned.clone());

        let (transaction_type, result) = match action.action {
            PaymentAction::CapturePayment => {
                (TransactionType::Charge, self.capture_payment(&payment).await?)
            }
            PaymentAction::CancelPayment => (
                TransactionType::CancelAuthorization,
                self.cancel_payment(&payment).await?,
            ),
            PaymentAction::RefundPayment => {
                if action.amount.is_none() {
                    return Err(OrchestratorError::InvalidRequest {
                        message: "refundPayment requires an amount".to_string(),
                    });
                }
                (TransactionType::Refund, self.refund_payment(&payment, &amount).await?)
            }
        };

        self.append_transaction(
            &payment.id,
            TransactionDraft {
                transaction_type,
                state: result.outcome.transaction_state(),
                amount,
                interaction_id: Some(result.psp_reference.clone()),
            },
        )
        .await?;

        info!(
            payment_id = %payment.id,
            action = ?action.action,
            outcome = ?result.outcome,
            psp_reference = %result.psp_reference,
            "payment modified"
        );

        Ok(ModifyPaymentResponse {
            outcome: result.outcome,
        })
    }

    /// Appends the ledger row a verified webhook maps to. Delivery is
    /// at-least-once and not deduplicated: a redelivered event appends again.
    #[instrument(skip(self, notification), fields(event_type = %notification.event_type))]
    pub async fn process_notification(
        &self,
        notification: &WebhookNotification,
    ) -> OrchestratorResult<PaymentRecord> {
        let instruction = NotificationConverter::convert(notification)?;
        let updated = self
            .append_transaction(&instruction.payment_id, instruction.transaction)
            .await?;

        info!(payment_id = %updated.id, "notification applied");
        Ok(updated)
    }

    /// Appends one ledger row against the payment's current version. Rows are
    /// independent, so a version conflict is resolved by re-reading and
    /// appending again rather than failing the caller.
    async fn append_transaction(
        &self,
        payment_id: &str,
        draft: TransactionDraft,
    ) -> OrchestratorResult<PaymentRecord> {
        let mut attempt = 1;
        loop {
            let payment = self.payments.get_payment(payment_id).await?;
            match self
                .payments
                .update_payment(
                    &payment.id,
                    payment.version,
                    vec![PaymentUpdateAction::AddTransaction(draft.clone())],
                )
                .await
            {
                Err(CommerceError::ConcurrentModification { actual, .. })
                    if attempt < LEDGER_APPEND_ATTEMPTS =>
                {
                    warn!(
                        payment_id,
                        attempt,
                        actual,
                        "payment version moved, re-reading before append"
                    );
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }
}

// ============================================================================
// Order Request Mapping
// ============================================================================

pub fn build_order_request(
    cart: &Cart,
    payment: &PaymentRecord,
    amount: &Money,
    payload: CreateOrderPayload,
) -> CreateOrderRequest {
    CreateOrderRequest {
        intent: payload.intent.unwrap_or(Intent::Capture),
        purchase_units: vec![PurchaseUnit {
            reference_id: Some(format!("{}{}", REFERENCE_ID_PREFIX, Uuid::new_v4())),
            invoice_id: Some(payment.id.clone()),
            amount: Some(PaypalAmount::from(amount)),
            shipping: cart.shipping_address.as_ref().map(map_shipping),
            payments: None,
        }],
        payment_source: payload.payment_source.unwrap_or_default(),
    }
}

pub fn map_shipping(address: &Address) -> Shipping {
    Shipping {
        shipping_type: Some("SHIPPING".to_string()),
        name: Some(ShippingName {
            full_name: join_present(&[&address.first_name, &address.last_name]),
        }),
        address: Some(ShippingAddress {
            address_line_1: Some(join_present(&[&address.street_name, &address.street_number])),
            address_line_2: address.additional_street_info.clone(),
            postal_code: address.postal_code.clone(),
            admin_area_1: Some(
                non_empty(&address.state)
                    .or_else(|| non_empty(&address.region))
                    .unwrap_or_default(),
            ),
            admin_area_2: address.city.clone(),
            country_code: address.country.clone().unwrap_or_default(),
        }),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Space-joins the parts that are present and non-empty.
fn join_present(parts: &[&Option<String>]) -> String {
    parts
        .iter()
        .filter_map(|part| non_empty(part))
        .collect::<Vec<_>>()
        .join(" ")
}
