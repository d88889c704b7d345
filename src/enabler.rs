//! Client-side half of the checkout protocol.
//!
//! The PayPal button widget drives a [`CheckoutFlow`] through named
//! transitions; the flow decides which step is legal and what the shopper
//! sees at the end. The server-side steps it waits on are
//! `POST /checkout/orders` and `POST /checkout/orders/{id}/capture`.

use crate::services::payment_orchestrator::{ConfirmPaymentResponse, CreatePaymentResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INSTRUMENT_DECLINED: &str = "INSTRUMENT_DECLINED";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    OrderCreating,
    AwaitingApproval,
    Capturing,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckoutState::Idle => "idle",
            CheckoutState::OrderCreating => "order_creating",
            CheckoutState::AwaitingApproval => "awaiting_approval",
            CheckoutState::Capturing => "capturing",
            CheckoutState::Completed => "completed",
            CheckoutState::Failed => "failed",
            CheckoutState::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

impl CheckoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Completed | CheckoutState::Failed | CheckoutState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: CheckoutState,
        event: &'static str,
    },
}

/// What the merchant page is told when the flow ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCompletion {
    pub payment_reference: String,
    pub is_success: bool,
}

#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    state: CheckoutState,
    order_id: Option<String>,
    payment_reference: Option<String>,
    completion: Option<CheckoutCompletion>,
    last_error: Option<String>,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self {
            state: CheckoutState::Idle,
            order_id: None,
            payment_reference: None,
            completion: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn completion(&self) -> Option<&CheckoutCompletion> {
        self.completion.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn expect(&self, allowed: &[CheckoutState], event: &'static str) -> Result<(), CheckoutError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CheckoutError::InvalidTransition {
                state: self.state,
                event,
            })
        }
    }

    /// Button pressed. When the merchant's own validation refuses, the flow
    /// stays idle.
    pub fn click(&mut self, merchant_allows: bool) -> Result<CheckoutState, CheckoutError> {
        self.expect(&[CheckoutState::Idle], "click")?;
        if merchant_allows {
            self.state = CheckoutState::OrderCreating;
        }
        Ok(self.state)
    }

    pub fn order_created(
        &mut self,
        response: &CreatePaymentResponse,
    ) -> Result<CheckoutState, CheckoutError> {
        self.expect(&[CheckoutState::OrderCreating], "order_created")?;
        self.order_id = Some(response.id.clone());
        self.payment_reference = Some(response.payment_reference.clone());
        self.state = CheckoutState::AwaitingApproval;
        Ok(self.state)
    }

    pub fn order_failed(&mut self, message: &str) -> Result<CheckoutState, CheckoutError> {
        self.expect(&[CheckoutState::OrderCreating], "order_failed")?;
        self.fail(message);
        Ok(self.state)
    }

    /// Shopper approved on PayPal; the capture request is about to be sent.
    pub fn approve(&mut self, order_id: &str) -> Result<CheckoutState, CheckoutError> {
        self.expect(&[CheckoutState::AwaitingApproval], "approve")?;
        self.order_id = Some(order_id.to_string());
        self.state = CheckoutState::Capturing;
        Ok(self.state)
    }

    /// Capture endpoint answered 2xx. A DECLINED capture still fails the flow.
    pub fn capture_succeeded(
        &mut self,
        response: &ConfirmPaymentResponse,
    ) -> Result<CheckoutState, CheckoutError> {
        self.expect(&[CheckoutState::Capturing], "capture_succeeded")?;
        self.payment_reference = Some(response.payment_reference.clone());

        if response.capture_status.eq_ignore_ascii_case("DECLINED") {
            self.fail("payment declined");
            return Ok(self.state);
        }

        self.completion = Some(CheckoutCompletion {
            payment_reference: response.payment_reference.clone(),
            is_success: response.capture_status.eq_ignore_ascii_case("COMPLETED"),
        });
        self.state = CheckoutState::Completed;
        Ok(self.state)
    }

    /// Capture endpoint answered with an error. `INSTRUMENT_DECLINED` sends the
    /// shopper back to PayPal to pick another funding source.
    pub fn capture_failed(
        &mut self,
        issue: Option<&str>,
        message: &str,
    ) -> Result<CheckoutState, CheckoutError> {
        self.expect(&[CheckoutState::Capturing], "capture_failed")?;
        if issue == Some(INSTRUMENT_DECLINED) {
            self.last_error = Some(message.to_string());
            self.state = CheckoutState::AwaitingApproval;
        } else {
            self.fail(message);
        }
        Ok(self.state)
    }

    pub fn cancel(&mut self) -> Result<CheckoutState, CheckoutError> {
        self.expect(
            &[
                CheckoutState::OrderCreating,
                CheckoutState::AwaitingApproval,
                CheckoutState::Capturing,
            ],
            "cancel",
        )?;
        self.last_error = Some("Payment cancelled by user".to_string());
        self.state = CheckoutState::Cancelled;
        Ok(self.state)
    }

    /// Widget-level error outside any request.
    pub fn error(&mut self, message: &str) -> Result<CheckoutState, CheckoutError> {
        if self.state.is_terminal() {
            return Err(CheckoutError::InvalidTransition {
                state: self.state,
                event: "error",
            });
        }
        self.fail(message);
        Ok(self.state)
    }

    fn fail(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.state = CheckoutState::Failed;
    }
}
