use crate::payments::amount::Money;
use crate::payments::error::PaymentResult;
use crate::payments::types::{
    AuthenticationResponse, CaptureOrderResult, CreateOrderRequest, CreateOrderResponse,
    NotificationVerificationRequest, NotificationVerificationResponse, ProviderOrder,
    RefundResponse,
};
use async_trait::async_trait;

/// Order lifecycle operations against PayPal. Implementations hold no
/// per-checkout state; every call stands on its own.
#[async_trait]
pub trait PaypalOrderApi: Send + Sync {
    async fn authenticate(&self) -> PaymentResult<AuthenticationResponse>;

    async fn create_order(&self, request: CreateOrderRequest)
        -> PaymentResult<CreateOrderResponse>;

    async fn get_order(&self, order_id: &str) -> PaymentResult<ProviderOrder>;

    /// Captures the order and extracts `purchase_units[0].payments.captures[0]`.
    async fn capture_order(&self, order_id: &str) -> PaymentResult<CaptureOrderResult>;

    async fn refund_partial_payment(
        &self,
        capture_id: &str,
        amount: &Money,
    ) -> PaymentResult<RefundResponse>;

    async fn refund_full_payment(&self, capture_id: &str) -> PaymentResult<RefundResponse>;

    async fn verify_webhook_signature(
        &self,
        request: NotificationVerificationRequest,
    ) -> PaymentResult<NotificationVerificationResponse>;

    async fn health_check(&self) -> PaymentResult<()>;
}
