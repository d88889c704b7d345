//! PayPal Checkout Orders v2 request/response shapes.

use crate::payments::amount::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Resource paths relative to the environment base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaypalUrl {
    Authentication,
    HealthCheck,
    Orders,
    GetOrder,
    CaptureOrder,
    RefundCapture,
    VerifyWebhookSignature,
}

impl PaypalUrl {
    pub fn path(&self) -> &'static str {
        match self {
            PaypalUrl::Authentication => "/v1/oauth2/token",
            PaypalUrl::HealthCheck => "/v1/notifications/webhooks-event-types",
            PaypalUrl::Orders => "/v2/checkout/orders",
            PaypalUrl::GetOrder => "/v2/checkout/orders/{resourceId}",
            PaypalUrl::CaptureOrder => "/v2/checkout/orders/{resourceId}/capture",
            PaypalUrl::RefundCapture => "/v2/payments/captures/{resourceId}/refund",
            PaypalUrl::VerifyWebhookSignature => "/v1/notifications/verify-webhook-signature",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Saved,
    Approved,
    Voided,
    Completed,
    PayerActionRequired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Capture,
    Authorize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaypalAmount {
    pub currency_code: String,
    pub value: String,
}

impl From<&Money> for PaypalAmount {
    fn from(money: &Money) -> Self {
        Self {
            currency_code: money.currency_code.clone(),
            value: money.to_decimal_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingName {
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_area_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_area_2: Option<String>,
    #[serde(default)]
    pub country_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shipping {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub shipping_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<ShippingName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ShippingAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capture {
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<PaypalAmount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseUnitPayments {
    #[serde(default)]
    pub captures: Vec<Capture>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<PaypalAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Shipping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payments: Option<PurchaseUnitPayments>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperienceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_selected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaypalPaymentSource {
    #[serde(default)]
    pub experience_context: ExperienceContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSource {
    #[serde(default)]
    pub paypal: PaypalPaymentSource,
}

/// Body of `POST /v2/checkout/orders`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub intent: Intent,
    pub purchase_units: Vec<PurchaseUnit>,
    pub payment_source: PaymentSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateOrderResponse {
    pub id: String,
    pub status: OrderStatus,
}

/// Order as returned by get-order and capture-order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderOrder {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnit>,
}

impl ProviderOrder {
    /// `purchase_units[0].invoice_id`, the payment record correlation key.
    pub fn invoice_id(&self) -> Option<&str> {
        self.purchase_units
            .first()
            .and_then(|unit| unit.invoice_id.as_deref())
    }

    /// `purchase_units[0].payments.captures[0]`.
    pub fn first_capture(&self) -> Option<&Capture> {
        self.purchase_units
            .first()
            .and_then(|unit| unit.payments.as_ref())
            .and_then(|payments| payments.captures.first())
    }
}

/// Capture call result with the capture record already extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOrderResult {
    pub order: ProviderOrder,
    pub capture_id: String,
    pub capture_status: String,
    /// Order status, used to classify the capture outcome
    pub status: String,
}

impl CaptureOrderResult {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundRequest {
    pub amount: PaypalAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundResponse {
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<PaypalAmount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticationResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationVerificationRequest {
    pub auth_algo: String,
    pub cert_url: String,
    pub transmission_id: String,
    pub transmission_sig: String,
    pub transmission_time: String,
    pub webhook_id: String,
    pub webhook_event: JsonValue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationVerificationResponse {
    pub verification_status: VerificationStatus,
}

/// Error body PayPal returns on 4xx/5xx. Every field is optional because the
/// body may be missing or not JSON at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaypalErrorBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub debug_id: Option<String>,
    #[serde(default)]
    pub details: Option<JsonValue>,
    /// OAuth endpoint variant
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Webhook event as delivered to `POST /notifications`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookNotification {
    #[serde(default)]
    pub id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    pub resource: NotificationResource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResource {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    pub invoice_id: String,
    pub amount: PaypalAmount,
}
