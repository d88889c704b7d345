use crate::config::PaypalConfig;
use crate::payments::amount::Money;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaypalOrderApi;
use crate::payments::types::{
    AuthenticationResponse, CaptureOrderResult, CreateOrderRequest, CreateOrderResponse,
    NotificationVerificationRequest, NotificationVerificationResponse, PaypalAmount, PaypalUrl,
    ProviderOrder, RefundRequest, RefundResponse,
};
use crate::payments::utils::PaypalHttpClient;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

/// PayPal Orders v2 client. Authenticates before every call; no token is kept
/// between requests.
pub struct PaypalClient {
    client_id: String,
    client_secret: String,
    http: PaypalHttpClient,
}

impl PaypalClient {
    pub fn new(config: &PaypalConfig) -> PaymentResult<Self> {
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http: PaypalHttpClient::new(config)?,
        })
    }

    async fn access_token(&self) -> PaymentResult<String> {
        Ok(self.authenticate().await?.access_token)
    }

    async fn post<B, T>(&self, resource: PaypalUrl, resource_id: Option<&str>, body: &B) -> PaymentResult<T>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let token = self.access_token().await?;
        let url = self.http.url(resource, resource_id);
        self.http
            .request_json(Method::POST, &url, &token, Some(body), true)
            .await
    }
}

/// Pulls capture id/status out of a capture response. A 2xx answer without a
/// capture record or without an order status is a provider contract breach.
pub fn extract_capture(order: ProviderOrder) -> PaymentResult<CaptureOrderResult> {
    let capture = order
        .first_capture()
        .cloned()
        .ok_or_else(|| PaymentError::ExtractionError {
            message: format!(
                "capture response for order {} has no purchase_units[0].payments.captures[0]",
                order.id
            ),
        })?;

    let status = order
        .status
        .clone()
        .ok_or_else(|| PaymentError::ResponseParseError {
            message: format!("capture response for order {} has no status", order.id),
        })?;

    Ok(CaptureOrderResult {
        capture_id: capture.id,
        capture_status: capture.status,
        status,
        order,
    })
}

#[async_trait]
impl PaypalOrderApi for PaypalClient {
    async fn authenticate(&self) -> PaymentResult<AuthenticationResponse> {
        self.http
            .fetch_token(&self.client_id, &self.client_secret)
            .await
    }

    #[instrument(skip(self, request))]
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> PaymentResult<CreateOrderResponse> {
        let response: CreateOrderResponse = self.post(PaypalUrl::Orders, None, &request).await?;
        info!(order_id = %response.id, status = ?response.status, "PayPal order created");
        Ok(response)
    }

    async fn get_order(&self, order_id: &str) -> PaymentResult<ProviderOrder> {
        let token = self.access_token().await?;
        let url = self.http.url(PaypalUrl::GetOrder, Some(order_id));
        self.http
            .request_json::<JsonValue, _>(Method::GET, &url, &token, None, false)
            .await
    }

    #[instrument(skip(self))]
    async fn capture_order(&self, order_id: &str) -> PaymentResult<CaptureOrderResult> {
        let order: ProviderOrder = self
            .post(PaypalUrl::CaptureOrder, Some(order_id), &serde_json::json!({}))
            .await?;
        let result = extract_capture(order)?;
        info!(
            capture_id = %result.capture_id,
            capture_status = %result.capture_status,
            "PayPal order captured"
        );
        Ok(result)
    }

    #[instrument(skip(self, amount))]
    async fn refund_partial_payment(
        &self,
        capture_id: &str,
        amount: &Money,
    ) -> PaymentResult<RefundResponse> {
        amount.ensure_two_decimal_currency()?;
        let request = RefundRequest {
            amount: PaypalAmount::from(amount),
        };
        self.post(PaypalUrl::RefundCapture, Some(capture_id), &request)
            .await
    }

    #[instrument(skip(self))]
    async fn refund_full_payment(&self, capture_id: &str) -> PaymentResult<RefundResponse> {
        self.post(PaypalUrl::RefundCapture, Some(capture_id), &serde_json::json!({}))
            .await
    }

    async fn verify_webhook_signature(
        &self,
        request: NotificationVerificationRequest,
    ) -> PaymentResult<NotificationVerificationResponse> {
        self.post(PaypalUrl::VerifyWebhookSignature, None, &request)
            .await
    }

    async fn health_check(&self) -> PaymentResult<()> {
        let token = self.access_token().await?;
        let url = self.http.url(PaypalUrl::HealthCheck, None);
        self.http
            .request_json::<JsonValue, JsonValue>(Method::GET, &url, &token, None, false)
            .await?;
        Ok(())
    }
}
