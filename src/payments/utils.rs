use crate::config::PaypalConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{PaypalErrorBody, PaypalUrl};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "PayPal-Request-Id";
pub const PARTNER_ATTRIBUTION_HEADER: &str = "PayPal-Partner-Attribution-Id";
pub const DEBUG_ID_HEADER: &str = "paypal-debug-id";

/// Thin wrapper over `reqwest` that speaks PayPal's conventions. Every call is
/// a single attempt; retries belong to whatever sits in front of the connector.
#[derive(Clone)]
pub struct PaypalHttpClient {
    client: Client,
    base_url: String,
    partner_attribution_id: String,
}

impl PaypalHttpClient {
    pub fn new(config: &PaypalConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PaymentError::NetworkError {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            partner_attribution_id: config.partner_attribution_id.clone(),
        })
    }

    pub fn url(&self, resource: PaypalUrl, resource_id: Option<&str>) -> String {
        build_url(&self.base_url, resource, resource_id)
    }

    /// Client-credentials grant. Returns the raw token response body.
    pub async fn fetch_token<T: DeserializeOwned>(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> PaymentResult<T> {
        let url = self.url(PaypalUrl::Authentication, None);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, basic_credentials(client_id, client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let debug_id = header_debug_id(response.headers());
        let text = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            let body = parse_error_body(&text);
            warn!(
                status = status.as_u16(),
                debug_id = debug_id.as_deref().unwrap_or("-"),
                "PayPal authentication rejected"
            );
            return Err(PaymentError::ProviderAuthError {
                http_status: status.as_u16(),
                provider_code: body.error.or(body.name),
                debug_id: debug_id.or(body.debug_id),
                message: body
                    .error_description
                    .or(body.message)
                    .unwrap_or_else(|| status_text(status)),
            });
        }

        parse_success_body(&text)
    }

    /// Authenticated JSON call. `mutating` calls carry a fresh idempotency key.
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        url: &str,
        access_token: &str,
        body: Option<&B>,
        mutating: bool,
    ) -> PaymentResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, "application/json");

        if mutating {
            let request_id = Uuid::new_v4().to_string();
            debug!(%method, url, paypal_request_id = %request_id, "calling PayPal");
            request = request
                .header(REQUEST_ID_HEADER, request_id)
                .header(PARTNER_ATTRIBUTION_HEADER, &self.partner_attribution_id);
        }

        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let debug_id = header_debug_id(response.headers());
        let text = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            let err = classify_api_error(status, debug_id, &text);
            warn!(
                status = status.as_u16(),
                provider_code = err.provider_code().unwrap_or("-"),
                debug_id = err.debug_id().unwrap_or("-"),
                url,
                "PayPal request failed"
            );
            return Err(err);
        }

        parse_success_body(&text)
    }
}

pub fn build_url(base_url: &str, resource: PaypalUrl, resource_id: Option<&str>) -> String {
    let path = resource.path();
    let path = match resource_id {
        Some(id) => path.replace("{resourceId}", id),
        None => path.to_string(),
    };
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Turns a non-2xx response into `ProviderApiError`. The body may be empty or
/// not JSON; missing fields fall back to the HTTP status text.
pub fn classify_api_error(status: StatusCode, header_debug_id: Option<String>, text: &str) -> PaymentError {
    let body = parse_error_body(text);
    PaymentError::ProviderApiError {
        http_status: status.as_u16(),
        provider_code: body.name,
        debug_id: body.debug_id.or(header_debug_id),
        message: body.message.unwrap_or_else(|| status_text(status)),
        details: body.details,
    }
}

/// `Authorization` value for the client-credentials grant.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", client_id, client_secret)))
}

fn parse_error_body(text: &str) -> PaypalErrorBody {
    serde_json::from_str(text).unwrap_or_default()
}

fn parse_success_body<T: DeserializeOwned>(text: &str) -> PaymentResult<T> {
    serde_json::from_str(text).map_err(|e| PaymentError::ResponseParseError {
        message: format!("invalid PayPal JSON response: {}", e),
    })
}

fn header_debug_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(DEBUG_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn network_error(e: reqwest::Error) -> PaymentError {
    PaymentError::NetworkError {
        message: format!("PayPal request failed: {}", e),
    }
}
