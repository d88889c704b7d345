#![allow(dead_code)]

use async_trait::async_trait;
use paypal_connector::commerce::{
    Address, Cart, InMemoryCommerce, PaymentRecord, PaymentService, PaymentUpdateAction,
    TransactionDraft,
};
use paypal_connector::config::PaypalEnvironment;
use paypal_connector::payments::amount::Money;
use paypal_connector::payments::error::{PaymentError, PaymentResult};
use paypal_connector::payments::provider::PaypalOrderApi;
use paypal_connector::payments::types::{
    AuthenticationResponse, CaptureOrderResult, CreateOrderRequest, CreateOrderResponse,
    NotificationVerificationRequest, NotificationVerificationResponse, OrderStatus,
    ProviderOrder, PurchaseUnit, RefundResponse, VerificationStatus,
};
use paypal_connector::services::payment_orchestrator::CreateOrderPayload;
use paypal_connector::services::{OrchestratorConfig, PaymentOrchestrator};
use std::sync::{Arc, Mutex};

pub const SESSION_ID: &str = "session-1";
pub const ORDER_ID: &str = "2WJ067824R598984A";
pub const CAPTURE_ID: &str = "0CK67015SC9955729";
pub const REFUND_ID: &str = "1JU08902781691411";

/// Scriptable stand-in for the PayPal client that records every call.
pub struct FakePaypal {
    pub create_status: Mutex<OrderStatus>,
    pub capture_result: Mutex<PaymentResult<(String, String)>>,
    pub refund_status: Mutex<String>,
    pub verification: Mutex<VerificationStatus>,
    pub healthy: Mutex<bool>,
    /// invoice id reported by get-order; defaults to the last created order's
    pub order_invoice_id: Mutex<Option<String>>,
    pub created: Mutex<Vec<CreateOrderRequest>>,
    pub calls: Mutex<Vec<String>>,
    /// ledger row written to the store while the next capture or refund is in flight
    pub concurrent_write: Mutex<Option<(Arc<InMemoryCommerce>, String, TransactionDraft)>>,
}

impl Default for FakePaypal {
    fn default() -> Self {
        Self {
            create_status: Mutex::new(OrderStatus::PayerActionRequired),
            capture_result: Mutex::new(Ok((CAPTURE_ID.to_string(), "COMPLETED".to_string()))),
            refund_status: Mutex::new("COMPLETED".to_string()),
            verification: Mutex::new(VerificationStatus::Success),
            healthy: Mutex::new(true),
            order_invoice_id: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            concurrent_write: Mutex::new(None),
        }
    }
}

impl FakePaypal {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_capture(&self, err: PaymentError) {
        *self.capture_result.lock().unwrap() = Err(err);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn land_concurrent_write(&self) {
        let concurrent = self.concurrent_write.lock().unwrap().take();
        if let Some((store, payment_id, draft)) = concurrent {
            let payment = store.get_payment(&payment_id).await.unwrap();
            store
                .update_payment(
                    &payment_id,
                    payment.version,
                    vec![PaymentUpdateAction::AddTransaction(draft)],
                )
                .await
                .unwrap();
        }
    }
}

#[async_trait]
impl PaypalOrderApi for FakePaypal {
    async fn authenticate(&self) -> PaymentResult<AuthenticationResponse> {
        Ok(AuthenticationResponse {
            access_token: "A21AAFEpH4PsADK7qSS7pSRsgz".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(32400),
        })
    }

    async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<CreateOrderResponse> {
        self.record("create_order".to_string());
        let invoice_id = request.purchase_units[0].invoice_id.clone();
        *self.order_invoice_id.lock().unwrap() = invoice_id;
        self.created.lock().unwrap().push(request);
        Ok(CreateOrderResponse {
            id: ORDER_ID.to_string(),
            status: self.create_status.lock().unwrap().clone(),
        })
    }

    async fn get_order(&self, order_id: &str) -> PaymentResult<ProviderOrder> {
        self.record(format!("get_order:{}", order_id));
        Ok(ProviderOrder {
            id: order_id.to_string(),
            status: Some("APPROVED".to_string()),
            purchase_units: vec![PurchaseUnit {
                invoice_id: self.order_invoice_id.lock().unwrap().clone(),
                ..PurchaseUnit::default()
            }],
        })
    }

    async fn capture_order(&self, order_id: &str) -> PaymentResult<CaptureOrderResult> {
        self.record(format!("capture_order:{}", order_id));
        self.land_concurrent_write().await;
        let (capture_id, status) = self.capture_result.lock().unwrap().clone()?;
        Ok(CaptureOrderResult {
            order: ProviderOrder {
                id: order_id.to_string(),
                status: Some(status.clone()),
                purchase_units: Vec::new(),
            },
            capture_id,
            capture_status: status.clone(),
            status,
        })
    }

    async fn refund_partial_payment(
        &self,
        capture_id: &str,
        amount: &Money,
    ) -> PaymentResult<RefundResponse> {
        self.record(format!("refund_partial:{}:{}", capture_id, amount.cent_amount));
        self.land_concurrent_write().await;
        Ok(RefundResponse {
            id: REFUND_ID.to_string(),
            status: self.refund_status.lock().unwrap().clone(),
            amount: None,
        })
    }

    async fn refund_full_payment(&self, capture_id: &str) -> PaymentResult<RefundResponse> {
        self.record(format!("refund_full:{}", capture_id));
        self.land_concurrent_write().await;
        Ok(RefundResponse {
            id: REFUND_ID.to_string(),
            status: self.refund_status.lock().unwrap().clone(),
            amount: None,
        })
    }

    async fn verify_webhook_signature(
        &self,
        request: NotificationVerificationRequest,
    ) -> PaymentResult<NotificationVerificationResponse> {
        self.record(format!("verify:{}", request.webhook_id));
        Ok(NotificationVerificationResponse {
            verification_status: *self.verification.lock().unwrap(),
        })
    }

    async fn health_check(&self) -> PaymentResult<()> {
        if *self.healthy.lock().unwrap() {
            Ok(())
        } else {
            Err(PaymentError::NetworkError {
                message: "connection refused".to_string(),
            })
        }
    }
}

pub fn cart(total: u64, currency: &str) -> Cart {
    Cart {
        id: "cart-1".to_string(),
        version: 1,
        customer_id: Some("customer-1".to_string()),
        total_price: Money::new(currency, total),
        shipping_address: Some(Address {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            street_name: Some("Main Street".to_string()),
            street_number: Some("12".to_string()),
            postal_code: Some("10115".to_string()),
            city: Some("Berlin".to_string()),
            country: Some("DE".to_string()),
            ..Address::default()
        }),
        payment_ids: Vec::new(),
    }
}

pub struct Harness {
    pub paypal: Arc<FakePaypal>,
    pub store: Arc<InMemoryCommerce>,
    pub orchestrator: Arc<PaymentOrchestrator>,
}

pub async fn harness_with_cart(cart: Cart) -> Harness {
    let paypal = Arc::new(FakePaypal::default());
    let store = Arc::new(InMemoryCommerce::new());
    store.insert_cart(SESSION_ID, cart).await;

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        paypal.clone(),
        store.clone(),
        store.clone(),
        OrchestratorConfig {
            client_id: "client-id".to_string(),
            environment: PaypalEnvironment::Sandbox,
        },
    ));

    Harness {
        paypal,
        store,
        orchestrator,
    }
}

pub async fn harness() -> Harness {
    harness_with_cart(cart(74600, "EUR")).await
}

impl Harness {
    /// Lands a ledger write on `payment_id` in the middle of the next capture
    /// or refund call, the way a PayPal webhook races the API response.
    pub fn webhook_during_call(&self, payment_id: &str, draft: TransactionDraft) {
        *self.paypal.concurrent_write.lock().unwrap() =
            Some((self.store.clone(), payment_id.to_string(), draft));
    }

    pub async fn payment(&self, id: &str) -> PaymentRecord {
        self.store.get_payment(id).await.unwrap()
    }

    /// Runs create and confirm so the payment carries a successful charge.
    pub async fn captured_payment(&self) -> PaymentRecord {
        let created = self
            .orchestrator
            .create_payment(SESSION_ID, CreateOrderPayload::default())
            .await
            .unwrap();
        self.orchestrator
            .confirm_payment(&created.id, Some(created.payment_reference.as_str()))
            .await
            .unwrap();
        self.payment(&created.payment_reference).await
    }
}

pub fn webhook_headers() -> http::HeaderMap {
    use http::HeaderValue;
    use paypal_connector::services::webhook_processor::{
        AUTH_ALGO_HEADER, CERT_URL_HEADER, TRANSMISSION_ID_HEADER, TRANSMISSION_SIG_HEADER,
        TRANSMISSION_TIME_HEADER,
    };

    let mut headers = http::HeaderMap::new();
    headers.insert(AUTH_ALGO_HEADER, HeaderValue::from_static("SHA256withRSA"));
    headers.insert(
        CERT_URL_HEADER,
        HeaderValue::from_static("https://api.sandbox.paypal.com/v1/notifications/certs/CERT-360caa42"),
    );
    headers.insert(TRANSMISSION_ID_HEADER, HeaderValue::from_static("69cd13f0-d67a-11e5-baa3-778b53f4ae55"));
    headers.insert(TRANSMISSION_SIG_HEADER, HeaderValue::from_static("lmI95Jx3Y9nhR5SJWlHVIWpg4AgFk7n9"));
    headers.insert(TRANSMISSION_TIME_HEADER, HeaderValue::from_static("2016-02-18T20:01:35Z"));
    headers
}

pub fn notification_body(event_type: &str, payment_id: &str, value: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "WH-2WR32451HC0233532-67976317FL4543714",
        "event_type": event_type,
        "resource_type": "capture",
        "resource": {
            "id": "3X766405",
            "status": "COMPLETED",
            "invoice_id": payment_id,
            "amount": { "currency_code": "EUR", "value": value }
        }
    })
}
