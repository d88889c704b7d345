//! Health check module
//! Reports connector status and PayPal reachability for the operations API.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

use crate::payments::provider::PaypalOrderApi;

pub const PAYPAL_CHECK_NAME: &str = "Paypal Payment API";

/// Status report served at `/operations/status`
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: ComponentState,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub checks: Vec<ComponentHealth>,
    pub metadata: HealthMetadata,
}

#[derive(Debug, Serialize, Clone)]
pub struct HealthMetadata {
    pub name: String,
    pub description: String,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u128>,
    pub details: serde_json::Value,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentState {
    Up,
    Down,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == ComponentState::Up
    }
}

impl ComponentHealth {
    pub fn up(name: &str, response_time_ms: Option<u128>, details: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            status: ComponentState::Up,
            response_time_ms,
            details,
        }
    }

    /// Failure detail stays generic; the cause is logged, not returned.
    pub fn down(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ComponentState::Down,
            response_time_ms: None,
            details: serde_json::json!({ "error": reason }),
        }
    }
}

/// Health checker for the application
#[derive(Clone)]
pub struct HealthChecker {
    paypal: Arc<dyn PaypalOrderApi>,
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(paypal: Arc<dyn PaypalOrderApi>, timeout_ms: u64) -> Self {
        Self {
            paypal,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let checks = vec![self.check_paypal().await];

        let status = if checks.iter().all(|c| c.status == ComponentState::Up) {
            ComponentState::Up
        } else {
            ComponentState::Down
        };

        HealthStatus {
            status,
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
            metadata: HealthMetadata {
                name: env!("CARGO_PKG_NAME").to_string(),
                description: "PayPal payment connector processor".to_string(),
            },
        }
    }

    async fn check_paypal(&self) -> ComponentHealth {
        let start = Instant::now();
        match timeout(self.timeout, self.paypal.health_check()).await {
            Ok(Ok(())) => {
                let elapsed = start.elapsed().as_millis();
                info!("PayPal health check: OK ({}ms)", elapsed);
                ComponentHealth::up(
                    PAYPAL_CHECK_NAME,
                    Some(elapsed),
                    serde_json::json!({ "paymentMethods": "paypal" }),
                )
            }
            Ok(Err(e)) => {
                error!(error = %e, debug_id = e.debug_id().unwrap_or("-"), "PayPal health check failed");
                ComponentHealth::down(PAYPAL_CHECK_NAME, "PayPal API unavailable")
            }
            Err(_) => {
                error!(timeout_ms = self.timeout.as_millis() as u64, "PayPal health check timed out");
                ComponentHealth::down(PAYPAL_CHECK_NAME, "Timeout")
            }
        }
    }
}
