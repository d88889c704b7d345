use paypal_connector::api::{self, AppState};
use paypal_connector::commerce::InMemoryCommerce;
use paypal_connector::config::AppConfig;
use paypal_connector::health::HealthChecker;
use paypal_connector::logging::{init_tracing, mask_identifier};
use paypal_connector::payments::{PaypalClient, PaypalOrderApi};
use paypal_connector::services::{OrchestratorConfig, PaymentOrchestrator, WebhookProcessor};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.paypal.environment.as_str(),
        client_id = %mask_identifier(&config.paypal.client_id),
        base_url = config.paypal.base_url(),
        "Starting PayPal connector"
    );

    let paypal: Arc<dyn PaypalOrderApi> = Arc::new(PaypalClient::new(&config.paypal)?);
    let commerce = Arc::new(InMemoryCommerce::new());

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        paypal.clone(),
        commerce.clone(),
        commerce,
        OrchestratorConfig::from(&config.paypal),
    ));
    let webhooks = Arc::new(WebhookProcessor::new(
        paypal.clone(),
        orchestrator.clone(),
        config.paypal.webhook_id.clone(),
    ));
    let health_checker = HealthChecker::new(paypal, config.health.timeout_ms);

    let app = api::router(AppState {
        orchestrator,
        webhooks,
        health_checker,
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
