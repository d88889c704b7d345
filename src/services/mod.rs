//! Services module for business logic and integrations

pub mod interface_id;
pub mod notification;
pub mod payment_orchestrator;
pub mod webhook_processor;

pub use crate::services::notification::{
    LedgerUpdateInstruction, NotificationConverter, NotificationError,
};
pub use crate::services::payment_orchestrator::{
    OrchestratorConfig, OrchestratorError, OrchestratorResult, PaymentOrchestrator,
};
pub use crate::services::webhook_processor::{WebhookProcessor, WebhookProcessorError};
