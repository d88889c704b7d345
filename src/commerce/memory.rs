//! Process-local commerce store used by the binary and the tests.

use super::{
    Cart, CartService, CommerceError, CommerceResult, PaymentDraft, PaymentRecord,
    PaymentService, PaymentUpdateAction, Transaction,
};
use crate::payments::amount::Money;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryCommerce {
    carts: RwLock<HashMap<String, Cart>>,
    sessions: RwLock<HashMap<String, String>>,
    payments: RwLock<HashMap<String, PaymentRecord>>,
}

impl InMemoryCommerce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `cart` as the active cart of `session_id`.
    pub async fn insert_cart(&self, session_id: &str, cart: Cart) {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), cart.id.clone());
        self.carts.write().await.insert(cart.id.clone(), cart);
    }

    pub async fn cart(&self, cart_id: &str) -> Option<Cart> {
        self.carts.read().await.get(cart_id).cloned()
    }

    /// Stores a payment as-is, bypassing version checks.
    pub async fn insert_payment(&self, payment: PaymentRecord) {
        self.payments
            .write()
            .await
            .insert(payment.id.clone(), payment);
    }
}

#[async_trait]
impl CartService for InMemoryCommerce {
    async fn get_cart_for_session(&self, session_id: &str) -> CommerceResult<Cart> {
        let cart_id = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound {
                resource: "Cart".to_string(),
                id: session_id.to_string(),
            })?;

        self.cart(&cart_id)
            .await
            .ok_or(CommerceError::NotFound {
                resource: "Cart".to_string(),
                id: cart_id,
            })
    }

    async fn get_planned_amount(&self, cart: &Cart) -> CommerceResult<Money> {
        Ok(cart.total_price.clone())
    }

    async fn add_payment(&self, cart: &Cart, payment_id: &str) -> CommerceResult<Cart> {
        let mut carts = self.carts.write().await;
        let stored = carts.get_mut(&cart.id).ok_or_else(|| CommerceError::NotFound {
            resource: "Cart".to_string(),
            id: cart.id.clone(),
        })?;

        if stored.version != cart.version {
            return Err(CommerceError::ConcurrentModification {
                resource: "Cart".to_string(),
                expected: cart.version,
                actual: stored.version,
            });
        }

        stored.payment_ids.push(payment_id.to_string());
        stored.version += 1;
        Ok(stored.clone())
    }
}

#[async_trait]
impl PaymentService for InMemoryCommerce {
    async fn create_payment(&self, draft: PaymentDraft) -> CommerceResult<PaymentRecord> {
        let payment = PaymentRecord {
            id: Uuid::new_v4().to_string(),
            version: 1,
            amount_planned: draft.amount_planned,
            payment_method_info: draft.payment_method_info,
            interface_id: None,
            customer_id: draft.customer_id,
            transactions: Vec::new(),
        };
        self.insert_payment(payment.clone()).await;
        debug!(payment_id = %payment.id, "payment created");
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> CommerceResult<PaymentRecord> {
        self.payments
            .read()
            .await
            .get(payment_id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound {
                resource: "Payment".to_string(),
                id: payment_id.to_string(),
            })
    }

    async fn update_payment(
        &self,
        payment_id: &str,
        version: u64,
        actions: Vec<PaymentUpdateAction>,
    ) -> CommerceResult<PaymentRecord> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(payment_id)
            .ok_or_else(|| CommerceError::NotFound {
                resource: "Payment".to_string(),
                id: payment_id.to_string(),
            })?;

        if payment.version != version {
            return Err(CommerceError::ConcurrentModification {
                resource: "Payment".to_string(),
                expected: version,
                actual: payment.version,
            });
        }

        for action in actions {
            match action {
                PaymentUpdateAction::AddTransaction(draft) => {
                    payment.transactions.push(Transaction {
                        id: Uuid::new_v4().to_string(),
                        transaction_type: draft.transaction_type,
                        state: draft.state,
                        amount: draft.amount,
                        interaction_id: draft.interaction_id,
                        timestamp: Utc::now(),
                    })
                }
                PaymentUpdateAction::SetInterfaceId(interface_id) => {
                    payment.interface_id = Some(interface_id)
                }
                PaymentUpdateAction::SetMethodInfoMethod(method) => {
                    payment.payment_method_info.method = Some(method)
                }
            }
        }
        payment.version += 1;

        Ok(payment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::{PaymentMethodInfo, TransactionDraft, TransactionState, TransactionType};

    fn draft() -> PaymentDraft {
        PaymentDraft {
            amount_planned: Money::new("EUR", 74600),
            payment_method_info: PaymentMethodInfo {
                payment_interface: "paypal".to_string(),
                method: None,
            },
            customer_id: None,
        }
    }

    #[tokio::test]
    async fn update_bumps_version_and_appends() {
        let store = InMemoryCommerce::new();
        let payment = store.create_payment(draft()).await.unwrap();

        let updated = store
            .update_payment(
                &payment.id,
                payment.version,
                vec![
                    PaymentUpdateAction::SetInterfaceId("2WJ067824R598984A".to_string()),
                    PaymentUpdateAction::AddTransaction(TransactionDraft {
                        transaction_type: TransactionType::Authorization,
                        state: TransactionState::Success,
                        amount: Money::new("EUR", 74600),
                        interaction_id: Some("2WJ067824R598984A".to_string()),
                    }),
                ],
            )
            .await
            .unwrap();

        assert_eq!(updated.version, payment.version + 1);
        assert_eq!(updated.interface_id.as_deref(), Some("2WJ067824R598984A"));
        assert_eq!(updated.transactions.len(), 1);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryCommerce::new();
        let payment = store.create_payment(draft()).await.unwrap();
        store
            .update_payment(&payment.id, payment.version, vec![])
            .await
            .unwrap();

        let err = store
            .update_payment(&payment.id, payment.version, vec![])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommerceError::ConcurrentModification {
                resource: "Payment".to_string(),
                expected: 1,
                actual: 2,
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unknown_session_has_no_cart() {
        let store = InMemoryCommerce::new();
        let err = store.get_cart_for_session("nope").await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound { .. }));
    }
}
