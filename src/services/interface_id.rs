use crate::commerce::PaymentRecord;

/// True when `order_id` is the PayPal order recorded on the payment at
/// creation. A payment without an interface id never matches.
pub fn is_valid_interface_id(payment: &PaymentRecord, order_id: &str) -> bool {
    payment.interface_id.as_deref() == Some(order_id)
}
