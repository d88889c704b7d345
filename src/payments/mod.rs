pub mod amount;
pub mod error;
pub mod paypal;
pub mod provider;
pub mod types;
pub mod utils;

pub use amount::Money;
pub use error::{PaymentError, PaymentResult};
pub use paypal::PaypalClient;
pub use provider::PaypalOrderApi;
