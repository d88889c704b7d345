//! PayPal payment connector: reconciles commerce payment records with PayPal
//! Checkout Orders v2.

pub mod api;
pub mod commerce;
pub mod config;
pub mod enabler;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod services;
