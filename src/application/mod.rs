//! Application layer orchestrating the request lifecycle.
//!
//! `PayoutService` is what the (external) API layer calls: creation plus the
//! strict, pre-checked transition commands. `PaymentProcessor` is the
//! asynchronous worker that advances a single request against the gateway.

pub mod processor;
pub mod service;
