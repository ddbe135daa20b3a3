use crate::domain::ports::{GatewayOutcome, PaymentGateway};
use crate::domain::request::PaymentRequest;
use crate::error::Result;
use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::debug;

/// Stand-in for a real payment gateway.
///
/// Sleeps for a random duration in the configured range, then accepts or
/// declines with the configured probability. A real integration replaces
/// this with an actual API call behind the same `PaymentGateway` port.
pub struct SimulatedGateway {
    delay_ms: RangeInclusive<u64>,
    success_rate: f64,
}

impl SimulatedGateway {
    pub fn new(delay_ms: RangeInclusive<u64>, success_rate: f64) -> Self {
        Self {
            delay_ms,
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedGateway {
    /// The reference behavior: 2-5 s of latency, 90% acceptance.
    fn default() -> Self {
        Self::new(2000..=5000, 0.9)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn submit(&self, request: &PaymentRequest) -> Result<GatewayOutcome> {
        let wait_ms = rand::thread_rng().gen_range(self.delay_ms.clone());
        debug!(request_id = %request.id, wait_ms, "submitting to simulated gateway");
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        let accepted = rand::thread_rng().gen_bool(self.success_rate);
        Ok(if accepted {
            GatewayOutcome::Accepted
        } else {
            GatewayOutcome::Declined
        })
    }
}
