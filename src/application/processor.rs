use crate::domain::ports::{
    GatewayOutcome, PaymentGateway, PaymentGatewayRef, RequestLock, RequestStore, RequestStoreRef,
};
use crate::domain::request::{RequestId, Status};
use crate::error::Result;
use std::fmt;
use tracing::{info, warn};

/// Reason recorded when the external gateway declines a payout.
pub const GATEWAY_DECLINE_REASON: &str = "Rejected by external system (simulated failure)";

/// Result of a single worker run.
///
/// `Skipped` is not a failure: it means the row had already been advanced by
/// a duplicate delivery, a prior run or a user action, and taking no action
/// is exactly what makes duplicate invocations safe.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProcessOutcome {
    Approved,
    Rejected,
    Skipped(Status),
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOutcome::Approved => f.write_str("approved"),
            ProcessOutcome::Rejected => f.write_str("rejected"),
            ProcessOutcome::Skipped(status) => write!(f, "skipped (status: {status})"),
        }
    }
}

/// The asynchronous processing worker.
///
/// Advances exactly one request from `Pending` towards a decision, tolerating
/// concurrent access through the store's row lock and the state machine's
/// no-op guard. Mutual exclusion comes from the row lock alone; multiple
/// worker instances may run concurrently across processes.
pub struct PaymentProcessor {
    store: RequestStoreRef,
    gateway: PaymentGatewayRef,
}

impl PaymentProcessor {
    pub fn new(store: RequestStoreRef, gateway: PaymentGatewayRef) -> Self {
        Self { store, gateway }
    }

    /// Runs one processing attempt for `id`.
    ///
    /// Phase one: under the row lock, re-read the status; anything other than
    /// `Pending` aborts the run as a skip. Otherwise flip to `Processing` and
    /// commit, releasing the lock. The gateway call happens outside any lock.
    /// Phase two: re-lock and apply the decision; if a user action won the
    /// race in between, the terminal transition no-ops and the run reports a
    /// skip.
    pub async fn run(&self, id: RequestId) -> Result<ProcessOutcome> {
        info!(request_id = %id, "starting processing");

        let mut lock = self.store.lock_for_update(id).await?;
        let status = lock.request().status;
        if status != Status::Pending {
            warn!(request_id = %id, %status, "request is not pending, skipping");
            return Ok(ProcessOutcome::Skipped(status));
        }
        lock.request_mut().start_processing();
        let snapshot = lock.request().clone();
        lock.commit().await?;
        info!(request_id = %id, "status changed to processing");

        // External call, outside any lock. A transport error here is
        // propagated; the row stays in `Processing` for reconciliation.
        let outcome = self.gateway.submit(&snapshot).await?;

        let mut lock = self.store.lock_for_update(id).await?;
        let (transition, result) = match outcome {
            GatewayOutcome::Accepted => (lock.request_mut().approve(), ProcessOutcome::Approved),
            GatewayOutcome::Declined => (
                lock.request_mut().reject(GATEWAY_DECLINE_REASON),
                ProcessOutcome::Rejected,
            ),
        };
        let status = lock.request().status;
        lock.commit().await?;

        if transition.is_applied() {
            info!(request_id = %id, outcome = %result, "processing finished");
            Ok(result)
        } else {
            // Lost the race against a concurrent transition (e.g. a cancel).
            warn!(request_id = %id, %status, "decision superseded by concurrent transition");
            Ok(ProcessOutcome::Skipped(status))
        }
    }
}
