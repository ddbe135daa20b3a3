use crate::domain::ports::{
    JobScheduler, JobSchedulerRef, RequestFilter, RequestLock, RequestStore, RequestStoreRef,
};
use crate::domain::request::{NewPaymentRequest, PaymentRequest, RequestId, Transition};
use crate::error::{PayoutError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Default delay between a creation commit and the worker pickup.
///
/// The pending-only guard in the worker already handles commit races; the
/// delay just makes them rare in practice.
pub const DEFAULT_SCHEDULE_DELAY: Duration = Duration::from_secs(2);

/// Entry point for callers that act on behalf of a user: creation, the
/// strict transition commands, and reads.
///
/// Unlike the state machine itself, every command here surfaces an
/// `InvalidTransition` error when the request is not in a state that permits
/// it, so a misbehaving caller gets a signal instead of a silent no-op.
pub struct PayoutService {
    store: RequestStoreRef,
    scheduler: JobSchedulerRef,
    schedule_delay: Duration,
}

impl PayoutService {
    pub fn new(store: RequestStoreRef, scheduler: JobSchedulerRef) -> Self {
        Self::with_schedule_delay(store, scheduler, DEFAULT_SCHEDULE_DELAY)
    }

    pub fn with_schedule_delay(
        store: RequestStoreRef,
        scheduler: JobSchedulerRef,
        schedule_delay: Duration,
    ) -> Self {
        Self {
            store,
            scheduler,
            schedule_delay,
        }
    }

    /// Creates a new payment request and schedules its processing.
    ///
    /// Scheduling happens only after the store has reported a durable insert,
    /// so a worker can never observe a row that does not exist yet. A
    /// scheduling failure is logged but does not undo the creation: the row
    /// stays `Pending` and discoverable for a reconciliation pass.
    pub async fn create(&self, input: NewPaymentRequest) -> Result<PaymentRequest> {
        validate_recipient(&input)?;
        let request = PaymentRequest::new(input)?;
        self.store.insert(request.clone()).await?;

        if request.is_pending() {
            match self.scheduler.schedule(request.id, self.schedule_delay) {
                Ok(()) => {
                    info!(request_id = %request.id, delay = ?self.schedule_delay, "scheduled processing")
                }
                Err(e) => {
                    warn!(request_id = %request.id, error = %e, "failed to schedule processing, request stays pending")
                }
            }
        }
        Ok(request)
    }

    pub async fn get(&self, id: RequestId) -> Result<PaymentRequest> {
        self.store
            .get(id)
            .await?
            .ok_or(PayoutError::NotFound(id))
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>> {
        self.store.list(filter).await
    }

    pub async fn approve(&self, id: RequestId) -> Result<PaymentRequest> {
        self.transition(id, "approve", |request| request.approve())
            .await
    }

    pub async fn reject(&self, id: RequestId, reason: &str) -> Result<PaymentRequest> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PayoutError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }
        self.transition(id, "reject", |request| request.reject(reason))
            .await
    }

    pub async fn cancel(&self, id: RequestId) -> Result<PaymentRequest> {
        self.transition(id, "cancel", |request| request.cancel())
            .await
    }

    pub async fn complete(&self, id: RequestId) -> Result<PaymentRequest> {
        self.transition(id, "complete", |request| request.complete())
            .await
    }

    pub async fn delete(&self, id: RequestId) -> Result<()> {
        self.store.delete(id).await
    }

    async fn transition<F>(
        &self,
        id: RequestId,
        action: &'static str,
        apply: F,
    ) -> Result<PaymentRequest>
    where
        F: FnOnce(&mut PaymentRequest) -> Transition + Send,
    {
        let mut lock = self.store.lock_for_update(id).await?;
        let from = lock.request().status;
        if !apply(lock.request_mut()).is_applied() {
            return Err(PayoutError::InvalidTransition { action, from });
        }
        let updated = lock.request().clone();
        lock.commit().await?;
        info!(request_id = %id, %from, to = %updated.status, "applied {action}");
        Ok(updated)
    }
}

fn validate_recipient(input: &NewPaymentRequest) -> Result<()> {
    if input.recipient_name.trim().is_empty() {
        return Err(PayoutError::Validation(
            "Recipient name must not be empty".to_string(),
        ));
    }
    let account = input.recipient_account.trim();
    if account.is_empty() {
        return Err(PayoutError::Validation(
            "Recipient account must not be empty".to_string(),
        ));
    }
    if !account.chars().all(|c| c.is_ascii_digit()) {
        return Err(PayoutError::Validation(
            "Recipient account must contain digits only".to_string(),
        ));
    }
    Ok(())
}
