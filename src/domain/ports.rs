use super::request::{Currency, PaymentRequest, RequestId, Status};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub type RequestStoreRef = Arc<dyn RequestStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type JobSchedulerRef = Arc<dyn JobScheduler>;

/// Query filter for listing requests.
#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub status: Option<Status>,
    pub currency: Option<Currency>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl RequestFilter {
    pub fn matches(&self, request: &PaymentRequest) -> bool {
        if let Some(status) = self.status
            && request.status != status
        {
            return false;
        }
        if let Some(currency) = self.currency
            && request.currency != currency
        {
            return false;
        }
        if let Some(min) = self.min_amount
            && request.amount.value() < min
        {
            return false;
        }
        if let Some(max) = self.max_amount
            && request.amount.value() > max
        {
            return false;
        }
        true
    }
}

/// Durable store of payment requests.
///
/// `insert` must only return once the row is durably committed; callers rely
/// on this to sequence post-commit work (scheduling) so that a worker can
/// never be dispatched for a row that is not yet visible, and is never
/// dispatched at all if the insert fails.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: PaymentRequest) -> Result<()>;

    async fn get(&self, id: RequestId) -> Result<Option<PaymentRequest>>;

    /// Returns requests matching `filter`, newest first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>>;

    /// Acquires an exclusive row lock on the request.
    ///
    /// Blocks until the lock is available; other rows are unaffected.
    /// Returns `NotFound` if the row does not exist.
    async fn lock_for_update(&self, id: RequestId) -> Result<Box<dyn RequestLock>>;

    /// Deletes a request. Rows in `Processing` or `Completed` status must
    /// never be deleted and yield an `InvalidTransition` error.
    async fn delete(&self, id: RequestId) -> Result<()>;
}

/// An exclusive, transaction-scoped hold on a single request row.
///
/// Mutations go through the draft returned by `request_mut` and only become
/// visible to other readers on `commit`, which also releases the lock.
/// Dropping the lock without committing discards the draft.
#[async_trait]
pub trait RequestLock: Send {
    fn request(&self) -> &PaymentRequest;

    fn request_mut(&mut self) -> &mut PaymentRequest;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Outcome of submitting a payout to the external gateway.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum GatewayOutcome {
    Accepted,
    Declined,
}

/// The external payment gateway, abstracted as a black-box call of unbounded
/// duration that yields an accept/decline outcome.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit(&self, request: &PaymentRequest) -> Result<GatewayOutcome>;
}

/// Dispatch transport for worker invocations.
///
/// Delivery is at-least-once: a scheduled job may run more than once but
/// never zero times (as long as the transport is up). Duplicate deliveries
/// are harmless; the worker's pending-only guard turns them into skips.
pub trait JobScheduler: Send + Sync {
    fn schedule(&self, request_id: RequestId, delay: Duration) -> Result<()>;
}
