use async_trait::async_trait;
use payouts::application::processor::{PaymentProcessor, ProcessOutcome};
use payouts::domain::ports::{
    JobScheduler, RequestFilter, RequestLock, RequestStore,
};
use payouts::domain::request::{
    Currency, NewPaymentRequest, PaymentRequest, RequestId, Status,
};
use payouts::error::{PayoutError, Result};
use payouts::infrastructure::gateway::SimulatedGateway;
use payouts::infrastructure::in_memory::InMemoryRequestStore;
use payouts::infrastructure::runtime::{ProcessingRuntime, RetryPolicy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn new_request() -> PaymentRequest {
    PaymentRequest::new(NewPaymentRequest {
        amount: dec!(1000.00),
        currency: Currency::RUB,
        recipient_name: "Test User".to_string(),
        recipient_account: "1234567890".to_string(),
        recipient_bank: String::new(),
        recipient_bank_code: String::new(),
        description: String::new(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_duplicate_worker_runs_advance_request_exactly_once() {
    let store = Arc::new(InMemoryRequestStore::new());
    let request = new_request();
    let id = request.id;
    store.insert(request).await.unwrap();

    let processor = Arc::new(PaymentProcessor::new(
        store.clone(),
        Arc::new(SimulatedGateway::new(50..=50, 1.0)),
    ));

    let (first, second) = tokio::join!(processor.run(id), processor.run(id));
    let outcomes = [first.unwrap(), second.unwrap()];

    // Exactly one run transitions the request; the other observes a
    // non-pending row and skips.
    let approvals = outcomes
        .iter()
        .filter(|o| **o == ProcessOutcome::Approved)
        .count();
    let skips = outcomes
        .iter()
        .filter(|o| matches!(o, ProcessOutcome::Skipped(_)))
        .count();
    assert_eq!(approvals, 1, "outcomes: {outcomes:?}");
    assert_eq!(skips, 1, "outcomes: {outcomes:?}");

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Approved);
}

#[tokio::test]
async fn test_user_cancel_during_gateway_call_wins() {
    let store = Arc::new(InMemoryRequestStore::new());
    let request = new_request();
    let id = request.id;
    store.insert(request).await.unwrap();

    let processor = Arc::new(PaymentProcessor::new(
        store.clone(),
        Arc::new(SimulatedGateway::new(100..=100, 1.0)),
    ));

    let worker = {
        let processor = processor.clone();
        tokio::spawn(async move { processor.run(id).await })
    };

    // Let the worker flip the row to processing and enter the gateway call,
    // then cancel while no lock is held.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let mut lock = store.lock_for_update(id).await.unwrap();
    assert_eq!(lock.request().status, Status::Processing);
    assert!(lock.request_mut().cancel().is_applied());
    lock.commit().await.unwrap();

    let outcome = worker.await.unwrap().unwrap();
    assert_eq!(outcome, ProcessOutcome::Skipped(Status::Cancelled));

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Cancelled);
    assert!(stored.processed_at.is_none());
}

/// Store wrapper that fails the first N lock acquisitions with a transient
/// error, standing in for lock timeouts.
struct FlakyStore {
    inner: InMemoryRequestStore,
    failures_left: AtomicU32,
    lock_calls: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryRequestStore::new(),
            failures_left: AtomicU32::new(failures),
            lock_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl RequestStore for FlakyStore {
    async fn insert(&self, request: PaymentRequest) -> Result<()> {
        self.inner.insert(request).await
    }

    async fn get(&self, id: RequestId) -> Result<Option<PaymentRequest>> {
        self.inner.get(id).await
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>> {
        self.inner.list(filter).await
    }

    async fn lock_for_update(&self, id: RequestId) -> Result<Box<dyn RequestLock>> {
        self.lock_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PayoutError::Storage("simulated lock timeout".to_string()));
        }
        self.inner.lock_for_update(id).await
    }

    async fn delete(&self, id: RequestId) -> Result<()> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried_up_to_bound() {
    let store = Arc::new(FlakyStore::new(2));
    let request = new_request();
    let id = request.id;
    store.insert(request).await.unwrap();

    let gateway = Arc::new(SimulatedGateway::new(0..=0, 1.0));
    let (scheduler, runtime) = ProcessingRuntime::start(
        store.clone(),
        gateway,
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        },
    );
    scheduler.schedule(id, Duration::ZERO).unwrap();
    drop(scheduler);
    runtime.join().await;

    // Two failed attempts, then a successful run (two lock phases)
    assert_eq!(store.lock_calls.load(Ordering::SeqCst), 4);
    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Approved);
}

#[tokio::test]
async fn test_exhausted_retries_leave_request_pending() {
    let store = Arc::new(FlakyStore::new(10));
    let request = new_request();
    let id = request.id;
    store.insert(request).await.unwrap();

    let gateway = Arc::new(SimulatedGateway::new(0..=0, 1.0));
    let (scheduler, runtime) = ProcessingRuntime::start(
        store.clone(),
        gateway,
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        },
    );
    scheduler.schedule(id, Duration::ZERO).unwrap();
    drop(scheduler);
    runtime.join().await;

    assert_eq!(store.lock_calls.load(Ordering::SeqCst), 3);
    // The request stays pending and discoverable for reconciliation
    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Pending);
}

#[tokio::test]
async fn test_missing_request_is_not_retried() {
    let store = Arc::new(FlakyStore::new(0));

    let gateway = Arc::new(SimulatedGateway::new(0..=0, 1.0));
    let (scheduler, runtime) = ProcessingRuntime::start(
        store.clone(),
        gateway,
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        },
    );
    scheduler.schedule(RequestId::new(), Duration::ZERO).unwrap();
    drop(scheduler);
    runtime.join().await;

    // A single attempt: not-found is permanent
    assert_eq!(store.lock_calls.load(Ordering::SeqCst), 1);
}
