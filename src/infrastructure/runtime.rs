use crate::application::processor::PaymentProcessor;
use crate::domain::ports::{JobScheduler, PaymentGatewayRef, RequestStoreRef};
use crate::domain::request::RequestId;
use crate::error::{PayoutError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

#[derive(Debug)]
struct Job {
    request_id: RequestId,
    delay: Duration,
}

/// Retry policy for worker jobs.
///
/// Only transient failures are retried; `NotFound` and skips terminate a job
/// on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Queue-backed scheduler handle.
///
/// `schedule` enqueues and returns immediately; delivery to the runtime is
/// at-least-once for as long as the runtime is alive. Cloning the handle
/// shares the same queue.
#[derive(Clone)]
pub struct QueueScheduler {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobScheduler for QueueScheduler {
    fn schedule(&self, request_id: RequestId, delay: Duration) -> Result<()> {
        self.tx
            .send(Job { request_id, delay })
            .map_err(|_| PayoutError::Scheduling("processing queue is closed".to_string()))
    }
}

/// Dispatch loop driving `PaymentProcessor` runs for scheduled jobs.
///
/// Each job waits out its delay and then runs the processor, retrying
/// transient failures with linear backoff up to the policy bound. The loop
/// exits once every scheduler handle has been dropped and in-flight jobs
/// have finished.
pub struct ProcessingRuntime {
    handle: JoinHandle<()>,
}

impl ProcessingRuntime {
    pub fn start(
        store: RequestStoreRef,
        gateway: PaymentGatewayRef,
        policy: RetryPolicy,
    ) -> (Arc<QueueScheduler>, ProcessingRuntime) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let processor = Arc::new(PaymentProcessor::new(store, gateway));

        let handle = tokio::spawn(async move {
            let mut jobs = JoinSet::new();
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(job) => {
                            jobs.spawn(run_job(processor.clone(), job, policy.clone()));
                        }
                        None => break,
                    },
                    Some(_) = jobs.join_next(), if !jobs.is_empty() => {}
                }
            }
            while jobs.join_next().await.is_some() {}
        });

        (Arc::new(QueueScheduler { tx }), ProcessingRuntime { handle })
    }

    /// Waits for the dispatch loop to finish.
    ///
    /// Completes only after all `QueueScheduler` handles are dropped and
    /// every accepted job has run to completion.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

async fn run_job(processor: Arc<PaymentProcessor>, job: Job, policy: RetryPolicy) {
    tokio::time::sleep(job.delay).await;

    let mut attempt = 1u32;
    loop {
        match processor.run(job.request_id).await {
            Ok(outcome) => {
                info!(request_id = %job.request_id, %outcome, attempt, "job finished");
                return;
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(request_id = %job.request_id, error = %e, attempt, "transient failure, retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                error!(request_id = %job.request_id, error = %e, attempt, "giving up on job");
                return;
            }
        }
    }
}
