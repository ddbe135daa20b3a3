use crate::domain::ports::{RequestFilter, RequestLock, RequestStore};
use crate::domain::request::{PaymentRequest, RequestId, Status};
use crate::error::{PayoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// A thread-safe in-memory request store with per-row exclusive locking.
///
/// Each row lives behind its own `tokio::sync::Mutex`; the mutex is the row
/// lock, so readers of a locked row wait until the holder commits or rolls
/// back. Locking one row never blocks access to any other row.
#[derive(Default, Clone)]
pub struct InMemoryRequestStore {
    rows: Arc<RwLock<HashMap<RequestId, Arc<Mutex<PaymentRequest>>>>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: PaymentRequest) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&request.id) {
            return Err(PayoutError::Storage(format!(
                "request {} already exists",
                request.id
            )));
        }
        rows.insert(request.id, Arc::new(Mutex::new(request)));
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<PaymentRequest>> {
        let row = {
            let rows = self.rows.read().await;
            rows.get(&id).cloned()
        };
        match row {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>> {
        let rows: Vec<Arc<Mutex<PaymentRequest>>> = {
            let rows = self.rows.read().await;
            rows.values().cloned().collect()
        };
        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let request = row.lock().await.clone();
            if filter.matches(&request) {
                requests.push(request);
            }
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn lock_for_update(&self, id: RequestId) -> Result<Box<dyn RequestLock>> {
        let row = {
            let rows = self.rows.read().await;
            rows.get(&id).cloned()
        }
        .ok_or(PayoutError::NotFound(id))?;

        let guard = row.lock_owned().await;
        let draft = guard.clone();
        Ok(Box::new(InMemoryRequestLock { guard, draft }))
    }

    async fn delete(&self, id: RequestId) -> Result<()> {
        let row = {
            let rows = self.rows.read().await;
            rows.get(&id).cloned()
        }
        .ok_or(PayoutError::NotFound(id))?;

        // Hold the row lock while removing so a delete cannot interleave
        // with an in-flight read-modify-write on the same row.
        let guard = row.lock().await;
        if matches!(guard.status, Status::Processing | Status::Completed) {
            return Err(PayoutError::InvalidTransition {
                action: "delete",
                from: guard.status,
            });
        }
        let mut rows = self.rows.write().await;
        rows.remove(&id);
        Ok(())
    }
}

/// Row lock over an in-memory row.
///
/// Mutations are staged on a draft copy and written back on commit; dropping
/// the lock without committing leaves the row as it was.
struct InMemoryRequestLock {
    guard: OwnedMutexGuard<PaymentRequest>,
    draft: PaymentRequest,
}

#[async_trait]
impl RequestLock for InMemoryRequestLock {
    fn request(&self) -> &PaymentRequest {
        &self.draft
    }

    fn request_mut(&mut self) -> &mut PaymentRequest {
        &mut self.draft
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryRequestLock { mut guard, draft } = *self;
        *guard = draft;
        Ok(())
    }
}
