use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use super::batcher::{Batch, BatchState, Deferred, RelationBatcher, RelationLoader};
use super::errors::LoadError;
use crate::warehouse::{IdentifierCase, Records, WarehouseClient};

/// State owned by one GraphQL request: the warehouse handle, the relation
/// batchers created for it, and its cancellation signal. Cloning shares the
/// same scope.
#[derive(Clone)]
pub struct RequestScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: Uuid,
    warehouse: Arc<dyn WarehouseClient>,
    batch_delay: Duration,
    cancel: watch::Sender<bool>,
    statements: AtomicUsize,
    batchers: Mutex<HashMap<String, Arc<RelationBatcher>>>,
}

impl RequestScope {
    pub fn new(warehouse: Arc<dyn WarehouseClient>, batch_delay: Duration) -> Self {
        let (cancel, _) = watch::channel(false);
        RequestScope {
            inner: Arc::new(ScopeInner {
                id: Uuid::new_v4(),
                warehouse,
                batch_delay,
                cancel,
                statements: AtomicUsize::new(0),
                batchers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn identifier_case(&self) -> IdentifierCase {
        self.inner.warehouse.identifier_case()
    }

    /// Number of statements sent to the warehouse so far.
    pub fn statement_count(&self) -> usize {
        self.inner.statements.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.inner.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancel.subscribe();
        // the sender lives as long as the scope, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancels the scope when dropped, e.g. when the client goes away.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop {
            scope: self.clone(),
        }
    }

    /// Runs one statement, abandoning it if the scope is cancelled first.
    pub async fn run(&self, sql: &str) -> Result<Records, LoadError> {
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let n = self.inner.statements.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("[{}] Running query #{}: {}", self.inner.id, n, sql);

        tokio::select! {
            biased;
            _ = self.cancelled() => {
                log::warn!("[{}] Query #{} abandoned: request cancelled", self.inner.id, n);
                Err(LoadError::Cancelled)
            }
            result = self.inner.warehouse.run(sql) => result.map_err(LoadError::from),
        }
    }

    /// Batcher for `relation`, created on first use within this request.
    pub fn batcher(&self, relation: &Arc<RelationLoader>) -> Arc<RelationBatcher> {
        let mut batchers = self
            .inner
            .batchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        batchers
            .entry(relation.id())
            .or_insert_with(|| Arc::new(RelationBatcher::new(relation.clone())))
            .clone()
    }

    pub fn load(&self, relation: &Arc<RelationLoader>, key: Value) -> Deferred {
        self.batcher(relation).load(key, self.clone())
    }

    /// Lets sibling resolvers queue their keys before a batch is claimed.
    ///
    /// After the configured delay the caller keeps yielding for as long as
    /// each yield lets other resolvers add keys to `batch`, so one tier of
    /// parents resumed by an earlier batch lands in a single query however
    /// long their wake-up takes. A batch that is no longer collecting ends the
    /// wait at once.
    pub(crate) async fn collection_window(&self, batch: &Batch) -> Result<(), LoadError> {
        if !self.inner.batch_delay.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancelled() => return Err(LoadError::Cancelled),
                _ = tokio::time::sleep(self.inner.batch_delay) => {}
            }
        }
        let mut seen = batch.key_count();
        loop {
            tokio::task::yield_now().await;
            if self.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            if batch.state() != BatchState::Collecting {
                return Ok(());
            }
            let now = batch.key_count();
            if now == seen {
                return Ok(());
            }
            seen = now;
        }
    }
}

pub struct CancelOnDrop {
    scope: RequestScope,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
