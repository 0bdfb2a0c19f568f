//! Per-relation key batching.
//!
//! A batch starts out *collecting*: every [`RelationBatcher::load`] call adds
//! its key and gets a [`Deferred`] back without waiting. Once the collection
//! window has passed, the first handle to be awaited claims the batch
//! (*dispatched*), detaches it so later keys open a fresh batch, and runs one
//! `IN` query for the distinct keys. The rows are partitioned by join column
//! and published through the batch's slot (*completed*); each handle then
//! picks out the rows for its own key, or an empty list.

use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::errors::LoadError;
use super::scope::RequestScope;
use super::slot::Slot;
use crate::compiler::{compile_relation, ToSql};
use crate::model::Entity;
use crate::warehouse::{Record, Records};

/// Static description of one relation field, shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationLoader {
    pub owner: String,
    pub target: Entity,
    pub join_column: String,
}

impl RelationLoader {
    pub fn new(owner: impl Into<String>, target: Entity, join_column: impl Into<String>) -> Self {
        RelationLoader {
            owner: owner.into(),
            target,
            join_column: join_column.into(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}->{}.{}", self.owner, self.target.name, self.join_column)
    }
}

/// Keys match across representations, so `1` and `"1"` land together.
pub fn canonical_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Collecting,
    Dispatched,
    Completed,
}

type Partitioned = Arc<HashMap<String, Records>>;
type BatchResult = Result<Partitioned, LoadError>;

#[derive(Debug, Default)]
pub struct Batch {
    keys: Mutex<Vec<Value>>,
    claimed: AtomicBool,
    slot: Slot<BatchResult>,
}

impl Batch {
    pub fn state(&self) -> BatchState {
        if self.slot.is_completed() {
            BatchState::Completed
        } else if self.claimed.load(Ordering::Acquire) {
            BatchState::Dispatched
        } else {
            BatchState::Collecting
        }
    }

    pub fn key_count(&self) -> usize {
        lock(&self.keys).len()
    }

    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }
}

/// Completes the batch with `Cancelled` if dispatch is abandoned midway.
struct DispatchGuard<'a>(&'a Batch);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if !self.0.slot.is_completed() {
            log::warn!("Relation batch dropped before completion, cancelling waiters");
            self.0.slot.complete(Err(LoadError::Cancelled));
        }
    }
}

#[derive(Debug)]
pub struct RelationBatcher {
    relation: Arc<RelationLoader>,
    current: Mutex<Option<Arc<Batch>>>,
}

impl RelationBatcher {
    pub fn new(relation: Arc<RelationLoader>) -> Self {
        RelationBatcher {
            relation,
            current: Mutex::new(None),
        }
    }

    pub fn relation(&self) -> &RelationLoader {
        &self.relation
    }

    /// The batch currently collecting keys, if any.
    pub fn current_batch(&self) -> Option<Arc<Batch>> {
        lock(&self.current).clone()
    }

    /// Queues `key` and returns immediately. A null key never reaches the
    /// warehouse and resolves to an empty list.
    pub fn load(self: &Arc<Self>, key: Value, scope: RequestScope) -> Deferred {
        if key.is_null() {
            return Deferred {
                inner: DeferredInner::Ready,
            };
        }
        let batch = {
            let mut current = lock(&self.current);
            let batch = current.get_or_insert_with(|| Arc::new(Batch::default()));
            lock(&batch.keys).push(key.clone());
            batch.clone()
        };
        Deferred {
            inner: DeferredInner::Pending {
                key: canonical_key(&key),
                batch,
                batcher: self.clone(),
                scope,
            },
        }
    }

    fn detach(&self, batch: &Arc<Batch>) {
        let mut current = lock(&self.current);
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, batch)) {
            current.take();
        }
    }

    async fn dispatch(&self, batch: &Arc<Batch>, scope: &RequestScope) {
        self.detach(batch);
        let guard = DispatchGuard(batch);
        let keys = std::mem::take(&mut *lock(&batch.keys));
        let result = self.fetch(keys, scope).await;
        guard.0.slot.complete(result);
    }

    async fn fetch(&self, keys: Vec<Value>, scope: &RequestScope) -> BatchResult {
        if keys.is_empty() {
            return Ok(Arc::default());
        }
        let case = scope.identifier_case();
        let statement =
            compile_relation(&self.relation.target, &self.relation.join_column, &keys, case)?;
        log::debug!(
            "[{}] Dispatching relation {} with {} key(s)",
            scope.id(),
            self.relation.id(),
            keys.len()
        );
        let rows = scope.run(&statement.to_sql()).await?;
        Ok(Arc::new(partition(
            rows,
            &case.normalize(&self.relation.join_column),
        )))
    }
}

fn partition(rows: Records, join_column: &str) -> HashMap<String, Records> {
    let mut partitioned: HashMap<String, Records> = HashMap::new();
    for row in rows {
        let Some(key) = row.get(join_column).filter(|v| !v.is_null()) else {
            continue;
        };
        partitioned
            .entry(canonical_key(key))
            .or_default()
            .push(row);
    }
    partitioned
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to the rows for one key of a batch.
pub struct Deferred {
    inner: DeferredInner,
}

enum DeferredInner {
    Ready,
    Pending {
        key: String,
        batch: Arc<Batch>,
        batcher: Arc<RelationBatcher>,
        scope: RequestScope,
    },
}

impl Deferred {
    pub async fn resolve(self) -> Result<Vec<Record>, LoadError> {
        let (key, batch, batcher, scope) = match self.inner {
            DeferredInner::Ready => return Ok(Vec::new()),
            DeferredInner::Pending {
                key,
                batch,
                batcher,
                scope,
            } => (key, batch, batcher, scope),
        };

        scope.collection_window(&batch).await?;
        if batch.claim() {
            batcher.dispatch(&batch, &scope).await;
        }
        match batch.slot.wait().await {
            Ok(partitioned) => Ok(partitioned.get(&key).cloned().unwrap_or_default()),
            Err(e) => Err(e.clone()),
        }
    }
}

impl IntoFuture for Deferred {
    type Output = Result<Vec<Record>, LoadError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(rows: Vec<Value>) -> Records {
        rows.into_iter()
            .filter_map(|r| match r {
                Value::Object(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_partition_groups_rows_by_join_column() {
        let rows = records(vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": 2, "b": "y"}),
            json!({"a": 1, "b": "z"}),
            json!({"a": null, "b": "w"}),
        ]);
        let partitioned = partition(rows, "a");
        assert_eq!(partitioned.len(), 2);
        assert_eq!(partitioned["1"].len(), 2);
        assert_eq!(partitioned["2"].len(), 1);
    }

    #[test]
    fn test_canonical_key_ignores_representation() {
        assert_eq!(canonical_key(&json!(7)), canonical_key(&json!("7")));
        assert_ne!(canonical_key(&json!(7)), canonical_key(&json!(8)));
    }
}
