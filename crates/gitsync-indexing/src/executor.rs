//! Applies document writes to the store.
//!
//! Indexers push [`WriteOp`]s into a [`WriteBatch`]; each full batch is
//! flushed and released before the next one fills, which bounds how many
//! blob contents are alive at once. A flush collapses operations on the
//! same document id (last one wins) and then runs the survivors with a
//! capped number of writes in flight. Batches flush strictly in order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use gitsync_search::{DocumentStore, StoreError};

use crate::retry::RetryPolicy;

/// One pending document write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Upsert { id: String, body: Value },
    Delete { id: String },
}

impl WriteOp {
    pub fn upsert(id: impl Into<String>, body: Value) -> Self {
        WriteOp::Upsert {
            id: id.into(),
            body,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        WriteOp::Delete { id: id.into() }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Upsert { id, .. } | WriteOp::Delete { id } => id,
        }
    }
}

/// Result of applying one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Upserted,
    Deleted,
    /// Delete of a document that was not there
    AlreadyAbsent,
    /// Retries exhausted or permanent error
    Failed,
}

/// Counters for a flushed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub upserted: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl WriteStats {
    pub fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Upserted => self.upserted += 1,
            WriteOutcome::Deleted | WriteOutcome::AlreadyAbsent => self.deleted += 1,
            WriteOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.upserted + self.deleted + self.failed
    }

    pub fn merge(&mut self, other: &WriteStats) {
        self.upserted += other.upserted;
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

/// Operations buffered until the next flush.
#[derive(Debug)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
    capacity: usize,
}

impl WriteBatch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ops: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer an operation. Returns true once the batch is due for a flush.
    pub fn push(&mut self, op: WriteOp) -> bool {
        self.ops.push(op);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.ops.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Take the buffered operations, keeping only the last one per id.
    /// Survivors keep their relative order.
    pub fn drain_collapsed(&mut self) -> Vec<WriteOp> {
        let ops = std::mem::replace(&mut self.ops, Vec::with_capacity(self.capacity));

        let mut last: HashMap<&str, usize> = HashMap::with_capacity(ops.len());
        for (i, op) in ops.iter().enumerate() {
            last.insert(op.id(), i);
        }
        let keep: Vec<bool> = ops
            .iter()
            .enumerate()
            .map(|(i, op)| last.get(op.id()) == Some(&i))
            .collect();

        ops.into_iter()
            .zip(keep)
            .filter_map(|(op, keep)| keep.then_some(op))
            .collect()
    }
}

/// Writes operations to one index with retries and bounded concurrency.
#[derive(Clone)]
pub struct IndexingExecutor {
    store: Arc<dyn DocumentStore>,
    index_name: String,
    retry: RetryPolicy,
    max_concurrent_writes: usize,
}

impl IndexingExecutor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index_name: impl Into<String>,
        retry: RetryPolicy,
        max_concurrent_writes: usize,
    ) -> Self {
        Self {
            store,
            index_name: index_name.into(),
            retry,
            max_concurrent_writes: max_concurrent_writes.max(1),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Apply one operation. Never fails: exhausted writes are logged and
    /// reported as [`WriteOutcome::Failed`].
    pub async fn apply(&self, op: &WriteOp) -> WriteOutcome {
        let store = self.store.as_ref();
        let index = self.index_name.as_str();

        let result = match op {
            WriteOp::Upsert { id, body } => {
                self.retry
                    .run(id, || async move {
                        store.upsert(index, id, body).await?;
                        Ok(WriteOutcome::Upserted)
                    })
                    .await
            }
            WriteOp::Delete { id } => {
                self.retry
                    .run(id, || async move {
                        match store.delete(index, id).await {
                            Ok(()) => Ok(WriteOutcome::Deleted),
                            Err(StoreError::NotFound(_)) => Ok(WriteOutcome::AlreadyAbsent),
                            Err(e) => Err(e),
                        }
                    })
                    .await
            }
        };

        match result {
            Ok(outcome) => {
                debug!(doc_id = %op.id(), ?outcome, "Applied write");
                outcome
            }
            Err(failure) => {
                warn!(
                    doc_id = %op.id(),
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Giving up on document write"
                );
                WriteOutcome::Failed
            }
        }
    }

    /// Flush a batch. The batch is empty afterwards.
    pub async fn flush(&self, batch: &mut WriteBatch) -> WriteStats {
        let buffered = batch.len();
        let ops = batch.drain_collapsed();
        let mut stats = WriteStats::default();
        if ops.is_empty() {
            return stats;
        }

        let outcomes: Vec<WriteOutcome> = stream::iter(ops.iter().map(|op| self.apply(op)))
            .buffer_unordered(self.max_concurrent_writes)
            .collect()
            .await;
        for outcome in outcomes {
            stats.record(outcome);
        }

        debug!(
            buffered,
            applied = ops.len(),
            upserted = stats.upserted,
            deleted = stats.deleted,
            failed = stats.failed,
            "Flushed write batch"
        );
        stats
    }
}

/// Streams operations through a batch, flushing whenever it fills.
pub struct BatchWriter<'a> {
    executor: &'a IndexingExecutor,
    batch: WriteBatch,
    stats: WriteStats,
}

impl<'a> BatchWriter<'a> {
    pub fn new(executor: &'a IndexingExecutor, batch_size: usize) -> Self {
        Self {
            executor,
            batch: WriteBatch::new(batch_size),
            stats: WriteStats::default(),
        }
    }

    pub async fn push(&mut self, op: WriteOp) {
        if self.batch.push(op) {
            let stats = self.executor.flush(&mut self.batch).await;
            self.stats.merge(&stats);
        }
    }

    /// Flush the remainder and return the totals.
    pub async fn finish(mut self) -> WriteStats {
        let stats = self.executor.flush(&mut self.batch).await;
        self.stats.merge(&stats);
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use gitsync_search::{MemoryDocumentStore, RawSearchResponse};
    use serde_json::json;

    const INDEX: &str = "test";

    /// Fails the first `failures` writes to each listed id, then delegates.
    struct FlakyStore {
        inner: MemoryDocumentStore,
        failing_ids: Vec<String>,
        failures: usize,
        attempts: std::sync::Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FlakyStore {
        fn new(failing_ids: &[&str], failures: usize) -> Self {
            Self {
                inner: MemoryDocumentStore::new(),
                failing_ids: failing_ids.iter().map(|s| s.to_string()).collect(),
                failures,
                attempts: std::sync::Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        fn attempts(&self, id: &str) -> usize {
            self.attempts.lock().unwrap().get(id).copied().unwrap_or(0)
        }

        fn should_fail(&self, id: &str) -> bool {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(id.to_string()).or_insert(0);
            *n += 1;
            self.failing_ids.iter().any(|f| f == id) && *n <= self.failures
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<(), StoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.should_fail(id) {
                return Err(StoreError::Unavailable("injected".to_string()));
            }
            self.inner.upsert(index, id, body).await
        }

        async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError> {
            if self.should_fail(id) {
                return Err(StoreError::Unavailable("injected".to_string()));
            }
            self.inner.delete(index, id).await
        }

        async fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, StoreError> {
            self.inner.search(index, body).await
        }

        async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
            self.inner.index_exists(index).await
        }

        async fn create_index(&self, index: &str, settings: &Value) -> Result<(), StoreError> {
            self.inner.create_index(index, settings).await
        }

        async fn delete_index(&self, index: &str) -> Result<(), StoreError> {
            self.inner.delete_index(index).await
        }

        async fn refresh(&self, index: &str) -> Result<(), StoreError> {
            self.inner.refresh(index).await
        }
    }

    fn executor(store: Arc<FlakyStore>, max_concurrent_writes: usize) -> IndexingExecutor {
        let retry = RetryPolicy::default()
            .with_max_attempts(10)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2));
        IndexingExecutor::new(store, INDEX, retry, max_concurrent_writes)
    }

    #[test]
    fn test_collapse_keeps_last_per_id() {
        let mut batch = WriteBatch::new(10);
        batch.push(WriteOp::upsert("1_a", json!({"v": 1})));
        batch.push(WriteOp::upsert("1_b", json!({"v": 1})));
        batch.push(WriteOp::delete("1_a"));
        batch.push(WriteOp::upsert("1_c", json!({"v": 1})));
        batch.push(WriteOp::upsert("1_b", json!({"v": 2})));

        let ops = batch.drain_collapsed();
        assert!(batch.is_empty());
        assert_eq!(
            ops,
            vec![
                WriteOp::delete("1_a"),
                WriteOp::upsert("1_c", json!({"v": 1})),
                WriteOp::upsert("1_b", json!({"v": 2})),
            ]
        );
    }

    #[test]
    fn test_batch_reports_full() {
        let mut batch = WriteBatch::new(2);
        assert!(!batch.push(WriteOp::delete("a")));
        assert!(batch.push(WriteOp::delete("b")));
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_always_failing_write_is_isolated() {
        let store = Arc::new(FlakyStore::new(&["1_bad"], usize::MAX));
        let executor = executor(store.clone(), 4);

        let mut batch = WriteBatch::new(10);
        batch.push(WriteOp::upsert("1_ok", json!({"v": 1})));
        batch.push(WriteOp::upsert("1_bad", json!({"v": 1})));
        batch.push(WriteOp::upsert("1_also_ok", json!({"v": 1})));

        let stats = executor.flush(&mut batch).await;
        assert_eq!(stats.upserted, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(store.attempts("1_bad"), 10);
        assert!(store.inner.get(INDEX, "1_ok").is_some());
        assert!(store.inner.get(INDEX, "1_bad").is_none());
    }

    #[tokio::test]
    async fn test_fail_twice_then_succeed_counts_once() {
        let store = Arc::new(FlakyStore::new(&["1_a"], 2));
        let executor = executor(store.clone(), 1);

        let outcome = executor.apply(&WriteOp::upsert("1_a", json!({"v": 1}))).await;
        assert_eq!(outcome, WriteOutcome::Upserted);
        assert_eq!(store.attempts("1_a"), 3);
        assert_eq!(store.inner.len(INDEX), 1);
    }

    #[tokio::test]
    async fn test_delete_of_missing_document_succeeds() {
        let store = Arc::new(FlakyStore::new(&[], 0));
        let executor = executor(store.clone(), 1);

        let outcome = executor.apply(&WriteOp::delete("1_gone.rb")).await;
        assert_eq!(outcome, WriteOutcome::AlreadyAbsent);
        assert_eq!(store.attempts("1_gone.rb"), 1);
    }

    #[tokio::test]
    async fn test_batch_writer_flushes_every_batch() {
        let store = Arc::new(FlakyStore::new(&[], 0));
        let executor = executor(store.clone(), 2);

        let mut writer = BatchWriter::new(&executor, 3);
        for i in 0..7 {
            writer.push(WriteOp::upsert(format!("1_f{}", i), json!({"i": i}))).await;
        }
        // Two full batches flushed, one op still buffered
        assert_eq!(store.inner.len(INDEX), 6);

        let stats = writer.finish().await;
        assert_eq!(stats.upserted, 7);
        assert_eq!(store.inner.len(INDEX), 7);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let store = Arc::new(FlakyStore::new(&[], 0));
        let executor = executor(store.clone(), 3);

        let mut batch = WriteBatch::new(50);
        for i in 0..20 {
            batch.push(WriteOp::upsert(format!("1_f{}", i), json!({"i": i})));
        }
        let stats = executor.flush(&mut batch).await;

        assert_eq!(stats.upserted, 20);
        assert!(store.peak_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(store.inner.len(INDEX), 20);
    }
}
