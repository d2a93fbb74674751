//! Single writer task that serializes dataset saves.
//!
//! # Invariants
//! - Saves complete in the order they were enqueued.
//! - When several snapshots are queued, only the newest is written and every
//!   waiter receives that write's result.
//! - Each save is bounded by the configured timeout.
//! - A timed-out save is reported as `Timeout` but may still land: the SQLite
//!   job already handed to `spawn_blocking` runs to completion. Saves write
//!   whole snapshots, so a later save or `flush` overwrites it either way.

use crate::model::dataset::Dataset;
use crate::storage::{StorageAdapter, StorageError, StorageResult};
use log::{debug, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub(crate) type SaveReply = oneshot::Receiver<StorageResult<()>>;

struct SaveJob {
    revision: u64,
    dataset: Dataset,
    reply: oneshot::Sender<StorageResult<()>>,
}

/// Called on the writer task after each save, before waiters are released.
pub(crate) type SaveObserver = Box<dyn Fn(u64, &StorageResult<()>) + Send + Sync>;

pub(crate) struct WriteQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<SaveJob>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Spawns the writer on the current Tokio runtime.
    pub(crate) fn spawn<A>(adapter: Arc<A>, timeout: Duration, observer: SaveObserver) -> Self
    where
        A: StorageAdapter + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(adapter, timeout, receiver, observer));
        Self {
            sender: Mutex::new(Some(sender)),
            task: Mutex::new(Some(task)),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.sender
            .lock()
            .map(|sender| sender.is_some())
            .unwrap_or(false)
    }

    /// Queues a snapshot; the receiver resolves once it (or a newer one) lands.
    pub(crate) fn enqueue(&self, revision: u64, dataset: Dataset) -> StorageResult<SaveReply> {
        let (reply, receiver) = oneshot::channel();
        let job = SaveJob {
            revision,
            dataset,
            reply,
        };
        let guard = self
            .sender
            .lock()
            .map_err(|_| StorageError::Unavailable("write queue lock poisoned".to_string()))?;
        let Some(sender) = guard.as_ref() else {
            return Err(closed());
        };
        sender.send(job).map_err(|_| closed())?;
        Ok(receiver)
    }

    /// Closes the queue and waits for queued saves to finish.
    pub(crate) async fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!("event=writer_join module=store status=error error={err}");
            }
        }
    }
}

pub(crate) fn closed() -> StorageError {
    StorageError::Unavailable("write queue closed".to_string())
}

pub(crate) fn timeout_error(operation: &'static str, after: Duration) -> StorageError {
    StorageError::Timeout {
        operation,
        after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
    }
}

async fn run_writer<A>(
    adapter: Arc<A>,
    timeout: Duration,
    mut receiver: mpsc::UnboundedReceiver<SaveJob>,
    observer: SaveObserver,
) where
    A: StorageAdapter + 'static,
{
    while let Some(first) = receiver.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = receiver.try_recv() {
            batch.push(next);
        }
        let Some(newest) = batch.pop() else {
            continue;
        };

        let started_at = Instant::now();
        let result = match tokio::time::timeout(timeout, adapter.save(&newest.dataset)).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error("save", timeout)),
        };
        match &result {
            Ok(()) => debug!(
                "event=dataset_save module=store status=ok backend={} revision={} coalesced={} duration_ms={}",
                adapter.backend().as_str(),
                newest.revision,
                batch.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=dataset_save module=store status=error backend={} revision={} error_code={}",
                adapter.backend().as_str(),
                newest.revision,
                err.code()
            ),
        }

        observer(newest.revision, &result);
        for job in batch {
            let _ = job.reply.send(result.clone());
        }
        let _ = newest.reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::WriteQueue;
    use crate::model::dataset::Dataset;
    use crate::model::group::Group;
    use crate::storage::kv::MemoryKeyValueStore;
    use crate::storage::local::LocalStorageAdapter;
    use crate::storage::{StorageError, StorageResult};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    fn ignore_saves(_: u64, _: &StorageResult<()>) {}

    fn dataset(name: &str) -> Dataset {
        Dataset {
            groups: vec![Group::with_id(Uuid::new_v4(), name, 1).expect("valid group")],
        }
    }

    #[tokio::test]
    async fn saves_land_in_order_and_report_revisions() {
        let kv = MemoryKeyValueStore::new();
        let adapter = Arc::new(LocalStorageAdapter::new(kv.clone(), "social", 1));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observed = Arc::clone(&seen);
        let queue = WriteQueue::spawn(
            adapter,
            Duration::from_secs(1),
            Box::new(move |revision: u64, _: &StorageResult<()>| {
                observed.lock().expect("lock").push(revision)
            }),
        );

        let first = queue.enqueue(1, dataset("One")).expect("enqueue");
        let second = queue.enqueue(2, dataset("Two")).expect("enqueue");
        first.await.expect("reply").expect("save");
        second.await.expect("reply").expect("save");

        let raw = kv.peek("social:v1").expect("payload written");
        assert!(raw.contains("Two"));
        let revisions = seen.lock().expect("lock").clone();
        assert_eq!(revisions.last(), Some(&2));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let kv = MemoryKeyValueStore::new();
        kv.faults().delay_writes(Duration::from_millis(200));
        let adapter = Arc::new(LocalStorageAdapter::new(kv, "social", 1));
        let queue = WriteQueue::spawn(adapter, Duration::from_millis(20), Box::new(ignore_saves));

        let reply = queue.enqueue(1, dataset("Slow")).expect("enqueue");
        assert_eq!(
            reply.await.expect("reply"),
            Err(StorageError::Timeout {
                operation: "save",
                after_ms: 20
            })
        );
    }

    #[tokio::test]
    async fn shutdown_drains_and_closes() {
        let kv = MemoryKeyValueStore::new();
        let adapter = Arc::new(LocalStorageAdapter::new(kv.clone(), "social", 1));
        let queue = WriteQueue::spawn(adapter, Duration::from_secs(1), Box::new(ignore_saves));

        let reply = queue.enqueue(1, dataset("Last")).expect("enqueue");
        queue.shutdown().await;
        reply.await.expect("reply").expect("save");
        assert!(!queue.is_open());
        assert!(queue.enqueue(2, dataset("Late")).is_err());
    }
}
