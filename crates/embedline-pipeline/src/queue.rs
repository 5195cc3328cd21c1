use std::sync::Arc;

use tokio::sync::watch;

use embedline_core::document::Batch;

/// Decrements the queue's outstanding-work count when dropped.
///
/// Travels with each batch so that work counts as completed only after the
/// worker is done with it, not when it is dequeued.
#[derive(Debug)]
struct Completion {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// A batch taken from the queue. Dropping it marks the batch as done.
#[derive(Debug)]
pub struct Job {
    pub batch: Batch,
    _done: Completion,
}

/// An item handed to a worker.
#[derive(Debug)]
pub enum WorkItem {
    Job(Job),
    /// Terminal marker: the worker must exit.
    Stop,
}

/// Bounded FIFO between the producer and the worker pool.
///
/// `send` suspends while the queue is full and `recv` while it is empty.
/// `wait_drained` resolves once every batch sent so far has been received
/// and its [`Job`] dropped.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: flume::Sender<WorkItem>,
    rx: flume::Receiver<WorkItem>,
    outstanding: Arc<watch::Sender<usize>>,
}

impl DispatchQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = flume::bounded(capacity.max(1));
        let (outstanding, _) = watch::channel(0);
        Self {
            tx,
            rx,
            outstanding: Arc::new(outstanding),
        }
    }

    /// Enqueue a batch, waiting for room. Returns `false` if every receiver
    /// is gone.
    pub async fn send(&self, batch: Batch) -> bool {
        self.outstanding.send_modify(|n| *n += 1);
        let job = Job {
            batch,
            _done: Completion {
                outstanding: Arc::clone(&self.outstanding),
            },
        };
        // on failure the job comes back inside the error and its drop
        // undoes the increment
        self.tx.send_async(WorkItem::Job(job)).await.is_ok()
    }

    /// Enqueue one terminal marker per worker.
    pub async fn stop(&self, workers: usize) {
        for _ in 0..workers {
            if self.tx.send_async(WorkItem::Stop).await.is_err() {
                break;
            }
        }
    }

    /// Take the next item. A disconnected queue reads as `Stop`.
    pub async fn recv(&self) -> WorkItem {
        self.rx.recv_async().await.unwrap_or(WorkItem::Stop)
    }

    /// Batches sent but not yet completed.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Items currently sitting in the channel.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }

    /// Wait until all sent batches have been processed.
    pub async fn wait_drained(&self) {
        let mut rx = self.outstanding.subscribe();
        // the sender lives in self, so this cannot observe a closed channel
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
