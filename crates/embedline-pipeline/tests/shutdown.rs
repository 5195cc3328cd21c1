use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use embedline_core::document::{Batch, Document};
use embedline_pipeline::queue::{DispatchQueue, WorkItem};

fn batch(i: usize) -> Batch {
    Batch::new(vec![Document::new(i.to_string(), "text")])
}

/// Runs `batches` through `workers` consumers whose processing time varies
/// with `seed`, returning (processed, stops seen with work outstanding).
async fn run(workers: usize, batches: usize, seed: u64) -> (usize, usize) {
    let queue = DispatchQueue::bounded(workers * 2);
    let processed = Arc::new(AtomicUsize::new(0));
    let early_stops = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let queue = queue.clone();
            let processed = processed.clone();
            let early_stops = early_stops.clone();
            tokio::spawn(async move {
                loop {
                    match queue.recv().await {
                        WorkItem::Job(job) => {
                            let id: u64 = job.batch.documents[0].id.parse().unwrap();
                            let jitter = (id * 31 + seed * 17 + w as u64 * 7) % 5;
                            tokio::time::sleep(Duration::from_millis(jitter)).await;
                            processed.fetch_add(1, Ordering::SeqCst);
                        }
                        WorkItem::Stop => {
                            if queue.outstanding() != 0 {
                                early_stops.fetch_add(1, Ordering::SeqCst);
                            }
                            return;
                        }
                    }
                }
            })
        })
        .collect();

    for i in 0..batches {
        assert!(queue.send(batch(i)).await);
    }
    queue.wait_drained().await;
    queue.stop(workers).await;
    for h in handles {
        h.await.unwrap();
    }
    (
        processed.load(Ordering::SeqCst),
        early_stops.load(Ordering::SeqCst),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_stop_marker_overtakes_queued_work() {
    for seed in 0..20 {
        for workers in [1, 2, 3, 8] {
            let (processed, early) = run(workers, 37, seed).await;
            assert_eq!(processed, 37, "seed {seed} workers {workers}");
            assert_eq!(early, 0, "seed {seed} workers {workers}");
        }
    }
}

#[tokio::test]
async fn drained_queue_holds_only_stop_markers() {
    let queue = DispatchQueue::bounded(4);
    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let mut jobs = 0;
            while let WorkItem::Job(_) = queue.recv().await {
                jobs += 1;
            }
            jobs
        })
    };
    for i in 0..10 {
        queue.send(batch(i)).await;
    }
    queue.wait_drained().await;
    assert!(queue.is_empty());
    queue.stop(1).await;
    assert_eq!(consumer.await.unwrap(), 10);
}
