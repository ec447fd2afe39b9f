//! Bounded, time-windowed event coalescing
//!
//! Decouples a fast producer (push events at notification speed) from a
//! slow consumer (a renderer that must not repaint more than N times per
//! second). Items enter a bounded queue; on overflow the oldest item is
//! dropped, favoring freshness over completeness. A periodic drain task
//! delivers everything queued since the last tick as one batch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Bounded drop-oldest buffer with periodic batch delivery
pub struct StreamCoalescer<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T: Send + 'static> StreamCoalescer<T> {
    /// Create a coalescer with the given queue capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue an item, discarding the oldest on overflow
    ///
    /// Never blocks the producer beyond the queue lock.
    pub async fn push(&self, item: T) {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(item);
    }

    /// Items currently queued
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Items discarded under overflow so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Spawn the drain loop
    ///
    /// Every `every`, all queued items are drained and handed to `sink` in
    /// one invocation; an empty tick delivers nothing. Either watch signal
    /// firing ends the loop permanently; items still queued are discarded.
    /// The signals are re-checked between drain and delivery so no batch
    /// reaches the sink after cancellation was observed. The queue lock is
    /// never held across the sink call.
    ///
    /// Sink failures are the consumer's own concern: the sink is infallible
    /// by contract, and a display-layer defect must not take down the
    /// pipeline.
    pub fn spawn_drain<F>(
        self: Arc<Self>,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
        mut cancel: watch::Receiver<bool>,
        sink: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The signal may have fired before this task started
            if *shutdown.borrow() || *cancel.borrow() {
                return;
            }

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = cancel.changed() => break,
                    _ = ticker.tick() => {
                        let batch: Vec<T> = {
                            let mut queue = self.queue.lock().await;
                            queue.drain(..).collect()
                        };
                        if batch.is_empty() {
                            continue;
                        }
                        if *shutdown.borrow() || *cancel.borrow() {
                            break;
                        }
                        sink(batch);
                    }
                }
            }

            tracing::debug!(dropped = self.dropped(), "Coalescer drain stopped");
        })
    }
}
