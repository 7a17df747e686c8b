//! Ingestion queue: serializes asynchronous candle arrivals into one
//! ordered stream.
//!
//! The queue is the only component that may receive concurrent calls.
//! `enqueue` assigns a strictly increasing sequence number under the same
//! lock that orders the buffer, and a single drain task dispatches events
//! one at a time, so downstream consumers never observe interleaved
//! mutations or out-of-sequence events.

use crate::config::QueueConfig;
use crate::domain::errors::{IngestError, ValidationError};
use crate::domain::market::candle::{Candle, CandleEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Downstream consumer port driven by the drain task.
///
/// Implementations must be safe to share; the queue guarantees at most one
/// `on_candle` call is in flight at a time.
#[async_trait::async_trait]
pub trait CandleSink: Send + Sync {
    async fn on_candle(&self, candle: Candle) -> anyhow::Result<()>;
}

/// Optional telemetry sink for dropped events and consumer failures.
///
/// All methods default to no-ops so implementors only override what they
/// care about.
pub trait IngestObserver: Send + Sync {
    fn on_drop(&self, _reason: &IngestError) {}
    fn on_dispatch_error(&self, _error: &anyhow::Error) {}
}

/// Counters exposed for observability. `depth` is the current backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub received: u64,
    pub processed: u64,
    pub rejected: u64,
    pub dropped_overflow: u64,
    pub dropped_stale: u64,
    pub depth: usize,
}

struct Sequenced {
    seq: u64,
    received_at: Instant,
    candle: Candle,
}

struct Inner {
    buffer: Mutex<VecDeque<Sequenced>>,
    notify: Notify,
    closed: AtomicBool,
    next_seq: AtomicU64,
    received: AtomicU64,
    processed: AtomicU64,
    rejected: AtomicU64,
    dropped_overflow: AtomicU64,
    dropped_stale: AtomicU64,
    capacity: usize,
    staleness: Duration,
    pacing: Duration,
    sink: Arc<dyn CandleSink>,
    observer: Option<Arc<dyn IngestObserver>>,
}

/// Bounded, paced, strictly ordered ingestion queue: one producer, one
/// serialized consumer loop.
pub struct IngestQueue {
    inner: Arc<Inner>,
    drain: JoinHandle<()>,
}

impl IngestQueue {
    /// Construct the queue and spawn its single drain task.
    ///
    /// Fails fast on structural invariant violations rather than degrading
    /// at runtime.
    pub fn spawn(
        config: &QueueConfig,
        sink: Arc<dyn CandleSink>,
        observer: Option<Arc<dyn IngestObserver>>,
    ) -> anyhow::Result<Self> {
        if config.capacity == 0 {
            anyhow::bail!("ingest queue capacity must be at least 1");
        }
        if config.staleness_ms == 0 {
            anyhow::bail!("ingest queue staleness threshold must be positive");
        }

        let inner = Arc::new(Inner {
            buffer: Mutex::new(VecDeque::with_capacity(config.capacity)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            next_seq: AtomicU64::new(0),
            received: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dropped_overflow: AtomicU64::new(0),
            dropped_stale: AtomicU64::new(0),
            capacity: config.capacity,
            staleness: Duration::from_millis(config.staleness_ms),
            pacing: Duration::from_millis(config.pacing_ms),
            sink,
            observer,
        });

        let drain = tokio::spawn(drain_loop(Arc::clone(&inner)));

        Ok(Self { inner, drain })
    }

    /// Accept one externally produced candle event.
    ///
    /// Validates it into a canonical [`Candle`], assigns its sequence
    /// number, and buffers it for dispatch. If the buffer is full the
    /// oldest buffered event is evicted (drop-oldest favors freshness).
    ///
    /// Returns the assigned sequence number, or the validation error for a
    /// malformed event. Either way the pipeline keeps running.
    pub fn enqueue(&self, event: CandleEvent) -> Result<u64, ValidationError> {
        let inner = &self.inner;
        inner.received.fetch_add(1, Ordering::Relaxed);

        let candle = match event.validate() {
            Ok(candle) => candle,
            Err(err) => {
                inner.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("IngestQueue: event rejected: {}", err);
                if let Some(observer) = &inner.observer {
                    observer.on_drop(&IngestError::Rejected(err.clone()));
                }
                return Err(err);
            }
        };

        let seq;
        {
            let mut buffer = inner
                .buffer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if buffer.len() == inner.capacity {
                buffer.pop_front();
                inner.dropped_overflow.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "IngestQueue: buffer at capacity ({}), oldest event dropped",
                    inner.capacity
                );
                if let Some(observer) = &inner.observer {
                    observer.on_drop(&IngestError::QueueOverflow {
                        capacity: inner.capacity,
                    });
                }
            }
            // Sequence assignment and insertion happen under one lock, so
            // buffer order always equals sequence order.
            seq = inner.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
            buffer.push_back(Sequenced {
                seq,
                received_at: Instant::now(),
                candle,
            });
        }
        inner.notify.notify_one();

        Ok(seq)
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.stats()
    }

    /// Stop accepting the backlog: the drain task finishes the buffered
    /// events and exits. Awaits the task so state mutation has quiesced,
    /// then returns the final counters.
    pub async fn shutdown(self) -> QueueStats {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
        let _ = self.drain.await;
        self.inner.stats()
    }
}

impl Inner {
    fn stats(&self) -> QueueStats {
        let depth = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len();
        QueueStats {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            dropped_stale: self.dropped_stale.load(Ordering::Relaxed),
            depth,
        }
    }
}

async fn drain_loop(inner: Arc<Inner>) {
    loop {
        let item = {
            loop {
                let popped = inner
                    .buffer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .pop_front();
                match popped {
                    Some(item) => break item,
                    None => {
                        if inner.closed.load(Ordering::SeqCst) {
                            return;
                        }
                        // Notify stores a permit when nobody is waiting, so
                        // an enqueue racing this await cannot be missed.
                        inner.notify.notified().await;
                    }
                }
            }
        };

        // Staleness check immediately before dispatch, on arrival age
        let age = item.received_at.elapsed();
        if age > inner.staleness {
            inner.dropped_stale.fetch_add(1, Ordering::Relaxed);
            warn!(
                "IngestQueue: event seq={} stale ({}ms > {}ms), discarded",
                item.seq,
                age.as_millis(),
                inner.staleness.as_millis()
            );
            if let Some(observer) = &inner.observer {
                observer.on_drop(&IngestError::StaleEvent {
                    age_ms: age.as_millis() as u64,
                    threshold_ms: inner.staleness.as_millis() as u64,
                });
            }
            continue;
        }

        let started = Instant::now();
        match inner.sink.on_candle(item.candle).await {
            Ok(()) => {
                inner.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                // One malformed event must never wedge the pipeline
                error!("IngestQueue: consumer failed on seq={}: {:#}", item.seq, err);
                if let Some(observer) = &inner.observer {
                    observer.on_dispatch_error(&err);
                }
            }
        }

        // Pacing: enforce a minimum inter-dispatch gap
        let elapsed = started.elapsed();
        if elapsed < inner.pacing {
            tokio::time::sleep(inner.pacing - elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Mutex as AsyncMutex;

    struct RecordingSink {
        closes: AsyncMutex<Vec<f64>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                closes: AsyncMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl CandleSink for RecordingSink {
        async fn on_candle(&self, candle: Candle) -> anyhow::Result<()> {
            self.closes.lock().await.push(candle.close);
            Ok(())
        }
    }

    struct CountingObserver {
        drops: AtomicUsize,
        dispatch_errors: AtomicUsize,
    }

    impl CountingObserver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                drops: AtomicUsize::new(0),
                dispatch_errors: AtomicUsize::new(0),
            })
        }
    }

    impl IngestObserver for CountingObserver {
        fn on_drop(&self, _reason: &IngestError) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }

        fn on_dispatch_error(&self, _error: &anyhow::Error) {
            self.dispatch_errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event(index: i64) -> CandleEvent {
        CandleEvent {
            t: 1_704_067_200_000 + index * 60_000,
            o: 100.0,
            h: 101.0,
            l: 99.0,
            c: 100.0 + index as f64,
            v: 1000.0,
        }
    }

    fn quick_config() -> QueueConfig {
        QueueConfig {
            capacity: 64,
            staleness_ms: 10_000,
            pacing_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_events_dispatched_in_sequence_order() {
        let sink = RecordingSink::new();
        let queue = IngestQueue::spawn(&quick_config(), sink.clone(), None).unwrap();

        for i in 0..50 {
            let seq = queue.enqueue(event(i)).unwrap();
            assert_eq!(seq, (i + 1) as u64);
        }

        queue.shutdown().await;

        let closes = sink.closes.lock().await;
        let expected: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        assert_eq!(*closes, expected);
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        // Pacing throttles the drain so the buffer actually fills
        let config = QueueConfig {
            capacity: 4,
            staleness_ms: 10_000,
            pacing_ms: 200,
        };
        let sink = RecordingSink::new();
        let observer = CountingObserver::new();
        let queue = IngestQueue::spawn(&config, sink.clone(), Some(observer.clone())).unwrap();

        for i in 0..10 {
            queue.enqueue(event(i)).unwrap();
        }

        let stats = queue.stats();
        assert_eq!(stats.received, 10);
        assert!(stats.dropped_overflow >= 5);
        assert!(observer.drops.load(Ordering::SeqCst) >= 5);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_event_rejected_and_counted() {
        let sink = RecordingSink::new();
        let observer = CountingObserver::new();
        let queue =
            IngestQueue::spawn(&quick_config(), sink.clone(), Some(observer.clone())).unwrap();

        let mut bad = event(0);
        bad.h = 90.0; // below low
        assert!(queue.enqueue(bad).is_err());

        queue.enqueue(event(1)).unwrap();
        queue.shutdown().await;

        assert_eq!(observer.drops.load(Ordering::SeqCst), 1);
        assert_eq!(sink.closes.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_consumer_error_does_not_stop_drain() {
        struct FailingSink {
            calls: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl CandleSink for FailingSink {
            async fn on_candle(&self, _candle: Candle) -> anyhow::Result<()> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    anyhow::bail!("boom");
                }
                Ok(())
            }
        }

        let sink = Arc::new(FailingSink {
            calls: AtomicUsize::new(0),
        });
        let observer = CountingObserver::new();
        let queue =
            IngestQueue::spawn(&quick_config(), sink.clone(), Some(observer.clone())).unwrap();

        queue.enqueue(event(0)).unwrap();
        queue.enqueue(event(1)).unwrap();
        queue.shutdown().await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(observer.dispatch_errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_event_dropped_before_dispatch() {
        // Long pacing after the first dispatch lets the paused clock jump
        // past the staleness threshold while the second event waits.
        let config = QueueConfig {
            capacity: 16,
            staleness_ms: 30_000,
            pacing_ms: 60_000,
        };
        let sink = RecordingSink::new();
        let observer = CountingObserver::new();
        let queue = IngestQueue::spawn(&config, sink.clone(), Some(observer.clone())).unwrap();

        queue.enqueue(event(0)).unwrap();
        queue.enqueue(event(1)).unwrap();
        queue.shutdown().await;

        let closes = sink.closes.lock().await;
        assert_eq!(*closes, vec![100.0]);

        // Exactly one drop, attributed to staleness
        assert_eq!(observer.drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_fails_fast() {
        let config = QueueConfig {
            capacity: 0,
            ..quick_config()
        };
        assert!(IngestQueue::spawn(&config, RecordingSink::new(), None).is_err());
    }
}
