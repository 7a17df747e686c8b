use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use std::collections::HashMap;
use tracing::debug;

/// Mutable in-progress candle for one timeframe, keyed by bucket start.
///
/// Seeded from the first tick inside a new bucket, widened on each
/// subsequent tick, and finalized into an immutable [`Candle`] the instant
/// a tick maps to a different bucket.
#[derive(Debug, Clone)]
struct PendingBucket {
    bucket_start: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    tick_count: u32,
}

impl PendingBucket {
    fn seed(bucket_start: i64, tick: &Candle) -> Self {
        Self {
            bucket_start,
            open: tick.close,
            high: tick.high,
            low: tick.low,
            close: tick.close,
            volume: tick.volume,
            tick_count: 1,
        }
    }

    fn update(&mut self, tick: &Candle) {
        if tick.high > self.high {
            self.high = tick.high;
        }
        if tick.low < self.low {
            self.low = tick.low;
        }
        self.close = tick.close;
        self.volume += tick.volume;
        self.tick_count += 1;
    }

    fn finalize(&self) -> Candle {
        Candle {
            timestamp: self.bucket_start,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Buckets the ordered base-resolution stream into higher-resolution series.
///
/// The aggregator only reacts to observed ticks: a silent gap in the feed
/// never fabricates missing buckets, it simply delays finalization of the
/// in-progress bucket until the next tick arrives — even if that tick
/// belongs to a much later bucket.
pub struct TimeframeAggregator {
    timeframes: Vec<Timeframe>,
    pending: HashMap<Timeframe, PendingBucket>,
}

impl TimeframeAggregator {
    pub fn new(timeframes: Vec<Timeframe>) -> Self {
        Self {
            timeframes,
            pending: HashMap::new(),
        }
    }

    /// Process one base-resolution candle.
    ///
    /// Returns every candle finalized by this tick, in ascending timeframe
    /// order. The base candle itself is always first: base-resolution bars
    /// arrive already finalized and flow straight through.
    pub fn ingest(&mut self, tick: &Candle) -> Vec<(Timeframe, Candle)> {
        let mut finalized = Vec::new();

        for &timeframe in &self.timeframes {
            if timeframe == Timeframe::OneMin {
                finalized.push((timeframe, *tick));
                continue;
            }

            let bucket_start = timeframe.bucket_start(tick.timestamp);

            match self.pending.get_mut(&timeframe) {
                Some(bucket) if bucket.bucket_start == bucket_start => {
                    bucket.update(tick);
                }
                Some(bucket) => {
                    // Tick maps to a different bucket: finalize the old one
                    let candle = bucket.finalize();
                    debug!(
                        "TimeframeAggregator: {} bucket finalized ({} ticks) O:{} H:{} L:{} C:{}",
                        timeframe, bucket.tick_count, candle.open, candle.high, candle.low,
                        candle.close
                    );
                    finalized.push((timeframe, candle));
                    *bucket = PendingBucket::seed(bucket_start, tick);
                }
                None => {
                    self.pending
                        .insert(timeframe, PendingBucket::seed(bucket_start, tick));
                }
            }
        }

        finalized
    }

    /// Finalize every in-progress bucket (end-of-session or testing).
    pub fn flush(&mut self) -> Vec<(Timeframe, Candle)> {
        let mut flushed: Vec<(Timeframe, Candle)> = self
            .pending
            .drain()
            .map(|(timeframe, bucket)| (timeframe, bucket.finalize()))
            .collect();
        flushed.sort_by_key(|(timeframe, _)| timeframe.interval_ms());
        flushed
    }

    /// Current tick count of a timeframe's in-progress bucket, if any
    pub fn pending_ticks(&self, timeframe: Timeframe) -> Option<u32> {
        self.pending.get(&timeframe).map(|b| b.tick_count)
    }
}
