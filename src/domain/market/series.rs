use crate::domain::market::candle::Candle;
use std::collections::VecDeque;

/// Bounded ring buffer of finalized candles for one timeframe.
///
/// Oldest entries are evicted on overflow, so memory stays bounded no matter
/// how long the feed runs. Candles carry a monotonically increasing global
/// index (`next_index`) that survives eviction, which the structural module
/// uses for pivot bookkeeping and trendline regression.
#[derive(Debug, Clone)]
pub struct TimeframeSeries {
    candles: VecDeque<Candle>,
    capacity: usize,
    min_ready: usize,
    ready: bool,
    appended: u64,
}

impl TimeframeSeries {
    /// Create a series with the given ring capacity and warm-up minimum.
    ///
    /// Capacity and minimum are validated by `PipelineConfig::validate`
    /// before any series is constructed.
    pub fn new(capacity: usize, min_ready: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            min_ready,
            ready: false,
            appended: 0,
        }
    }

    /// Append a finalized candle, evicting the oldest if at capacity.
    pub fn push(&mut self, candle: Candle) {
        if self.candles.len() == self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
        self.appended += 1;
        // Readiness is sticky: once warm, eviction never reverts it
        if !self.ready && self.appended >= self.min_ready as u64 {
            self.ready = true;
        }
    }

    /// True once the series has seen at least its warm-up minimum of candles
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Global index the next appended candle will receive
    pub fn next_index(&self) -> u64 {
        self.appended
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// The most recent `max_points` candles, oldest first
    pub fn latest(&self, max_points: usize) -> Vec<Candle> {
        let skip = self.candles.len().saturating_sub(max_points);
        self.candles.iter().skip(skip).copied().collect()
    }
}
