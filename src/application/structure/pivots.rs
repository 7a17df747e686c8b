use crate::domain::market::candle::Candle;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

/// A confirmed local extreme.
///
/// `index` is the global candle index within the series the pivot was
/// detected on, so two pivots can be compared across time even after the
/// underlying ring buffer has evicted the candles between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: u64,
    pub timestamp: i64,
    pub price: f64,
    pub kind: PivotKind,
}

/// Symmetric-window pivot detector.
///
/// A candle is a high pivot iff its high strictly exceeds every other high
/// in a window of `left` candles before and `right` candles after it, and
/// likewise for lows. Confirmation therefore lags the pivot candle by
/// exactly `right` candles. Confirmed pivots older than `horizon` candles
/// are pruned.
#[derive(Debug, Clone)]
pub struct PivotDetector {
    left: usize,
    right: usize,
    horizon: u64,
    window: VecDeque<(u64, Candle)>,
    next_index: u64,
    pivots: Vec<Pivot>,
}

impl PivotDetector {
    pub fn new(left: usize, right: usize, horizon: u64) -> Self {
        Self {
            left,
            right,
            horizon,
            window: VecDeque::with_capacity(left + right + 2),
            next_index: 0,
            pivots: Vec::new(),
        }
    }

    /// Feed one closed candle; returns any pivots confirmed by it.
    pub fn on_candle(&mut self, candle: &Candle) -> Vec<Pivot> {
        let index = self.next_index;
        self.next_index += 1;

        self.window.push_back((index, *candle));
        let span = self.left + self.right + 1;
        if self.window.len() > span {
            self.window.pop_front();
        }

        let mut confirmed = Vec::new();
        if self.window.len() == span {
            let (candidate_index, candidate) = self.window[self.left];

            let is_high = self
                .window
                .iter()
                .all(|&(i, ref c)| i == candidate_index || c.high < candidate.high);
            if is_high {
                confirmed.push(Pivot {
                    index: candidate_index,
                    timestamp: candidate.timestamp,
                    price: candidate.high,
                    kind: PivotKind::High,
                });
            }

            let is_low = self
                .window
                .iter()
                .all(|&(i, ref c)| i == candidate_index || c.low > candidate.low);
            if is_low {
                confirmed.push(Pivot {
                    index: candidate_index,
                    timestamp: candidate.timestamp,
                    price: candidate.low,
                    kind: PivotKind::Low,
                });
            }
        }

        self.pivots.extend(confirmed.iter().copied());

        let cutoff = self.next_index.saturating_sub(self.horizon);
        self.pivots.retain(|pivot| pivot.index >= cutoff);

        confirmed
    }

    /// All retained pivots, oldest first
    pub fn pivots(&self) -> &[Pivot] {
        &self.pivots
    }

    /// Global index of the most recently ingested candle
    pub fn latest_index(&self) -> Option<u64> {
        self.next_index.checked_sub(1)
    }
}
