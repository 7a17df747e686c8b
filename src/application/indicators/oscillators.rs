use crate::application::indicators::moving_averages::{Ema, Sma};
use std::collections::VecDeque;

/// Relative Strength Index with Wilder smoothing.
///
/// Average gain/loss is seeded from a simple average over the first
/// `period` close-to-close changes, then Wilder-smoothed. Zero average
/// loss maps to RSI 100.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    changes_seen: usize,
    value: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            changes_seen: 0,
            value: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        if let Some(prev) = self.prev_close {
            let change = close - prev;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            if self.changes_seen < self.period {
                // Seed phase: accumulate a simple average
                self.avg_gain += gain;
                self.avg_loss += loss;
                self.changes_seen += 1;
                if self.changes_seen == self.period {
                    self.avg_gain /= self.period as f64;
                    self.avg_loss /= self.period as f64;
                }
            } else {
                let p = self.period as f64;
                self.avg_gain = (self.avg_gain * (p - 1.0) + gain) / p;
                self.avg_loss = (self.avg_loss * (p - 1.0) + loss) / p;
            }

            if self.changes_seen >= self.period {
                self.value = Some(if self.avg_loss == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
                });
            }
        }
        self.prev_close = Some(close);
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochRsiOutput {
    pub k: f64,
    pub d: f64,
}

/// Stochastic RSI: the RSI's position inside its own rolling min/max
/// range, smoothed into the K and D lines with short SMAs.
///
/// Fed with already-computed RSI values by the engine. A flat RSI range
/// retains the previous stochastic value instead of dividing by zero.
#[derive(Debug, Clone)]
pub struct StochRsi {
    period: usize,
    window: VecDeque<f64>,
    k_sma: Sma,
    d_sma: Sma,
    last_stoch: Option<f64>,
    value: Option<StochRsiOutput>,
}

impl StochRsi {
    pub fn new(period: usize, k: usize, d: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            k_sma: Sma::new(k),
            d_sma: Sma::new(d),
            last_stoch: None,
            value: None,
        }
    }

    pub fn update(&mut self, rsi: f64) -> Option<StochRsiOutput> {
        self.window.push_back(rsi);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        if self.window.len() < self.period {
            return None;
        }

        let min = self.window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        let stoch = if range > 0.0 {
            Some((rsi - min) / range * 100.0)
        } else {
            self.last_stoch
        };

        let stoch = stoch?;
        self.last_stoch = Some(stoch);

        let k = self.k_sma.update(stoch)?;
        let d = self.d_sma.update(k)?;
        let out = StochRsiOutput { k, d };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<StochRsiOutput> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// MACD: fast EMA minus slow EMA, with an EMA signal line and histogram.
///
/// The MACD line is withheld until the slow EMA has a full period behind
/// it; the signal line additionally waits for its own period of MACD
/// samples.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    value: Option<MacdOutput>,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
            value: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<MacdOutput> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        if !self.slow.is_warm() {
            return None;
        }

        let macd = fast - slow;
        let signal_raw = self.signal.update(macd);
        let signal = self.signal.is_warm().then_some(signal_raw);

        let out = MacdOutput {
            macd,
            signal,
            histogram: signal.map(|s| macd - s),
        };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<MacdOutput> {
        self.value
    }
}
