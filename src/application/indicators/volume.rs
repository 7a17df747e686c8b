use crate::domain::market::candle::Candle;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::VecDeque;

/// On-Balance Volume: cumulative volume signed by close direction.
#[derive(Debug, Clone, Default)]
pub struct Obv {
    prev_close: Option<f64>,
    value: f64,
}

impl Obv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, candle: &Candle) -> f64 {
        if let Some(prev) = self.prev_close {
            if candle.close > prev {
                self.value += candle.volume;
            } else if candle.close < prev {
                self.value -= candle.volume;
            }
        }
        self.prev_close = Some(candle.close);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Money Flow Index over a trailing window of typical-price flows.
///
/// Raw money flow is `typical_price * volume`, classified as positive or
/// negative by the typical price's direction. Zero negative flow maps to
/// MFI 100.
#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
    prev_typical: Option<f64>,
    // (positive_flow, negative_flow) per candle
    flows: VecDeque<(f64, f64)>,
    value: Option<f64>,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_typical: None,
            flows: VecDeque::with_capacity(period),
            value: None,
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<f64> {
        let typical = candle.typical_price();
        if let Some(prev) = self.prev_typical {
            let raw = typical * candle.volume;
            let flow = if typical > prev {
                (raw, 0.0)
            } else if typical < prev {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            };
            self.flows.push_back(flow);
            if self.flows.len() > self.period {
                self.flows.pop_front();
            }

            if self.flows.len() == self.period {
                let positive: f64 = self.flows.iter().map(|(p, _)| p).sum();
                let negative: f64 = self.flows.iter().map(|(_, n)| n).sum();
                self.value = Some(if negative == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + positive / negative)
                });
            }
        }
        self.prev_typical = Some(typical);
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Volume-weighted average price, reset at the UTC day boundary.
#[derive(Debug, Clone, Default)]
pub struct Vwap {
    session: Option<NaiveDate>,
    pv_sum: f64,
    volume_sum: f64,
    value: Option<f64>,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, candle: &Candle) -> Option<f64> {
        let day = DateTime::<Utc>::from_timestamp_millis(candle.timestamp).map(|dt| dt.date_naive());

        if day != self.session {
            self.session = day;
            self.pv_sum = 0.0;
            self.volume_sum = 0.0;
            self.value = None;
        }

        self.pv_sum += candle.typical_price() * candle.volume;
        self.volume_sum += candle.volume;
        if self.volume_sum > 0.0 {
            self.value = Some(self.pv_sum / self.volume_sum);
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
