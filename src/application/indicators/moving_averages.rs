use std::collections::VecDeque;

/// Simple moving average over a fixed window.
///
/// Produces no value until the window is full.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    value: Option<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        self.window.push_back(price);
        self.sum += price;
        if self.window.len() > self.period {
            if let Some(evicted) = self.window.pop_front() {
                self.sum -= evicted;
            }
        }
        if self.window.len() == self.period {
            self.value = Some(self.sum / self.period as f64);
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Exponential moving average with SMA seeding.
///
/// Until a full period of samples exists the EMA runs seeded from the first
/// sample; at exactly `period` samples it re-seeds from the SMA of those
/// samples, then continues incrementally with `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    count: usize,
    seed: Vec<f64>,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            count: 0,
            seed: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn update(&mut self, price: f64) -> f64 {
        self.count += 1;

        if self.count <= self.period {
            self.seed.push(price);
        }

        let next = match self.value {
            None => price,
            Some(prev) => (price - prev) * self.k + prev,
        };

        let next = if self.count == self.period {
            // Re-seed from the SMA of the first full period
            let sma = self.seed.iter().sum::<f64>() / self.period as f64;
            self.seed.clear();
            self.seed.shrink_to_fit();
            sma
        } else {
            next
        };

        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// True once a full period has been folded in
    pub fn is_warm(&self) -> bool {
        self.count >= self.period
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
