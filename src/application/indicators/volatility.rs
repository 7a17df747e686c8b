use crate::application::indicators::moving_averages::Ema;
use crate::domain::market::candle::Candle;
use std::collections::VecDeque;

/// Average True Range, Wilder-smoothed.
///
/// Seeded as the simple average of the first `period` true ranges, then
/// `atr = (atr * (p - 1) + tr) / p`.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    fn true_range(&self, candle: &Candle) -> f64 {
        match self.prev_close {
            Some(prev) => (candle.high - candle.low)
                .max((candle.high - prev).abs())
                .max((candle.low - prev).abs()),
            None => candle.high - candle.low,
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<f64> {
        let tr = self.true_range(candle);
        self.prev_close = Some(candle.close);

        match self.value {
            Some(prev) => {
                self.value = Some((prev * (self.period as f64 - 1.0) + tr) / self.period as f64);
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Position of the close within the bands, 0..100 when inside
    pub percent_b: Option<f64>,
    /// (upper - lower) / middle
    pub bandwidth: Option<f64>,
}

/// Bollinger Bands over a trailing window using population standard
/// deviation. `%B` and bandwidth retain their previous value on a
/// degenerate (zero-width or zero-mid) band instead of emitting NaN.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    multiplier: f64,
    window: VecDeque<f64>,
    last_percent_b: Option<f64>,
    last_bandwidth: Option<f64>,
    value: Option<BollingerOutput>,
}

impl BollingerBands {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            period,
            multiplier,
            window: VecDeque::with_capacity(period),
            last_percent_b: None,
            last_bandwidth: None,
            value: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<BollingerOutput> {
        self.window.push_back(close);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        if self.window.len() < self.period {
            return None;
        }

        let n = self.period as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let sigma = variance.sqrt();

        let upper = mean + self.multiplier * sigma;
        let lower = mean - self.multiplier * sigma;

        let width = upper - lower;
        if width > 0.0 {
            self.last_percent_b = Some((close - lower) / width * 100.0);
        }
        if mean.abs() > f64::EPSILON {
            self.last_bandwidth = Some(width / mean);
        }

        let out = BollingerOutput {
            upper,
            middle: mean,
            lower,
            percent_b: self.last_percent_b,
            bandwidth: self.last_bandwidth,
        };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<BollingerOutput> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Keltner channel: EMA(close) ± multiplier × ATR
#[derive(Debug, Clone)]
pub struct KeltnerChannel {
    ema: Ema,
    atr: Atr,
    multiplier: f64,
}

impl KeltnerChannel {
    pub fn new(period: usize, atr_period: usize, multiplier: f64) -> Self {
        Self {
            ema: Ema::new(period),
            atr: Atr::new(atr_period),
            multiplier,
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<ChannelOutput> {
        let middle = self.ema.update(candle.close);
        let atr = self.atr.update(candle)?;
        if !self.ema.is_warm() {
            return None;
        }
        Some(ChannelOutput {
            upper: middle + self.multiplier * atr,
            middle,
            lower: middle - self.multiplier * atr,
        })
    }

    pub fn value(&self) -> Option<ChannelOutput> {
        let atr = self.atr.value()?;
        if !self.ema.is_warm() {
            return None;
        }
        let middle = self.ema.value()?;
        Some(ChannelOutput {
            upper: middle + self.multiplier * atr,
            middle,
            lower: middle - self.multiplier * atr,
        })
    }
}

/// Donchian channel: rolling high/low over a window, midline in between
#[derive(Debug, Clone)]
pub struct DonchianChannel {
    period: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
}

impl DonchianChannel {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            highs: VecDeque::with_capacity(period),
            lows: VecDeque::with_capacity(period),
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<ChannelOutput> {
        self.highs.push_back(candle.high);
        self.lows.push_back(candle.low);
        if self.highs.len() > self.period {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        self.value()
    }

    pub fn value(&self) -> Option<ChannelOutput> {
        if self.highs.len() < self.period {
            return None;
        }
        let upper = self.highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lower = self.lows.iter().copied().fold(f64::INFINITY, f64::min);
        Some(ChannelOutput {
            upper,
            middle: (upper + lower) / 2.0,
            lower,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperTrendOutput {
    /// The active final band: lower band in an uptrend, upper in a downtrend
    pub value: f64,
    /// +1 uptrend, -1 downtrend
    pub direction: i8,
}

/// SuperTrend on `hl2 ± multiplier × ATR` basic bands.
///
/// Final bands only tighten toward price relative to the previous final
/// bands; the trend flips when the close crosses the opposite final band.
#[derive(Debug, Clone)]
pub struct SuperTrend {
    multiplier: f64,
    atr: Atr,
    prev_close: Option<f64>,
    final_upper: Option<f64>,
    final_lower: Option<f64>,
    direction: i8,
    value: Option<SuperTrendOutput>,
}

impl SuperTrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            multiplier,
            atr: Atr::new(period),
            prev_close: None,
            final_upper: None,
            final_lower: None,
            direction: 1,
            value: None,
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<SuperTrendOutput> {
        let atr = match self.atr.update(candle) {
            Some(atr) => atr,
            None => {
                self.prev_close = Some(candle.close);
                return None;
            }
        };

        let mid = candle.hl2();
        let basic_upper = mid + self.multiplier * atr;
        let basic_lower = mid - self.multiplier * atr;

        let final_upper = match (self.final_upper, self.prev_close) {
            (Some(prev_upper), Some(prev_close))
                if basic_upper >= prev_upper && prev_close <= prev_upper =>
            {
                prev_upper
            }
            _ => basic_upper,
        };
        let final_lower = match (self.final_lower, self.prev_close) {
            (Some(prev_lower), Some(prev_close))
                if basic_lower <= prev_lower && prev_close >= prev_lower =>
            {
                prev_lower
            }
            _ => basic_lower,
        };

        self.direction = if candle.close > final_upper {
            1
        } else if candle.close < final_lower {
            -1
        } else {
            self.direction
        };

        self.final_upper = Some(final_upper);
        self.final_lower = Some(final_lower);
        self.prev_close = Some(candle.close);

        let out = SuperTrendOutput {
            value: if self.direction == 1 {
                final_lower
            } else {
                final_upper
            },
            direction: self.direction,
        };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<SuperTrendOutput> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: 0,
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_atr_seed_then_wilder() {
        let mut atr = Atr::new(3);
        // First candle: TR = h - l
        assert!(atr.update(&candle(102.0, 100.0, 101.0)).is_none());
        // TR = max(2, |103-101|, |101-101|) = 2
        assert!(atr.update(&candle(103.0, 101.0, 102.0)).is_none());
        // TR = max(2, |104-102|, |102-102|) = 2 → seed = (2+2+2)/3 = 2
        let seeded = atr.update(&candle(104.0, 102.0, 103.0)).unwrap();
        assert!((seeded - 2.0).abs() < 1e-12);

        // Wilder: (2*2 + 5) / 3 = 3
        let next = atr.update(&candle(108.0, 103.0, 107.0)).unwrap();
        assert!((next - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_band_ordering() {
        let mut bb = BollingerBands::new(5, 2.0);
        let closes = [100.0, 101.0, 99.5, 102.0, 100.5, 101.5, 98.0];
        let mut produced = 0;
        for close in closes {
            if let Some(out) = bb.update(close) {
                produced += 1;
                assert!(out.lower <= out.middle);
                assert!(out.middle <= out.upper);
            }
        }
        assert_eq!(produced, 3);
    }

    #[test]
    fn test_bollinger_percent_b_in_range_when_inside() {
        let mut bb = BollingerBands::new(5, 2.0);
        for close in [100.0, 101.0, 99.0, 102.0, 100.0, 101.0] {
            if let Some(out) = bb.update(close) {
                let pb = out.percent_b.unwrap();
                assert!((0.0..=100.0).contains(&pb), "percent_b {} out of range", pb);
            }
        }
    }

    #[test]
    fn test_bollinger_degenerate_retains_previous() {
        let mut bb = BollingerBands::new(3, 2.0);
        bb.update(100.0);
        bb.update(101.0);
        bb.update(102.0);
        let prev_pb = bb.update(102.0).unwrap().percent_b.unwrap();

        // Window is now all 102s: sigma = 0, width = 0, %B retained
        let flat = bb.update(102.0).unwrap();
        assert_eq!(flat.percent_b, Some(prev_pb));
        assert_eq!(flat.upper, flat.lower);
    }

    #[test]
    fn test_donchian_midline() {
        let mut dc = DonchianChannel::new(3);
        dc.update(&candle(102.0, 98.0, 100.0));
        dc.update(&candle(104.0, 99.0, 103.0));
        let out = dc.update(&candle(103.0, 100.0, 101.0)).unwrap();
        assert_eq!(out.upper, 104.0);
        assert_eq!(out.lower, 98.0);
        assert_eq!(out.middle, 101.0);
    }

    #[test]
    fn test_supertrend_flips_on_cross() {
        let mut st = SuperTrend::new(3, 1.0);
        // Warm up the internal ATR with a gentle uptrend
        st.update(&candle(101.0, 99.0, 100.0));
        st.update(&candle(102.0, 100.0, 101.0));
        let first = st.update(&candle(103.0, 101.0, 102.5)).unwrap();
        assert_eq!(first.direction, 1);

        // Crash far below the lower band forces a downtrend
        let crashed = st.update(&candle(95.0, 85.0, 86.0)).unwrap();
        assert_eq!(crashed.direction, -1);
        // Active band in a downtrend is the upper band, above price
        assert!(crashed.value > 86.0);
    }
}
