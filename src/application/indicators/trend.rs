use crate::application::indicators::moving_averages::Ema;
use crate::application::indicators::volatility::Atr;
use crate::domain::market::candle::Candle;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxOutput {
    /// Trend strength, available one full period after the DI lines
    pub adx: Option<f64>,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Average Directional Index with Wilder smoothing throughout.
///
/// The DI lines need `period` directional movements (period + 1 candles);
/// the ADX line needs a further `period` DX samples on top of that, so it
/// first appears around candle `2 * period`.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    prev: Option<Candle>,
    sm_tr: f64,
    sm_plus_dm: f64,
    sm_minus_dm: f64,
    moves_seen: usize,
    dx_seed_sum: f64,
    dx_seen: usize,
    adx: Option<f64>,
    value: Option<AdxOutput>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            sm_tr: 0.0,
            sm_plus_dm: 0.0,
            sm_minus_dm: 0.0,
            moves_seen: 0,
            dx_seed_sum: 0.0,
            dx_seen: 0,
            adx: None,
            value: None,
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<AdxOutput> {
        let prev = match self.prev.replace(*candle) {
            Some(prev) => prev,
            None => return None,
        };

        let up_move = candle.high - prev.high;
        let down_move = prev.low - candle.low;
        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
        let tr = (candle.high - candle.low)
            .max((candle.high - prev.close).abs())
            .max((candle.low - prev.close).abs());

        self.moves_seen += 1;
        if self.moves_seen <= self.period {
            // Seed phase: running sums of TR and directional movement
            self.sm_tr += tr;
            self.sm_plus_dm += plus_dm;
            self.sm_minus_dm += minus_dm;
            if self.moves_seen < self.period {
                return None;
            }
        } else {
            let p = self.period as f64;
            self.sm_tr = self.sm_tr - self.sm_tr / p + tr;
            self.sm_plus_dm = self.sm_plus_dm - self.sm_plus_dm / p + plus_dm;
            self.sm_minus_dm = self.sm_minus_dm - self.sm_minus_dm / p + minus_dm;
        }

        let (plus_di, minus_di) = if self.sm_tr > 0.0 {
            (
                100.0 * self.sm_plus_dm / self.sm_tr,
                100.0 * self.sm_minus_dm / self.sm_tr,
            )
        } else {
            (0.0, 0.0)
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        match self.adx {
            Some(adx) => {
                let p = self.period as f64;
                self.adx = Some((adx * (p - 1.0) + dx) / p);
            }
            None => {
                self.dx_seed_sum += dx;
                self.dx_seen += 1;
                if self.dx_seen == self.period {
                    self.adx = Some(self.dx_seed_sum / self.period as f64);
                }
            }
        }

        let out = AdxOutput {
            adx: self.adx,
            plus_di,
            minus_di,
        };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<AdxOutput> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IchimokuOutput {
    pub tenkan: f64,
    pub kijun: f64,
    /// Leading span A in effect now (computed `displacement` candles ago)
    pub senkou_a: Option<f64>,
    /// Leading span B in effect now
    pub senkou_b: Option<f64>,
    /// Close from `displacement` candles ago
    pub chikou: Option<f64>,
}

/// Ichimoku cloud built from rolling high/low midpoints.
///
/// Span A/B are projected forward by the displacement, so the spans
/// reported for the current candle were computed `displacement` candles
/// ago; until that much history exists they stay `None`.
#[derive(Debug, Clone)]
pub struct Ichimoku {
    tenkan_period: usize,
    kijun_period: usize,
    senkou_b_period: usize,
    displacement: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
    // (span_a, span_b) pairs waiting out the displacement
    cloud: VecDeque<(f64, f64)>,
    closes: VecDeque<f64>,
    value: Option<IchimokuOutput>,
}

impl Ichimoku {
    pub fn new(
        tenkan_period: usize,
        kijun_period: usize,
        senkou_b_period: usize,
        displacement: usize,
    ) -> Self {
        Self {
            tenkan_period,
            kijun_period,
            senkou_b_period,
            displacement,
            highs: VecDeque::with_capacity(senkou_b_period),
            lows: VecDeque::with_capacity(senkou_b_period),
            cloud: VecDeque::with_capacity(displacement + 1),
            closes: VecDeque::with_capacity(displacement + 1),
            value: None,
        }
    }

    fn midpoint(&self, period: usize) -> Option<f64> {
        if self.highs.len() < period {
            return None;
        }
        let skip = self.highs.len() - period;
        let high = self
            .highs
            .iter()
            .skip(skip)
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let low = self
            .lows
            .iter()
            .skip(skip)
            .copied()
            .fold(f64::INFINITY, f64::min);
        Some((high + low) / 2.0)
    }

    pub fn update(&mut self, candle: &Candle) -> Option<IchimokuOutput> {
        self.highs.push_back(candle.high);
        self.lows.push_back(candle.low);
        if self.highs.len() > self.senkou_b_period {
            self.highs.pop_front();
            self.lows.pop_front();
        }

        self.closes.push_back(candle.close);
        if self.closes.len() > self.displacement + 1 {
            self.closes.pop_front();
        }
        let chikou = (self.closes.len() == self.displacement + 1)
            .then(|| self.closes[0]);

        let tenkan = self.midpoint(self.tenkan_period)?;
        let kijun = match self.midpoint(self.kijun_period) {
            Some(kijun) => kijun,
            None => return None,
        };

        if let Some(span_b) = self.midpoint(self.senkou_b_period) {
            self.cloud.push_back(((tenkan + kijun) / 2.0, span_b));
            if self.cloud.len() > self.displacement + 1 {
                self.cloud.pop_front();
            }
        }

        let (senkou_a, senkou_b) = if self.cloud.len() == self.displacement + 1 {
            let (a, b) = self.cloud[0];
            (Some(a), Some(b))
        } else {
            (None, None)
        };

        let out = IchimokuOutput {
            tenkan,
            kijun,
            senkou_a,
            senkou_b,
            chikou,
        };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<IchimokuOutput> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscZone {
    Neutral,
    Elevated,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwoPoleSignal {
    None,
    BullishCross,
    BearishCross,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPoleOutput {
    /// Normalized oscillator value (z-score of the smoothed detrend)
    pub value: f64,
    /// The oscillator `lag` candles ago, used as the crossover reference
    pub lagged: f64,
    pub zone: OscZone,
    pub signal: TwoPoleSignal,
}

/// Two-pole smoothed momentum oscillator.
///
/// The close is detrended against a double EMA (EMA of an EMA), scaled by
/// ATR so the oscillator is comparable across instruments, smoothed, and
/// z-scored over a trailing window. Crossing the own lagged copy emits a
/// directional signal; the z-score magnitude classifies the zone.
#[derive(Debug, Clone)]
pub struct TwoPoleOscillator {
    ema1: Ema,
    ema2: Ema,
    smooth: Ema,
    atr: Atr,
    z_window: VecDeque<f64>,
    z_period: usize,
    lag: usize,
    lag_buffer: VecDeque<f64>,
    zone_threshold: f64,
    extreme_threshold: f64,
    value: Option<TwoPoleOutput>,
}

impl TwoPoleOscillator {
    pub fn new(
        period: usize,
        smooth_period: usize,
        z_period: usize,
        lag: usize,
        zone_threshold: f64,
        extreme_threshold: f64,
    ) -> Self {
        Self {
            ema1: Ema::new(period),
            ema2: Ema::new(period),
            smooth: Ema::new(smooth_period),
            atr: Atr::new(period),
            z_window: VecDeque::with_capacity(z_period),
            z_period,
            lag,
            lag_buffer: VecDeque::with_capacity(lag + 1),
            zone_threshold,
            extreme_threshold,
            value: None,
        }
    }

    pub fn update(&mut self, candle: &Candle) -> Option<TwoPoleOutput> {
        let ema1 = self.ema1.update(candle.close);
        let ema2 = self.ema2.update(ema1);
        let atr = self.atr.update(candle)?;
        if !self.ema2.is_warm() || atr <= 0.0 {
            return None;
        }

        let detrended = (candle.close - ema2) / atr;
        let smoothed = self.smooth.update(detrended);
        if !self.smooth.is_warm() {
            return None;
        }

        self.z_window.push_back(smoothed);
        if self.z_window.len() > self.z_period {
            self.z_window.pop_front();
        }
        if self.z_window.len() < self.z_period {
            return None;
        }

        let n = self.z_period as f64;
        let mean = self.z_window.iter().sum::<f64>() / n;
        let variance = self.z_window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let sigma = variance.sqrt();
        let z = if sigma > 0.0 { (smoothed - mean) / sigma } else { 0.0 };

        self.lag_buffer.push_back(z);
        if self.lag_buffer.len() > self.lag + 1 {
            self.lag_buffer.pop_front();
        }
        if self.lag_buffer.len() < self.lag + 1 {
            return None;
        }
        let lagged = self.lag_buffer[0];

        let signal = match self.value {
            Some(prev) if prev.value <= prev.lagged && z > lagged => TwoPoleSignal::BullishCross,
            Some(prev) if prev.value >= prev.lagged && z < lagged => TwoPoleSignal::BearishCross,
            _ => TwoPoleSignal::None,
        };

        let magnitude = z.abs();
        let zone = if magnitude >= self.extreme_threshold {
            OscZone::Extreme
        } else if magnitude >= self.zone_threshold {
            OscZone::Elevated
        } else {
            OscZone::Neutral
        };

        let out = TwoPoleOutput {
            value: z,
            lagged,
            zone,
            signal,
        };
        self.value = Some(out);
        Some(out)
    }

    pub fn value(&self) -> Option<TwoPoleOutput> {
        self.value
    }
}
