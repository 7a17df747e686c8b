use crate::application::indicators::moving_averages::{Ema, Sma};
use crate::application::indicators::oscillators::{Macd, Rsi, StochRsi};
use crate::application::indicators::snapshot::IndicatorSnapshot;
use crate::application::indicators::trend::{Adx, Ichimoku, TwoPoleOscillator};
use crate::application::indicators::volatility::{
    Atr, BollingerBands, DonchianChannel, KeltnerChannel, SuperTrend,
};
use crate::application::indicators::volume::{Mfi, Obv, Vwap};
use crate::config::IndicatorConfig;
use crate::domain::market::candle::Candle;

/// One incremental pass over every indicator family for a single timeframe.
///
/// Each closed candle is folded into every family exactly once, in O(1)
/// amortized work per family, and the results land in a single snapshot
/// value. Feeding the same candle sequence always yields the same
/// snapshots: there is no hidden clock or randomness anywhere below here.
pub struct IndicatorEngine {
    config: IndicatorConfig,

    sma_fast: Sma,
    sma_slow: Sma,
    sma_trend: Sma,
    ema_fast: Ema,
    ema_slow: Ema,

    rsi: Rsi,
    stoch_rsi: StochRsi,
    macd: Macd,

    bollinger: BollingerBands,
    atr: Atr,
    keltner: KeltnerChannel,
    donchian: DonchianChannel,

    adx: Adx,
    supertrend: SuperTrend,
    ichimoku: Ichimoku,
    two_pole: TwoPoleOscillator,

    obv: Obv,
    mfi: Mfi,
    vwap: Vwap,

    candles_seen: u64,
    current: IndicatorSnapshot,
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            sma_fast: Sma::new(config.sma_fast_period),
            sma_slow: Sma::new(config.sma_slow_period),
            sma_trend: Sma::new(config.sma_trend_period),
            ema_fast: Ema::new(config.ema_fast_period),
            ema_slow: Ema::new(config.ema_slow_period),
            rsi: Rsi::new(config.rsi_period),
            stoch_rsi: StochRsi::new(
                config.stoch_rsi_period,
                config.stoch_rsi_k,
                config.stoch_rsi_d,
            ),
            macd: Macd::new(
                config.ema_fast_period,
                config.ema_slow_period,
                config.macd_signal_period,
            ),
            bollinger: BollingerBands::new(config.bb_period, config.bb_std_dev),
            atr: Atr::new(config.atr_period),
            keltner: KeltnerChannel::new(
                config.keltner_period,
                config.keltner_atr_period,
                config.keltner_multiplier,
            ),
            donchian: DonchianChannel::new(config.donchian_period),
            adx: Adx::new(config.adx_period),
            supertrend: SuperTrend::new(config.supertrend_period, config.supertrend_multiplier),
            ichimoku: Ichimoku::new(
                config.ichimoku_tenkan,
                config.ichimoku_kijun,
                config.ichimoku_senkou_b,
                config.ichimoku_displacement,
            ),
            two_pole: TwoPoleOscillator::new(
                config.two_pole_period,
                config.two_pole_smooth_period,
                config.two_pole_z_window,
                config.two_pole_lag,
                config.two_pole_zone_threshold,
                config.two_pole_extreme_threshold,
            ),
            obv: Obv::new(),
            mfi: Mfi::new(config.mfi_period),
            vwap: Vwap::new(),
            candles_seen: 0,
            current: IndicatorSnapshot::default(),
            config: config.clone(),
        }
    }

    /// Fold one closed candle into every family and refresh the snapshot.
    pub fn on_candle_close(&mut self, candle: &Candle) -> IndicatorSnapshot {
        self.candles_seen += 1;

        let mut snapshot = IndicatorSnapshot {
            timestamp: candle.timestamp,
            close: candle.close,
            ..IndicatorSnapshot::default()
        };

        snapshot.sma_fast = self.sma_fast.update(candle.close);
        snapshot.sma_slow = self.sma_slow.update(candle.close);
        snapshot.sma_trend = self.sma_trend.update(candle.close);

        let ema_fast = self.ema_fast.update(candle.close);
        snapshot.ema_fast = self.ema_fast.is_warm().then_some(ema_fast);
        let ema_slow = self.ema_slow.update(candle.close);
        snapshot.ema_slow = self.ema_slow.is_warm().then_some(ema_slow);

        snapshot.rsi = self.rsi.update(candle.close);
        if let Some(rsi) = snapshot.rsi {
            if let Some(stoch) = self.stoch_rsi.update(rsi) {
                snapshot.stoch_rsi_k = Some(stoch.k);
                snapshot.stoch_rsi_d = Some(stoch.d);
            }
        }
        if let Some(macd) = self.macd.update(candle.close) {
            snapshot.macd = Some(macd.macd);
            snapshot.macd_signal = macd.signal;
            snapshot.macd_histogram = macd.histogram;
        }

        if let Some(bb) = self.bollinger.update(candle.close) {
            snapshot.bb_upper = Some(bb.upper);
            snapshot.bb_middle = Some(bb.middle);
            snapshot.bb_lower = Some(bb.lower);
            snapshot.bb_percent_b = bb.percent_b;
            snapshot.bb_bandwidth = bb.bandwidth;
        }
        snapshot.atr = self.atr.update(candle);
        if let Some(keltner) = self.keltner.update(candle) {
            snapshot.keltner_upper = Some(keltner.upper);
            snapshot.keltner_middle = Some(keltner.middle);
            snapshot.keltner_lower = Some(keltner.lower);
        }
        if let Some(donchian) = self.donchian.update(candle) {
            snapshot.donchian_upper = Some(donchian.upper);
            snapshot.donchian_middle = Some(donchian.middle);
            snapshot.donchian_lower = Some(donchian.lower);
        }

        if let Some(adx) = self.adx.update(candle) {
            snapshot.adx = adx.adx;
            snapshot.plus_di = Some(adx.plus_di);
            snapshot.minus_di = Some(adx.minus_di);
        }
        if let Some(st) = self.supertrend.update(candle) {
            snapshot.supertrend = Some(st.value);
            snapshot.supertrend_direction = Some(st.direction);
        }
        if let Some(ichimoku) = self.ichimoku.update(candle) {
            snapshot.ichimoku_tenkan = Some(ichimoku.tenkan);
            snapshot.ichimoku_kijun = Some(ichimoku.kijun);
            snapshot.ichimoku_senkou_a = ichimoku.senkou_a;
            snapshot.ichimoku_senkou_b = ichimoku.senkou_b;
            snapshot.ichimoku_chikou = ichimoku.chikou;
        }
        if let Some(two_pole) = self.two_pole.update(candle) {
            snapshot.two_pole = Some(two_pole.value);
            snapshot.two_pole_lagged = Some(two_pole.lagged);
            snapshot.two_pole_zone = Some(two_pole.zone);
            snapshot.two_pole_signal = Some(two_pole.signal);
        }

        snapshot.obv = Some(self.obv.update(candle));
        snapshot.mfi = self.mfi.update(candle);
        snapshot.vwap = self.vwap.update(candle);

        self.current = snapshot;
        snapshot
    }

    /// Copy of the latest snapshot; independent of later engine updates
    pub fn snapshot(&self) -> IndicatorSnapshot {
        self.current
    }

    pub fn candles_seen(&self) -> u64 {
        self.candles_seen
    }

    /// Replay a full candle history through a fresh engine.
    ///
    /// Exists for warm-starting from stored candles and as the determinism
    /// reference: the final snapshot equals what the same sequence produces
    /// incrementally.
    pub fn compute_batch(config: &IndicatorConfig, candles: &[Candle]) -> IndicatorSnapshot {
        let mut engine = Self::new(config);
        for candle in candles {
            engine.on_candle_close(candle);
        }
        engine.snapshot()
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave_candle(i: i64) -> Candle {
        let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.05;
        Candle {
            timestamp: i * 60_000,
            open: close,
            high: close + 1.5,
            low: close - 1.5,
            close,
            volume: 1000.0 + (i % 7) as f64 * 100.0,
        }
    }

    #[test]
    fn test_batch_matches_incremental() {
        let config = IndicatorConfig::default();
        let candles: Vec<Candle> = (0..300).map(wave_candle).collect();

        let mut engine = IndicatorEngine::new(&config);
        for candle in &candles {
            engine.on_candle_close(candle);
        }

        let batch = IndicatorEngine::compute_batch(&config, &candles);
        assert_eq!(engine.snapshot(), batch);
    }

    #[test]
    fn test_rsi_available_at_period_plus_one() {
        let config = IndicatorConfig::default();
        let mut engine = IndicatorEngine::new(&config);

        for i in 0..14 {
            let snapshot = engine.on_candle_close(&wave_candle(i));
            assert!(snapshot.rsi.is_none(), "candle {}", i);
        }
        let snapshot = engine.on_candle_close(&wave_candle(14));
        assert!(snapshot.rsi.is_some());
    }

    #[test]
    fn test_adx_needs_roughly_two_periods() {
        let config = IndicatorConfig::default();
        let mut engine = IndicatorEngine::new(&config);

        let mut first_adx = None;
        for i in 0..80 {
            let snapshot = engine.on_candle_close(&wave_candle(i));
            if snapshot.adx.is_some() {
                first_adx.get_or_insert(i);
                break;
            }
        }
        // DI at period + 1, ADX a full period of DX samples later
        assert_eq!(first_adx, Some(2 * config.adx_period as i64 - 1));
    }

    #[test]
    fn test_snapshot_is_a_value_copy() {
        let config = IndicatorConfig::default();
        let mut engine = IndicatorEngine::new(&config);
        for i in 0..50 {
            engine.on_candle_close(&wave_candle(i));
        }

        let before = engine.snapshot();
        engine.on_candle_close(&wave_candle(50));
        // The earlier copy does not observe the update
        assert_ne!(before.close, engine.snapshot().close);
        assert_eq!(before.timestamp, 49 * 60_000);
    }

    #[test]
    fn test_all_families_populate_after_long_warm_up() {
        let config = IndicatorConfig::default();
        let mut engine = IndicatorEngine::new(&config);
        let mut snapshot = IndicatorSnapshot::default();
        for i in 0..300 {
            snapshot = engine.on_candle_close(&wave_candle(i));
        }

        assert!(snapshot.sma_trend.is_some());
        assert!(snapshot.macd_histogram.is_some());
        assert!(snapshot.stoch_rsi_d.is_some());
        assert!(snapshot.bb_percent_b.is_some());
        assert!(snapshot.keltner_middle.is_some());
        assert!(snapshot.adx.is_some());
        assert!(snapshot.supertrend_direction.is_some());
        assert!(snapshot.ichimoku_senkou_b.is_some());
        assert!(snapshot.two_pole_zone.is_some());
        assert!(snapshot.mfi.is_some());
        assert!(snapshot.vwap.is_some());
    }
}
