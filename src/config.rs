use crate::domain::market::timeframe::Timeframe;
use anyhow::{Result, bail};

/// Ingestion queue tuning
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum buffered events before drop-oldest kicks in
    pub capacity: usize,
    /// Events older than this at dispatch time are discarded
    pub staleness_ms: u64,
    /// Minimum gap between two dispatches
    pub pacing_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            staleness_ms: 30_000,
            pacing_ms: 25,
        }
    }
}

/// Periods and multipliers for every indicator family.
///
/// Defaults are the conventional settings; all of them feed the engine at
/// construction time, so a misconfigured period fails fast instead of
/// degrading silently mid-stream.
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    pub sma_trend_period: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub macd_signal_period: usize,
    pub rsi_period: usize,
    pub stoch_rsi_period: usize,
    pub stoch_rsi_k: usize,
    pub stoch_rsi_d: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub atr_period: usize,
    pub adx_period: usize,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub keltner_period: usize,
    pub keltner_atr_period: usize,
    pub keltner_multiplier: f64,
    pub donchian_period: usize,
    pub mfi_period: usize,
    pub ichimoku_tenkan: usize,
    pub ichimoku_kijun: usize,
    pub ichimoku_senkou_b: usize,
    pub ichimoku_displacement: usize,
    pub two_pole_period: usize,
    pub two_pole_smooth_period: usize,
    pub two_pole_z_window: usize,
    pub two_pole_lag: usize,
    /// |z| at or above this is the active signal zone
    pub two_pole_zone_threshold: f64,
    /// |z| at or above this is the extreme zone
    pub two_pole_extreme_threshold: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_fast_period: 20,
            sma_slow_period: 50,
            sma_trend_period: 200,
            ema_fast_period: 12,
            ema_slow_period: 26,
            macd_signal_period: 9,
            rsi_period: 14,
            stoch_rsi_period: 14,
            stoch_rsi_k: 3,
            stoch_rsi_d: 3,
            bb_period: 20,
            bb_std_dev: 2.0,
            atr_period: 14,
            adx_period: 14,
            supertrend_period: 10,
            supertrend_multiplier: 3.0,
            keltner_period: 20,
            keltner_atr_period: 10,
            keltner_multiplier: 2.0,
            donchian_period: 20,
            mfi_period: 14,
            ichimoku_tenkan: 9,
            ichimoku_kijun: 26,
            ichimoku_senkou_b: 52,
            ichimoku_displacement: 26,
            two_pole_period: 20,
            two_pole_smooth_period: 5,
            two_pole_z_window: 25,
            two_pole_lag: 2,
            two_pole_zone_threshold: 0.8,
            two_pole_extreme_threshold: 1.5,
        }
    }
}

/// Structural analysis tuning: pivot windows, S/R clustering, trendlines
#[derive(Debug, Clone)]
pub struct StructureConfig {
    /// Candles to the left of a pivot candidate
    pub pivot_left: usize,
    /// Candles to the right; confirmation lags by exactly this many candles
    pub pivot_right: usize,
    /// Pivots older than this many candles are pruned
    pub pivot_horizon: u64,
    /// Percentage tolerance for joining an S/R cluster
    pub sr_tolerance_pct: f64,
    /// Maximum support/resistance levels kept per side
    pub sr_max_levels: usize,
    /// Minimum same-kind pivots before a trendline is fit
    pub trend_min_pivots: usize,
    /// Most recent same-kind pivots fed into the regression
    pub trend_lookback_pivots: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            pivot_left: 5,
            pivot_right: 5,
            pivot_horizon: 500,
            sr_tolerance_pct: 0.5,
            sr_max_levels: 6,
            trend_min_pivots: 3,
            trend_lookback_pivots: 12,
        }
    }
}

/// Confluence scoring weights and decision thresholds
#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    pub weight_rsi: f64,
    pub weight_trend: f64,
    pub weight_macd: f64,
    pub weight_bb: f64,
    /// |score| beyond this is a (strong-)bullish/bearish bias
    pub bias_threshold: f64,
    /// |score| beyond this is a strong bias
    pub strong_threshold: f64,
    /// Both of these must hold for a non-neutral recommendation
    pub min_confidence: f64,
    pub min_score: f64,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            weight_rsi: 0.25,
            weight_trend: 0.35,
            weight_macd: 0.20,
            weight_bb: 0.20,
            bias_threshold: 0.2,
            strong_threshold: 0.5,
            min_confidence: 0.6,
            min_score: 0.3,
        }
    }
}

/// Top-level configuration for one pipeline instance.
///
/// There is no process-wide engine: callers construct a config, validate it,
/// and own the resulting pipeline value explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Active resolutions; must include the base `OneMin`
    pub timeframes: Vec<Timeframe>,
    /// Candles a series needs before it reports as ready
    pub min_ready: usize,
    pub queue: QueueConfig,
    pub indicators: IndicatorConfig,
    pub structure: StructureConfig,
    pub confluence: ConfluenceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeframes: Timeframe::all(),
            min_ready: 60,
            queue: QueueConfig::default(),
            indicators: IndicatorConfig::default(),
            structure: StructureConfig::default(),
            confluence: ConfluenceConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Fail-fast structural validation, run once at pipeline construction.
    ///
    /// A config that passes here cannot produce a construction-time panic
    /// anywhere downstream.
    pub fn validate(&self) -> Result<()> {
        if self.timeframes.is_empty() {
            bail!("at least one timeframe must be configured");
        }
        if !self.timeframes.contains(&Timeframe::OneMin) {
            bail!("the base timeframe (1m) must be configured");
        }
        if self.min_ready == 0 {
            bail!("min_ready must be at least 1");
        }
        if self.queue.capacity == 0 {
            bail!("queue capacity must be at least 1");
        }
        if self.queue.staleness_ms == 0 {
            bail!("queue staleness threshold must be positive");
        }

        let ind = &self.indicators;
        for (name, period) in [
            ("sma_fast_period", ind.sma_fast_period),
            ("sma_slow_period", ind.sma_slow_period),
            ("sma_trend_period", ind.sma_trend_period),
            ("ema_fast_period", ind.ema_fast_period),
            ("ema_slow_period", ind.ema_slow_period),
            ("macd_signal_period", ind.macd_signal_period),
            ("rsi_period", ind.rsi_period),
            ("stoch_rsi_period", ind.stoch_rsi_period),
            ("stoch_rsi_k", ind.stoch_rsi_k),
            ("stoch_rsi_d", ind.stoch_rsi_d),
            ("bb_period", ind.bb_period),
            ("atr_period", ind.atr_period),
            ("adx_period", ind.adx_period),
            ("supertrend_period", ind.supertrend_period),
            ("keltner_period", ind.keltner_period),
            ("keltner_atr_period", ind.keltner_atr_period),
            ("donchian_period", ind.donchian_period),
            ("mfi_period", ind.mfi_period),
            ("ichimoku_tenkan", ind.ichimoku_tenkan),
            ("ichimoku_kijun", ind.ichimoku_kijun),
            ("ichimoku_senkou_b", ind.ichimoku_senkou_b),
            ("ichimoku_displacement", ind.ichimoku_displacement),
            ("two_pole_period", ind.two_pole_period),
            ("two_pole_smooth_period", ind.two_pole_smooth_period),
            ("two_pole_z_window", ind.two_pole_z_window),
        ] {
            if period == 0 {
                bail!("indicator period '{}' must be at least 1", name);
            }
        }
        if ind.ema_fast_period >= ind.ema_slow_period {
            bail!("ema_fast_period must be shorter than ema_slow_period");
        }
        if ind.bb_std_dev <= 0.0 {
            bail!("bb_std_dev must be positive");
        }
        if ind.supertrend_multiplier <= 0.0 || ind.keltner_multiplier <= 0.0 {
            bail!("channel multipliers must be positive");
        }

        let st = &self.structure;
        if st.pivot_left == 0 || st.pivot_right == 0 {
            bail!("pivot window sides must be at least 1");
        }
        if st.sr_tolerance_pct <= 0.0 {
            bail!("sr_tolerance_pct must be positive");
        }
        if st.sr_max_levels == 0 {
            bail!("sr_max_levels must be at least 1");
        }
        if st.trend_min_pivots < 2 {
            bail!("trend_min_pivots must be at least 2 for a regression");
        }
        if st.trend_lookback_pivots < st.trend_min_pivots {
            bail!("trend_lookback_pivots must be >= trend_min_pivots");
        }

        let conf = &self.confluence;
        let weight_sum = conf.weight_rsi + conf.weight_trend + conf.weight_macd + conf.weight_bb;
        if weight_sum <= 0.0 {
            bail!("confluence component weights must sum to a positive value");
        }
        if !(0.0..=1.0).contains(&conf.min_confidence) {
            bail!("min_confidence must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&conf.min_score) {
            bail!("min_score must be within [0, 1]");
        }
        if conf.bias_threshold >= conf.strong_threshold {
            bail!("bias_threshold must be below strong_threshold");
        }

        Ok(())
    }
}
