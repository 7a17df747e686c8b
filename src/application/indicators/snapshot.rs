use crate::application::indicators::trend::{OscZone, TwoPoleSignal};
use serde::{Deserialize, Serialize};

/// Point-in-time view of every indicator family on one timeframe.
///
/// Every field is optional: a `None` means that family has not finished
/// warming up yet. Values always refer to the last closed candle, never to
/// a partially formed bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Bucket-start timestamp of the candle this snapshot describes
    pub timestamp: i64,
    pub close: f64,

    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub sma_trend: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,

    pub rsi: Option<f64>,
    pub stoch_rsi_k: Option<f64>,
    pub stoch_rsi_d: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,

    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_percent_b: Option<f64>,
    pub bb_bandwidth: Option<f64>,
    pub atr: Option<f64>,
    pub keltner_upper: Option<f64>,
    pub keltner_middle: Option<f64>,
    pub keltner_lower: Option<f64>,
    pub donchian_upper: Option<f64>,
    pub donchian_middle: Option<f64>,
    pub donchian_lower: Option<f64>,

    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub supertrend: Option<f64>,
    /// +1 uptrend, -1 downtrend
    pub supertrend_direction: Option<i8>,
    pub ichimoku_tenkan: Option<f64>,
    pub ichimoku_kijun: Option<f64>,
    pub ichimoku_senkou_a: Option<f64>,
    pub ichimoku_senkou_b: Option<f64>,
    pub ichimoku_chikou: Option<f64>,

    pub two_pole: Option<f64>,
    pub two_pole_lagged: Option<f64>,
    pub two_pole_zone: Option<OscZone>,
    pub two_pole_signal: Option<TwoPoleSignal>,

    pub obv: Option<f64>,
    pub mfi: Option<f64>,
    pub vwap: Option<f64>,
}
