// Market data domain
pub mod candle;
pub mod series;
pub mod timeframe;
