use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents different timeframe resolutions for market data analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    OneMin,
    FiveMin,
    FifteenMin,
    OneHour,
    FourHour,
    OneDay,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> usize {
        match self {
            Timeframe::OneMin => 1,
            Timeframe::FiveMin => 5,
            Timeframe::FifteenMin => 15,
            Timeframe::OneHour => 60,
            Timeframe::FourHour => 240,
            Timeframe::OneDay => 1440,
        }
    }

    /// Returns the duration in milliseconds
    pub fn interval_ms(&self) -> i64 {
        (self.to_minutes() as i64) * 60 * 1000
    }

    /// Returns all available timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::OneMin,
            Timeframe::FiveMin,
            Timeframe::FifteenMin,
            Timeframe::OneHour,
            Timeframe::FourHour,
            Timeframe::OneDay,
        ]
    }

    /// Returns the start timestamp of the bucket containing the given timestamp
    ///
    /// Bucketing is floor-based (`floor(t / interval) * interval`), not
    /// wall-clock-relative, so replaying the same feed always lands ticks in
    /// the same buckets.
    pub fn bucket_start(&self, timestamp_ms: i64) -> i64 {
        let interval = self.interval_ms();
        timestamp_ms - timestamp_ms.rem_euclid(interval)
    }

    /// Ring-buffer capacity for this timeframe's finalized candle series.
    ///
    /// Capacity scales inversely with the interval: short resolutions keep a
    /// deep history for intraday structure, long resolutions keep less.
    pub fn series_capacity(&self) -> usize {
        match self {
            Timeframe::OneMin => 1440,
            Timeframe::FiveMin => 864,
            Timeframe::FifteenMin => 672,
            Timeframe::OneHour => 504,
            Timeframe::FourHour => 360,
            Timeframe::OneDay => 250,
        }
    }

    /// Importance weight used by the confluence scorer.
    ///
    /// Shorter resolutions are weighted less than longer ones.
    pub fn confluence_weight(&self) -> f64 {
        match self {
            Timeframe::OneMin => 0.5,
            Timeframe::FiveMin => 0.8,
            Timeframe::FifteenMin => 1.0,
            Timeframe::OneHour => 1.5,
            Timeframe::FourHour => 2.0,
            Timeframe::OneDay => 2.5,
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "onemin" => Ok(Timeframe::OneMin),
            "5m" | "5min" | "fivemin" => Ok(Timeframe::FiveMin),
            "15m" | "15min" | "fifteenmin" => Ok(Timeframe::FifteenMin),
            "1h" | "1hour" | "onehour" => Ok(Timeframe::OneHour),
            "4h" | "4hour" | "fourhour" => Ok(Timeframe::FourHour),
            "1d" | "1day" | "oneday" => Ok(Timeframe::OneDay),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: 1m, 5m, 15m, 1h, 4h, 1d",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::OneMin => "1m",
            Timeframe::FiveMin => "5m",
            Timeframe::FifteenMin => "15m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHour => "4h",
            Timeframe::OneDay => "1d",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(Timeframe::OneMin.to_minutes(), 1);
        assert_eq!(Timeframe::FiveMin.to_minutes(), 5);
        assert_eq!(Timeframe::FourHour.to_minutes(), 240);
        assert_eq!(Timeframe::OneDay.to_minutes(), 1440);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("1m").unwrap(), Timeframe::OneMin);
        assert_eq!(Timeframe::from_str("5Min").unwrap(), Timeframe::FiveMin);
        assert_eq!(Timeframe::from_str("1h").unwrap(), Timeframe::OneHour);
        assert_eq!(Timeframe::from_str("4Hour").unwrap(), Timeframe::FourHour);
        assert_eq!(Timeframe::from_str("1d").unwrap(), Timeframe::OneDay);
        assert!(Timeframe::from_str("invalid").is_err());
    }

    #[test]
    fn test_bucket_start() {
        let tf = Timeframe::FiveMin;
        // 2024-01-01 00:00:00 UTC
        let base = 1_704_067_200_000_i64;

        assert_eq!(tf.bucket_start(base), base);
        assert_eq!(tf.bucket_start(base + 3 * 60 * 1000), base);
        assert_eq!(tf.bucket_start(base + 5 * 60 * 1000), base + 5 * 60 * 1000);
        assert_eq!(tf.bucket_start(base + 7 * 60 * 1000), base + 5 * 60 * 1000);
    }

    #[test]
    fn test_bucket_start_daily() {
        let tf = Timeframe::OneDay;
        let base = 1_704_067_200_000_i64; // midnight UTC
        assert_eq!(tf.bucket_start(base + 13 * 3600 * 1000), base);
        assert_eq!(tf.bucket_start(base + 86_400_000), base + 86_400_000);
    }

    #[test]
    fn test_weights_increase_with_interval() {
        let frames = Timeframe::all();
        for pair in frames.windows(2) {
            assert!(pair[0].confluence_weight() < pair[1].confluence_weight());
        }
    }

    #[test]
    fn test_capacity_decreases_with_interval() {
        let frames = Timeframe::all();
        for pair in frames.windows(2) {
            assert!(pair[0].series_capacity() > pair[1].series_capacity());
        }
    }
}
