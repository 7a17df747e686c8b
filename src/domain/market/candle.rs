use crate::domain::errors::ValidationError;
use serde::{Deserialize, Serialize};

/// One finalized OHLCV bar for a fixed time interval.
///
/// `timestamp` is the period-start time in epoch milliseconds. All numeric
/// fields are finite and `high >= low`; this is enforced at the ingress
/// boundary, so everything downstream can rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Midpoint of high and low, used by SuperTrend and channel indicators
    pub fn hl2(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Typical price (h + l + c) / 3, used by MFI and VWAP
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Raw ingress event as produced by an upstream feed adapter.
///
/// This is the single canonical wire shape: `{t, o, h, l, c, v}`. A payload
/// with a missing field fails at deserialization; everything else is checked
/// by [`CandleEvent::validate`], which normalizes the event into a [`Candle`]
/// or rejects it. No field-name variants are accepted past this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleEvent {
    /// Period-start timestamp in epoch milliseconds
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

impl CandleEvent {
    /// Validate this event and convert it into a canonical [`Candle`].
    ///
    /// Rejects non-finite numeric fields, `h < l`, negative volume and
    /// non-positive timestamps.
    pub fn validate(self) -> Result<Candle, ValidationError> {
        for (field, value) in [
            ("o", self.o),
            ("h", self.h),
            ("l", self.l),
            ("c", self.c),
            ("v", self.v),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { field, value });
            }
        }

        if self.h < self.l {
            return Err(ValidationError::HighBelowLow {
                high: self.h,
                low: self.l,
            });
        }

        if self.v < 0.0 {
            return Err(ValidationError::NegativeVolume { volume: self.v });
        }

        if self.t <= 0 {
            return Err(ValidationError::BadTimestamp { timestamp: self.t });
        }

        Ok(Candle {
            timestamp: self.t,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
        })
    }
}

impl From<Candle> for CandleEvent {
    fn from(candle: Candle) -> Self {
        Self {
            t: candle.timestamp,
            o: candle.open,
            h: candle.high,
            l: candle.low,
            c: candle.close,
            v: candle.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_event() -> CandleEvent {
        CandleEvent {
            t: 1_704_067_200_000,
            o: 100.0,
            h: 101.5,
            l: 99.5,
            c: 100.8,
            v: 1250.0,
        }
    }

    #[test]
    fn test_valid_event_normalizes() {
        let candle = valid_event().validate().unwrap();
        assert_eq!(candle.timestamp, 1_704_067_200_000);
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.close, 100.8);
        assert_eq!(candle.volume, 1250.0);
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut event = valid_event();
        event.c = f64::NAN;
        assert!(matches!(
            event.validate(),
            Err(ValidationError::NonFinite { field: "c", .. })
        ));

        let mut event = valid_event();
        event.h = f64::INFINITY;
        assert!(matches!(
            event.validate(),
            Err(ValidationError::NonFinite { field: "h", .. })
        ));
    }

    #[test]
    fn test_rejects_high_below_low() {
        let mut event = valid_event();
        event.h = 98.0;
        assert!(matches!(
            event.validate(),
            Err(ValidationError::HighBelowLow { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_volume() {
        let mut event = valid_event();
        event.v = -1.0;
        assert!(matches!(
            event.validate(),
            Err(ValidationError::NegativeVolume { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_field_at_parse() {
        let err = serde_json::from_str::<CandleEvent>(
            r#"{"t": 1704067200000, "o": 100.0, "h": 101.0, "l": 99.0, "c": 100.5}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_typical_price() {
        let candle = valid_event().validate().unwrap();
        let expected = (101.5 + 99.5 + 100.8) / 3.0;
        assert!((candle.typical_price() - expected).abs() < 1e-12);
    }
}
