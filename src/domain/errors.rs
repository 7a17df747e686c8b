use thiserror::Error;

/// Errors raised when a raw ingress event fails validation at the boundary.
///
/// The offending event is rejected and counted; the pipeline continues
/// unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("non-finite value {value} in field '{field}'")]
    NonFinite { field: &'static str, value: f64 },

    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },

    #[error("negative volume {volume}")]
    NegativeVolume { volume: f64 },

    #[error("non-positive timestamp {timestamp}")]
    BadTimestamp { timestamp: i64 },
}

/// Non-fatal per-event ingestion outcomes.
///
/// These are counted and reported to the injected observer, never
/// propagated: one bad event must not halt ingestion of subsequent events.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    #[error("queue at capacity ({capacity}): oldest event dropped")]
    QueueOverflow { capacity: usize },

    #[error("event stale at dispatch: age {age_ms}ms > threshold {threshold_ms}ms")]
    StaleEvent { age_ms: u64, threshold_ms: u64 },

    #[error("event rejected: {0}")]
    Rejected(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_formatting() {
        let err = ValidationError::HighBelowLow {
            high: 99.0,
            low: 101.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("99"));
        assert!(msg.contains("101"));
    }

    #[test]
    fn test_stale_event_formatting() {
        let err = IngestError::StaleEvent {
            age_ms: 45_000,
            threshold_ms: 30_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("45000"));
        assert!(msg.contains("30000"));
    }
}
