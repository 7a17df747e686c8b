use crate::application::indicators::snapshot::IndicatorSnapshot;
use crate::config::ConfluenceConfig;
use crate::domain::market::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Five-level overall market bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    StrongBearish,
    Bearish,
    Neutral,
    Bullish,
    StrongBullish,
}

/// Actionable output; `Neutral` means "do nothing", not "no opinion"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Sell,
    Neutral,
}

/// One timeframe's contribution to the blended score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSignal {
    pub timeframe: Timeframe,
    /// Blended per-timeframe signal in [-1, 1]
    pub signal: f64,
    /// Importance weight of this timeframe in the overall average
    pub weight: f64,
    /// SuperTrend direction, if warmed up
    pub trend_direction: Option<i8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceReport {
    /// Weighted average across ready timeframes, in [-1, 1]
    pub score: f64,
    pub bias: Bias,
    /// Agreement ratio x trend-alignment ratio, in [0, 1]
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub signals: Vec<TimeframeSignal>,
}

impl ConfluenceReport {
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            bias: Bias::Neutral,
            confidence: 0.0,
            recommendation: Recommendation::Neutral,
            signals: Vec::new(),
        }
    }
}

/// Blends per-timeframe indicator snapshots into one score and an
/// all-or-nothing recommendation.
///
/// Each ready timeframe contributes a bounded signal from four components:
/// RSI displacement from the 50 midline, SuperTrend direction scaled by
/// ADX strength, the MACD histogram's sign, and the Bollinger %B position.
/// Longer timeframes carry more weight. A non-neutral recommendation needs
/// the confidence threshold AND the score-magnitude threshold to hold at
/// the same time.
pub struct ConfluenceScorer {
    config: ConfluenceConfig,
}

impl ConfluenceScorer {
    pub fn new(config: &ConfluenceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// RSI displacement from the midline, [-1, 1]
    fn rsi_component(snapshot: &IndicatorSnapshot) -> Option<f64> {
        snapshot.rsi.map(|rsi| ((rsi - 50.0) / 50.0).clamp(-1.0, 1.0))
    }

    /// SuperTrend direction scaled by ADX trend strength, [-1, 1].
    ///
    /// ADX 50 and beyond counts as full strength; before the ADX warms up
    /// the direction alone contributes at half strength.
    fn trend_component(snapshot: &IndicatorSnapshot) -> Option<f64> {
        let direction = snapshot.supertrend_direction? as f64;
        let strength = match snapshot.adx {
            Some(adx) => (adx / 50.0).min(1.0),
            None => 0.5,
        };
        Some(direction * strength)
    }

    /// Sign of the MACD histogram (or of the MACD line before the signal
    /// line warms up)
    fn macd_component(snapshot: &IndicatorSnapshot) -> Option<f64> {
        let value = snapshot.macd_histogram.or(snapshot.macd)?;
        Some(if value > 0.0 {
            1.0
        } else if value < 0.0 {
            -1.0
        } else {
            0.0
        })
    }

    /// Bollinger %B displacement from the band midline, [-1, 1]
    fn bb_component(snapshot: &IndicatorSnapshot) -> Option<f64> {
        snapshot
            .bb_percent_b
            .map(|pb| ((pb - 50.0) / 50.0).clamp(-1.0, 1.0))
    }

    /// Weighted blend of the available components, [-1, 1].
    ///
    /// Missing components drop out of both numerator and denominator, so a
    /// half-warm timeframe is still scored on what it has.
    fn timeframe_signal(&self, snapshot: &IndicatorSnapshot) -> f64 {
        let components = [
            (self.config.weight_rsi, Self::rsi_component(snapshot)),
            (self.config.weight_trend, Self::trend_component(snapshot)),
            (self.config.weight_macd, Self::macd_component(snapshot)),
            (self.config.weight_bb, Self::bb_component(snapshot)),
        ];

        let mut weighted = 0.0;
        let mut weight_sum = 0.0;
        for (weight, component) in components {
            if let Some(value) = component {
                weighted += weight * value;
                weight_sum += weight;
            }
        }
        if weight_sum > 0.0 {
            (weighted / weight_sum).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    fn bias(&self, score: f64) -> Bias {
        if score >= self.config.strong_threshold {
            Bias::StrongBullish
        } else if score >= self.config.bias_threshold {
            Bias::Bullish
        } else if score <= -self.config.strong_threshold {
            Bias::StrongBearish
        } else if score <= -self.config.bias_threshold {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }

    /// Score every ready timeframe and blend the result.
    ///
    /// `snapshots` must only contain timeframes whose series are ready;
    /// an empty slice produces the neutral empty report.
    pub fn score(&self, snapshots: &[(Timeframe, IndicatorSnapshot)]) -> ConfluenceReport {
        if snapshots.is_empty() {
            return ConfluenceReport::empty();
        }

        let signals: Vec<TimeframeSignal> = snapshots
            .iter()
            .map(|(timeframe, snapshot)| TimeframeSignal {
                timeframe: *timeframe,
                signal: self.timeframe_signal(snapshot),
                weight: timeframe.confluence_weight(),
                trend_direction: snapshot.supertrend_direction,
            })
            .collect();

        let weight_sum: f64 = signals.iter().map(|s| s.weight).sum();
        let score = signals
            .iter()
            .map(|s| s.weight * s.signal)
            .sum::<f64>()
            / weight_sum;

        let confidence = Self::confidence(&signals);
        let bias = self.bias(score);

        let recommendation = if confidence > self.config.min_confidence
            && score.abs() > self.config.min_score
        {
            if score > 0.0 {
                Recommendation::Buy
            } else {
                Recommendation::Sell
            }
        } else {
            Recommendation::Neutral
        };

        debug!(
            "ConfluenceScorer: score {:.3} bias {:?} confidence {:.3} -> {:?}",
            score, bias, confidence, recommendation
        );

        ConfluenceReport {
            score,
            bias,
            confidence,
            recommendation,
            signals,
        }
    }

    /// (majority-direction agreement ratio) x (trend alignment with the
    /// highest-weighted timeframe's SuperTrend direction)
    fn confidence(signals: &[TimeframeSignal]) -> f64 {
        let total = signals.len() as f64;

        let bullish = signals.iter().filter(|s| s.signal > 0.0).count();
        let bearish = signals.iter().filter(|s| s.signal < 0.0).count();
        let agreement = bullish.max(bearish) as f64 / total;

        let reference = signals
            .iter()
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
            .and_then(|s| s.trend_direction);
        let alignment = match reference {
            Some(reference) => {
                signals
                    .iter()
                    .filter(|s| s.trend_direction == Some(reference))
                    .count() as f64
                    / total
            }
            None => 0.0,
        };

        (agreement * alignment).clamp(0.0, 1.0)
    }
}
