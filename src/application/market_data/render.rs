use crate::application::indicators::snapshot::IndicatorSnapshot;
use crate::application::structure::StructureSnapshot;
use crate::application::structure::pivots::PivotKind;
use crate::domain::market::candle::Candle;
use serde::{Deserialize, Serialize};

/// One (timestamp, value) sample of an overlay or panel series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// A named polyline drawn over the price chart or inside a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderLine {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// A shaded channel between two polylines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderBand {
    pub label: String,
    pub upper: Vec<SeriesPoint>,
    pub lower: Vec<SeriesPoint>,
}

/// A sub-chart of oscillator lines sharing one value axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPanel {
    pub label: String,
    pub series: Vec<RenderLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    PivotHigh,
    PivotLow,
}

/// A point annotation on the price chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderMarker {
    pub timestamp: i64,
    pub price: f64,
    pub kind: MarkerKind,
}

/// Chart-ready projection of the base-timeframe state.
///
/// Deliberately lossy: truncated to `max_points` candles, overlay samples
/// with no value yet are simply absent, and structural levels are
/// flattened into horizontal lines spanning the visible range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPacket {
    pub candles: Vec<Candle>,
    pub lines: Vec<RenderLine>,
    pub bands: Vec<RenderBand>,
    pub panels: Vec<RenderPanel>,
    pub markers: Vec<RenderMarker>,
}

fn sample<F>(snapshots: &[IndicatorSnapshot], field: F) -> Vec<SeriesPoint>
where
    F: Fn(&IndicatorSnapshot) -> Option<f64>,
{
    snapshots
        .iter()
        .filter_map(|snapshot| {
            field(snapshot).map(|value| SeriesPoint {
                timestamp: snapshot.timestamp,
                value,
            })
        })
        .collect()
}

fn line<F>(label: &str, snapshots: &[IndicatorSnapshot], field: F) -> RenderLine
where
    F: Fn(&IndicatorSnapshot) -> Option<f64>,
{
    RenderLine {
        label: label.to_string(),
        points: sample(snapshots, field),
    }
}

/// Horizontal line across the visible range at a fixed price
fn horizontal(label: String, price: f64, span: (i64, i64)) -> RenderLine {
    RenderLine {
        label,
        points: vec![
            SeriesPoint {
                timestamp: span.0,
                value: price,
            },
            SeriesPoint {
                timestamp: span.1,
                value: price,
            },
        ],
    }
}

impl RenderPacket {
    /// Project the visible tail of one timeframe's state.
    ///
    /// `candles` and `snapshots` must be aligned: the i-th snapshot
    /// describes the i-th candle. Both are truncated to the most recent
    /// `max_points` entries.
    pub fn build(
        candles: &[Candle],
        snapshots: &[IndicatorSnapshot],
        structure: &StructureSnapshot,
        max_points: usize,
    ) -> Self {
        let skip = candles.len().saturating_sub(max_points);
        let candles: Vec<Candle> = candles[skip..].to_vec();
        let skip = snapshots.len().saturating_sub(max_points);
        let snapshots = &snapshots[skip..];

        let span = match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => (0, 0),
        };

        let mut lines = vec![
            line("sma_fast", snapshots, |s| s.sma_fast),
            line("sma_slow", snapshots, |s| s.sma_slow),
            line("sma_trend", snapshots, |s| s.sma_trend),
            line("ema_fast", snapshots, |s| s.ema_fast),
            line("ema_slow", snapshots, |s| s.ema_slow),
            line("supertrend", snapshots, |s| s.supertrend),
            line("vwap", snapshots, |s| s.vwap),
        ];
        for (i, level) in structure.support.iter().enumerate() {
            lines.push(horizontal(format!("support_{}", i), level.price, span));
        }
        for (i, level) in structure.resistance.iter().enumerate() {
            lines.push(horizontal(format!("resistance_{}", i), level.price, span));
        }
        if let Some(swing) = &structure.fibonacci {
            for level in &swing.levels {
                lines.push(horizontal(
                    format!("fib_{:.3}", level.ratio),
                    level.price,
                    span,
                ));
            }
        }

        let bands = vec![
            RenderBand {
                label: "bollinger".to_string(),
                upper: sample(snapshots, |s| s.bb_upper),
                lower: sample(snapshots, |s| s.bb_lower),
            },
            RenderBand {
                label: "keltner".to_string(),
                upper: sample(snapshots, |s| s.keltner_upper),
                lower: sample(snapshots, |s| s.keltner_lower),
            },
            RenderBand {
                label: "donchian".to_string(),
                upper: sample(snapshots, |s| s.donchian_upper),
                lower: sample(snapshots, |s| s.donchian_lower),
            },
            RenderBand {
                label: "ichimoku_cloud".to_string(),
                upper: sample(snapshots, |s| s.ichimoku_senkou_a),
                lower: sample(snapshots, |s| s.ichimoku_senkou_b),
            },
        ];

        let panels = vec![
            RenderPanel {
                label: "rsi".to_string(),
                series: vec![
                    line("rsi", snapshots, |s| s.rsi),
                    line("stoch_k", snapshots, |s| s.stoch_rsi_k),
                    line("stoch_d", snapshots, |s| s.stoch_rsi_d),
                ],
            },
            RenderPanel {
                label: "macd".to_string(),
                series: vec![
                    line("macd", snapshots, |s| s.macd),
                    line("signal", snapshots, |s| s.macd_signal),
                    line("histogram", snapshots, |s| s.macd_histogram),
                ],
            },
            RenderPanel {
                label: "adx".to_string(),
                series: vec![
                    line("adx", snapshots, |s| s.adx),
                    line("plus_di", snapshots, |s| s.plus_di),
                    line("minus_di", snapshots, |s| s.minus_di),
                ],
            },
            RenderPanel {
                label: "two_pole".to_string(),
                series: vec![
                    line("osc", snapshots, |s| s.two_pole),
                    line("lagged", snapshots, |s| s.two_pole_lagged),
                ],
            },
            RenderPanel {
                label: "volume_flow".to_string(),
                series: vec![
                    line("obv", snapshots, |s| s.obv),
                    line("mfi", snapshots, |s| s.mfi),
                ],
            },
        ];

        // Only pivots inside the visible window become markers
        let markers = structure
            .pivots
            .iter()
            .filter(|pivot| pivot.timestamp >= span.0 && pivot.timestamp <= span.1)
            .map(|pivot| RenderMarker {
                timestamp: pivot.timestamp,
                price: pivot.price,
                kind: match pivot.kind {
                    PivotKind::High => MarkerKind::PivotHigh,
                    PivotKind::Low => MarkerKind::PivotLow,
                },
            })
            .collect();

        Self {
            candles,
            lines,
            bands,
            panels,
            markers,
        }
    }
}
