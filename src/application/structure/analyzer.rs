use crate::application::structure::fibonacci::FibSwing;
use crate::application::structure::levels::{SrClusters, SrLevel};
use crate::application::structure::pivots::{Pivot, PivotDetector, PivotKind};
use crate::application::structure::trendline::Trendline;
use crate::config::StructureConfig;
use crate::domain::market::candle::Candle;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Point-in-time structural view of one timeframe: confirmed pivots, the
/// active Fibonacci swing, clustered S/R levels and fitted trendlines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub pivots: Vec<Pivot>,
    pub fibonacci: Option<FibSwing>,
    pub support: Vec<SrLevel>,
    pub resistance: Vec<SrLevel>,
    pub high_trendline: Option<Trendline>,
    pub low_trendline: Option<Trendline>,
}

/// Incremental structural analysis over one candle series.
///
/// All derived state is recomputed only when a new pivot confirms; candles
/// that confirm nothing merely advance the detector window. A degenerate
/// swing keeps the previous Fibonacci set alive instead of clearing it.
pub struct StructureAnalyzer {
    config: StructureConfig,
    detector: PivotDetector,
    fibonacci: Option<FibSwing>,
    support: Vec<SrLevel>,
    resistance: Vec<SrLevel>,
    high_trendline: Option<Trendline>,
    low_trendline: Option<Trendline>,
}

impl StructureAnalyzer {
    pub fn new(config: &StructureConfig) -> Self {
        Self {
            config: config.clone(),
            detector: PivotDetector::new(config.pivot_left, config.pivot_right, config.pivot_horizon),
            fibonacci: None,
            support: Vec::new(),
            resistance: Vec::new(),
            high_trendline: None,
            low_trendline: None,
        }
    }

    pub fn on_candle(&mut self, candle: &Candle) {
        let confirmed = self.detector.on_candle(candle);
        if confirmed.is_empty() {
            return;
        }
        for pivot in &confirmed {
            debug!(
                "StructureAnalyzer: {:?} pivot confirmed at index {} price {}",
                pivot.kind, pivot.index, pivot.price
            );
        }
        self.recompute(&confirmed);
    }

    fn recompute(&mut self, confirmed: &[Pivot]) {
        let pivots = self.detector.pivots();

        // Degenerate or single-sided histories retain the previous swing
        if let Some(swing) = FibSwing::from_pivots(pivots) {
            self.fibonacci = Some(swing);
        }

        self.resistance = SrClusters::from_prices(
            pivots
                .iter()
                .filter(|p| p.kind == PivotKind::High)
                .map(|p| p.price),
            self.config.sr_tolerance_pct,
            self.config.sr_max_levels,
        )
        .levels();
        self.support = SrClusters::from_prices(
            pivots
                .iter()
                .filter(|p| p.kind == PivotKind::Low)
                .map(|p| p.price),
            self.config.sr_tolerance_pct,
            self.config.sr_max_levels,
        )
        .levels();

        let at_index = match self.detector.latest_index() {
            Some(index) => index,
            None => return,
        };
        for pivot in confirmed {
            let fitted = Trendline::fit(
                pivots,
                pivot.kind,
                self.config.trend_min_pivots,
                self.config.trend_lookback_pivots,
                at_index,
            );
            match pivot.kind {
                PivotKind::High => self.high_trendline = fitted.or(self.high_trendline),
                PivotKind::Low => self.low_trendline = fitted.or(self.low_trendline),
            }
        }
    }

    /// Defensive copy of the current structural state
    pub fn snapshot(&self) -> StructureSnapshot {
        StructureSnapshot {
            pivots: self.detector.pivots().to_vec(),
            fibonacci: self.fibonacci.clone(),
            support: self.support.clone(),
            resistance: self.resistance.clone(),
            high_trendline: self.high_trendline,
            low_trendline: self.low_trendline,
        }
    }
}
