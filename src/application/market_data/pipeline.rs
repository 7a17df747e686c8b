use crate::application::confluence::{ConfluenceReport, ConfluenceScorer};
use crate::application::indicators::{IndicatorEngine, IndicatorSnapshot};
use crate::application::ingest::CandleSink;
use crate::application::market_data::aggregator::TimeframeAggregator;
use crate::application::market_data::render::RenderPacket;
use crate::application::structure::{StructureAnalyzer, StructureSnapshot};
use crate::config::PipelineConfig;
use crate::domain::market::candle::Candle;
use crate::domain::market::series::TimeframeSeries;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Everything the pipeline tracks for one timeframe
struct TimeframeState {
    series: TimeframeSeries,
    engine: IndicatorEngine,
    structure: StructureAnalyzer,
    // Aligned with the series ring: snapshot i describes candle i
    snapshots: VecDeque<IndicatorSnapshot>,
    capacity: usize,
}

impl TimeframeState {
    fn new(config: &PipelineConfig, timeframe: Timeframe) -> Self {
        let capacity = timeframe.series_capacity();
        Self {
            series: TimeframeSeries::new(capacity, config.min_ready),
            engine: IndicatorEngine::new(&config.indicators),
            structure: StructureAnalyzer::new(&config.structure),
            snapshots: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    fn on_candle(&mut self, candle: &Candle) {
        self.series.push(*candle);
        let snapshot = self.engine.on_candle_close(candle);
        self.snapshots.push_back(snapshot);
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.structure.on_candle(candle);
    }
}

/// Single-owner market data pipeline for one instrument.
///
/// Owns the aggregator and per-timeframe state; all mutation happens
/// through [`MarketPipeline::apply_candle`] on one thread of control. Every
/// query returns a value copy, so readers never hold a live reference into
/// the pipeline's internals.
pub struct MarketPipeline {
    config: PipelineConfig,
    aggregator: TimeframeAggregator,
    states: HashMap<Timeframe, TimeframeState>,
    scorer: ConfluenceScorer,
    candles_applied: u64,
}

impl MarketPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config
            .validate()
            .context("invalid pipeline configuration")?;

        let states = config
            .timeframes
            .iter()
            .map(|&timeframe| (timeframe, TimeframeState::new(&config, timeframe)))
            .collect();

        info!(
            "MarketPipeline: constructed with {} timeframes, min_ready {}",
            config.timeframes.len(),
            config.min_ready
        );

        Ok(Self {
            aggregator: TimeframeAggregator::new(config.timeframes.clone()),
            states,
            scorer: ConfluenceScorer::new(&config.confluence),
            candles_applied: 0,
            config,
        })
    }

    /// Fold one base-resolution candle through the aggregator and into
    /// every timeframe it finalizes.
    pub fn apply_candle(&mut self, candle: Candle) {
        self.candles_applied += 1;
        for (timeframe, finalized) in self.aggregator.ingest(&candle) {
            if let Some(state) = self.states.get_mut(&timeframe) {
                state.on_candle(&finalized);
            }
        }
    }

    /// Latest indicator snapshot for a timeframe, if any candle has closed
    pub fn snapshot(&self, timeframe: Timeframe) -> Option<IndicatorSnapshot> {
        let state = self.states.get(&timeframe)?;
        (state.engine.candles_seen() > 0).then(|| state.engine.snapshot())
    }

    /// The most recent `max_points` finalized candles of a timeframe
    pub fn series(&self, timeframe: Timeframe, max_points: usize) -> Vec<Candle> {
        self.states
            .get(&timeframe)
            .map(|state| state.series.latest(max_points))
            .unwrap_or_default()
    }

    /// Defensive copy of a timeframe's structural state
    pub fn structure(&self, timeframe: Timeframe) -> Option<StructureSnapshot> {
        self.states
            .get(&timeframe)
            .map(|state| state.structure.snapshot())
    }

    pub fn is_ready(&self, timeframe: Timeframe) -> bool {
        self.states
            .get(&timeframe)
            .map(|state| state.series.is_ready())
            .unwrap_or(false)
    }

    /// Blend every ready timeframe into one confluence report.
    ///
    /// Timeframes still warming up are excluded entirely rather than
    /// contributing half-formed signals.
    pub fn confluence_report(&self) -> ConfluenceReport {
        let mut ready: Vec<(Timeframe, IndicatorSnapshot)> = self
            .states
            .iter()
            .filter(|(_, state)| state.series.is_ready())
            .map(|(&timeframe, state)| (timeframe, state.engine.snapshot()))
            .collect();
        ready.sort_by_key(|(timeframe, _)| timeframe.interval_ms());
        self.scorer.score(&ready)
    }

    /// Chart-ready projection of the base timeframe, truncated to
    /// `max_points` candles
    pub fn render_packet(&self, max_points: usize) -> RenderPacket {
        match self.states.get(&Timeframe::OneMin) {
            Some(state) => {
                let candles: Vec<Candle> = state.series.iter().copied().collect();
                let snapshots: Vec<IndicatorSnapshot> =
                    state.snapshots.iter().copied().collect();
                RenderPacket::build(
                    &candles,
                    &snapshots,
                    &state.structure.snapshot(),
                    max_points,
                )
            }
            None => RenderPacket::build(&[], &[], &StructureSnapshot::default(), max_points),
        }
    }

    pub fn candles_applied(&self) -> u64 {
        self.candles_applied
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Shared handle wiring a [`MarketPipeline`] behind the ingest queue.
///
/// The queue's drain task is the only writer; readers take the lock
/// briefly and leave with value copies.
#[derive(Clone)]
pub struct PipelineHandle {
    inner: Arc<RwLock<MarketPipeline>>,
}

impl PipelineHandle {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(RwLock::new(MarketPipeline::new(config)?)),
        })
    }

    pub async fn snapshot(&self, timeframe: Timeframe) -> Option<IndicatorSnapshot> {
        self.inner.read().await.snapshot(timeframe)
    }

    pub async fn series(&self, timeframe: Timeframe, max_points: usize) -> Vec<Candle> {
        self.inner.read().await.series(timeframe, max_points)
    }

    pub async fn structure(&self, timeframe: Timeframe) -> Option<StructureSnapshot> {
        self.inner.read().await.structure(timeframe)
    }

    pub async fn confluence_report(&self) -> ConfluenceReport {
        self.inner.read().await.confluence_report()
    }

    pub async fn render_packet(&self, max_points: usize) -> RenderPacket {
        self.inner.read().await.render_packet(max_points)
    }

    pub async fn is_ready(&self, timeframe: Timeframe) -> bool {
        self.inner.read().await.is_ready(timeframe)
    }

    pub async fn candles_applied(&self) -> u64 {
        self.inner.read().await.candles_applied()
    }
}

#[async_trait::async_trait]
impl CandleSink for PipelineHandle {
    async fn on_candle(&self, candle: Candle) -> Result<()> {
        self.inner.write().await.apply_candle(candle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            timeframes: vec![Timeframe::OneMin, Timeframe::FiveMin],
            min_ready: 30,
            ..PipelineConfig::default()
        }
    }

    fn candle(i: i64, close: f64) -> Candle {
        Candle {
            timestamp: 1_704_067_200_000 + i * 60_000,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    fn wave(i: i64) -> Candle {
        candle(i, 100.0 + (i as f64 * 0.5).sin() * 4.0)
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let mut bad = config();
        bad.timeframes.clear();
        assert!(MarketPipeline::new(bad).is_err());
    }

    #[test]
    fn test_base_candles_flow_through() {
        let mut pipeline = MarketPipeline::new(config()).unwrap();
        for i in 0..10 {
            pipeline.apply_candle(wave(i));
        }

        assert_eq!(pipeline.series(Timeframe::OneMin, 100).len(), 10);
        assert!(pipeline.snapshot(Timeframe::OneMin).is_some());
        // The 5m bucket has not closed yet: one finalization needs tick 5
        assert_eq!(pipeline.series(Timeframe::FiveMin, 100).len(), 1);
    }

    #[test]
    fn test_readiness_gates_confluence() {
        let mut pipeline = MarketPipeline::new(config()).unwrap();
        for i in 0..10 {
            pipeline.apply_candle(wave(i));
        }
        // Nothing ready yet: empty neutral report
        assert!(pipeline.confluence_report().signals.is_empty());

        for i in 10..40 {
            pipeline.apply_candle(wave(i));
        }
        assert!(pipeline.is_ready(Timeframe::OneMin));
        let report = pipeline.confluence_report();
        assert_eq!(report.signals.len(), 1);
        assert_eq!(report.signals[0].timeframe, Timeframe::OneMin);
    }

    #[test]
    fn test_render_packet_alignment() {
        let mut pipeline = MarketPipeline::new(config()).unwrap();
        for i in 0..120 {
            pipeline.apply_candle(wave(i));
        }

        let packet = pipeline.render_packet(50);
        assert_eq!(packet.candles.len(), 50);
        let sma = packet
            .lines
            .iter()
            .find(|line| line.label == "sma_fast")
            .unwrap();
        // Every overlay point's timestamp belongs to a visible candle
        let first = packet.candles[0].timestamp;
        assert!(sma.points.iter().all(|p| p.timestamp >= first));
        assert!(!sma.points.is_empty());
    }

    #[tokio::test]
    async fn test_handle_is_a_candle_sink() {
        let handle = PipelineHandle::new(config()).unwrap();
        for i in 0..40 {
            handle.on_candle(wave(i)).await.unwrap();
        }

        assert_eq!(handle.candles_applied().await, 40);
        assert!(handle.is_ready(Timeframe::OneMin).await);
        assert!(handle.snapshot(Timeframe::OneMin).await.is_some());
    }
}
