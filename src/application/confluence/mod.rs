// Cross-timeframe signal blending
pub mod scorer;

pub use scorer::{Bias, ConfluenceReport, ConfluenceScorer, Recommendation, TimeframeSignal};
