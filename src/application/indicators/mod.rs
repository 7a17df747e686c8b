// Incremental indicator families, one engine instance per resolution
pub mod engine;
pub mod moving_averages;
pub mod oscillators;
pub mod snapshot;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use engine::IndicatorEngine;
pub use snapshot::IndicatorSnapshot;
