// Market data processing
pub mod aggregator;
pub mod pipeline;
pub mod render;
