// Ordered candle ingestion
pub mod queue;

pub use queue::{CandleSink, IngestObserver, IngestQueue, QueueStats};
