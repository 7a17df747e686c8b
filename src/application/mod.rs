// Application layer: ingestion, aggregation, analysis, scoring
pub mod confluence;
pub mod indicators;
pub mod ingest;
pub mod market_data;
pub mod structure;
