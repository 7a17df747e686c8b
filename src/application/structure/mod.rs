// Price structure derived from confirmed pivots
pub mod analyzer;
pub mod fibonacci;
pub mod levels;
pub mod pivots;
pub mod trendline;

pub use analyzer::{StructureAnalyzer, StructureSnapshot};
pub use pivots::{Pivot, PivotKind};
