use crate::application::structure::pivots::{Pivot, PivotKind};
use serde::{Deserialize, Serialize};

/// Ratios inside the swing range
pub const RETRACEMENT_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
/// Ratios projected beyond the swing range
pub const EXTENSION_RATIOS: [f64; 2] = [1.272, 1.618];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SwingDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Fibonacci retracement and extension set for one swing.
///
/// Built from the two most recent opposing pivots; the more recent pivot
/// ends the swing and fixes its direction. Ratio 0 sits at the swing end,
/// ratio 1 at the swing start, extensions continue past the start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibSwing {
    pub direction: SwingDirection,
    pub start: Pivot,
    pub end: Pivot,
    pub levels: Vec<FibLevel>,
}

impl FibSwing {
    /// Derive the swing from a pivot history, oldest first.
    ///
    /// Returns `None` when no opposing pivot pair exists yet or the swing
    /// range is degenerate (zero height); callers retain their previous
    /// swing in that case.
    pub fn from_pivots(pivots: &[Pivot]) -> Option<Self> {
        let end = *pivots.last()?;
        let start = *pivots
            .iter()
            .rev()
            .find(|pivot| pivot.kind != end.kind)?;

        let range = end.price - start.price;
        if range == 0.0 {
            return None;
        }

        let direction = match end.kind {
            PivotKind::High => SwingDirection::Up,
            PivotKind::Low => SwingDirection::Down,
        };

        let levels = RETRACEMENT_RATIOS
            .iter()
            .chain(EXTENSION_RATIOS.iter())
            .map(|&ratio| FibLevel {
                ratio,
                price: end.price - ratio * range,
            })
            .collect();

        Some(Self {
            direction,
            start,
            end,
            levels,
        })
    }

    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-9)
            .map(|l| l.price)
    }
}
