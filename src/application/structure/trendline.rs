use crate::application::structure::pivots::{Pivot, PivotKind};
use serde::{Deserialize, Serialize};

/// Least-squares trendline through recent same-kind pivots.
///
/// `x` is the global candle index, `y` the pivot price. `value_at_fit` is
/// the line extrapolated to the candle index the fit was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    pub kind: PivotKind,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub value_at_fit: f64,
    pub pivots_used: usize,
}

impl Trendline {
    /// Line value extrapolated to an arbitrary candle index
    pub fn value_at(&self, index: u64) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    /// Fit over the most recent `lookback` pivots of `kind`.
    ///
    /// Returns `None` with fewer than `min_pivots` usable pivots, or when
    /// all pivots share one index (a vertical line has no regression).
    pub fn fit(
        pivots: &[Pivot],
        kind: PivotKind,
        min_pivots: usize,
        lookback: usize,
        at_index: u64,
    ) -> Option<Self> {
        let matching: Vec<&Pivot> = pivots.iter().filter(|p| p.kind == kind).collect();
        if matching.len() < min_pivots {
            return None;
        }
        let window = &matching[matching.len().saturating_sub(lookback)..];

        let n = window.len() as f64;
        let mean_x = window.iter().map(|p| p.index as f64).sum::<f64>() / n;
        let mean_y = window.iter().map(|p| p.price).sum::<f64>() / n;

        let mut ss_xx = 0.0;
        let mut ss_xy = 0.0;
        for pivot in window {
            let dx = pivot.index as f64 - mean_x;
            ss_xx += dx * dx;
            ss_xy += dx * (pivot.price - mean_y);
        }
        if ss_xx == 0.0 {
            return None;
        }

        let slope = ss_xy / ss_xx;
        let intercept = mean_y - slope * mean_x;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for pivot in window {
            let predicted = slope * pivot.index as f64 + intercept;
            ss_res += (pivot.price - predicted).powi(2);
            ss_tot += (pivot.price - mean_y).powi(2);
        }
        // A perfectly flat pivot set is a perfect horizontal fit
        let r_squared = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else {
            1.0
        };

        Some(Self {
            kind,
            slope,
            intercept,
            r_squared,
            value_at_fit: slope * at_index as f64 + intercept,
            pivots_used: window.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivot(index: u64, price: f64, kind: PivotKind) -> Pivot {
        Pivot {
            index,
            timestamp: index as i64 * 60_000,
            price,
            kind,
        }
    }

    #[test]
    fn test_perfect_line_has_unit_r_squared() {
        let pivots: Vec<Pivot> = (0..4)
            .map(|i| pivot(i * 10, 100.0 + i as f64 * 5.0, PivotKind::Low))
            .collect();

        let line = Trendline::fit(&pivots, PivotKind::Low, 3, 12, 40).unwrap();
        assert!((line.slope - 0.5).abs() < 1e-12);
        assert!((line.intercept - 100.0).abs() < 1e-12);
        assert!((line.r_squared - 1.0).abs() < 1e-12);
        assert!((line.value_at_fit - 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_pivots_is_none() {
        let pivots = [
            pivot(0, 100.0, PivotKind::High),
            pivot(10, 101.0, PivotKind::High),
            pivot(5, 90.0, PivotKind::Low),
        ];
        assert!(Trendline::fit(&pivots, PivotKind::High, 3, 12, 20).is_none());
    }

    #[test]
    fn test_lookback_bounds_the_window() {
        // Old outlier followed by a clean line; the lookback excludes it
        let mut pivots = vec![pivot(0, 500.0, PivotKind::High)];
        pivots.extend((1..5).map(|i| pivot(i * 10, 110.0, PivotKind::High)));

        let line = Trendline::fit(&pivots, PivotKind::High, 3, 4, 50).unwrap();
        assert_eq!(line.pivots_used, 4);
        assert!((line.slope).abs() < 1e-12);
        assert!((line.value_at_fit - 110.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_fit_r_squared_below_one() {
        let pivots = [
            pivot(0, 100.0, PivotKind::Low),
            pivot(10, 108.0, PivotKind::Low),
            pivot(20, 102.0, PivotKind::Low),
            pivot(30, 112.0, PivotKind::Low),
        ];
        let line = Trendline::fit(&pivots, PivotKind::Low, 3, 12, 30).unwrap();
        assert!(line.r_squared < 1.0);
        assert!(line.r_squared > 0.0);
        assert!(line.slope > 0.0);
    }
}
