use serde::{Deserialize, Serialize};

/// One clustered support or resistance level.
///
/// `price` is the running mean of every pivot folded into the cluster,
/// `touches` how many pivots formed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrLevel {
    pub price: f64,
    pub touches: usize,
}

#[derive(Debug, Clone)]
struct Cluster {
    sum: f64,
    count: usize,
}

impl Cluster {
    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Percentage-tolerance running-mean clustering of pivot prices.
///
/// A price joins the nearest cluster whose running mean is within
/// `tolerance_pct` percent, shifting that mean; otherwise it seeds a new
/// cluster. The strongest `max_levels` clusters by touch count survive,
/// reported in ascending price order.
#[derive(Debug, Clone)]
pub struct SrClusters {
    tolerance_pct: f64,
    max_levels: usize,
    clusters: Vec<Cluster>,
}

impl SrClusters {
    pub fn new(tolerance_pct: f64, max_levels: usize) -> Self {
        Self {
            tolerance_pct,
            max_levels,
            clusters: Vec::new(),
        }
    }

    pub fn from_prices<I: IntoIterator<Item = f64>>(
        prices: I,
        tolerance_pct: f64,
        max_levels: usize,
    ) -> Self {
        let mut clusters = Self::new(tolerance_pct, max_levels);
        for price in prices {
            clusters.insert(price);
        }
        clusters
    }

    pub fn insert(&mut self, price: f64) {
        let nearest = self
            .clusters
            .iter_mut()
            .map(|cluster| {
                let mean = cluster.mean();
                ((price - mean).abs(), mean, cluster)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((distance, mean, cluster))
                if mean.abs() > 0.0 && distance / mean.abs() * 100.0 <= self.tolerance_pct =>
            {
                cluster.sum += price;
                cluster.count += 1;
            }
            _ => self.clusters.push(Cluster {
                sum: price,
                count: 1,
            }),
        }
    }

    /// Strongest clusters, truncated and sorted ascending by price
    pub fn levels(&self) -> Vec<SrLevel> {
        let mut ranked: Vec<SrLevel> = self
            .clusters
            .iter()
            .map(|cluster| SrLevel {
                price: cluster.mean(),
                touches: cluster.count,
            })
            .collect();
        ranked.sort_by(|a, b| b.touches.cmp(&a.touches));
        ranked.truncate(self.max_levels);
        ranked.sort_by(|a, b| a.price.total_cmp(&b.price));
        ranked
    }
}
