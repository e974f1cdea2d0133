//! Comparison of two analysed series.

use super::analyzed::AnalyzedSeries;
use super::series::Direction;
use crate::changepoint::{compare_samples, ComparativeStats};
use crate::error::{HunterError, Result};
use tracing::warn;

/// Per-metric comparison of two stable ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesComparison {
    /// (metric, stats, direction) in the metric order of the first series
    stats: Vec<(String, ComparativeStats, Direction)>,
    max_pvalue: f64,
}

impl SeriesComparison {
    /// Statistics of one metric.
    pub fn get(&self, metric: &str) -> Option<&ComparativeStats> {
        self.stats
            .iter()
            .find(|(name, _, _)| name == metric)
            .map(|(_, stats, _)| stats)
    }

    /// Compared metrics with their statistics.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComparativeStats)> {
        self.stats.iter().map(|(name, stats, _)| (name.as_str(), stats))
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.stats.iter().map(|(name, _, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Metrics that moved the wrong way with a p-value at or below the
    /// threshold of the first series.
    pub fn regressions(&self) -> Vec<(String, ComparativeStats)> {
        self.stats
            .iter()
            .filter(|(_, stats, direction)| {
                let sign = f64::from(direction.sign());
                stats.mean_2 * sign < stats.mean_1 * sign && stats.pvalue <= self.max_pvalue
            })
            .map(|(name, stats, _)| (name.clone(), *stats))
            .collect()
    }
}

/// Compare the stable range around `point_a` in `a` with the one around
/// `point_b` in `b`.
///
/// `None` selects the last stable range. Only metrics present in both series
/// are compared, and only their present values. Metrics without values on
/// either side are skipped.
///
/// # Errors
/// `IndexOutOfBounds` if a point lies beyond the end of its series.
pub fn compare(
    a: &AnalyzedSeries,
    point_a: Option<usize>,
    b: &AnalyzedSeries,
    point_b: Option<usize>,
) -> Result<SeriesComparison> {
    let index_a = point_a.unwrap_or(a.series().len());
    let index_b = point_b.unwrap_or(b.series().len());
    for (index, series) in [(index_a, a), (index_b, b)] {
        if index > series.series().len() {
            return Err(HunterError::IndexOutOfBounds {
                index,
                size: series.series().len(),
            });
        }
    }

    let mut stats = Vec::new();
    for (name, metric) in a.series().metrics() {
        if !b.series().has_metric(name) {
            continue;
        }

        let sample_a = stable_values(a, name, index_a)?;
        let sample_b = stable_values(b, name, index_b)?;
        if sample_a.is_empty() || sample_b.is_empty() {
            warn!(metric = name, "no values to compare, skipping metric");
            continue;
        }

        stats.push((
            name.to_string(),
            compare_samples(&sample_a, &sample_b)?,
            metric.direction,
        ));
    }

    Ok(SeriesComparison {
        stats,
        max_pvalue: a.options().max_pvalue,
    })
}

/// Present values of the stable range of `metric` around `index`.
fn stable_values(series: &AnalyzedSeries, metric: &str, index: usize) -> Result<Vec<f64>> {
    let (start, end) = series.get_stable_range(metric, index)?;
    let values = series
        .series()
        .values(metric)
        .ok_or_else(|| HunterError::UnknownMetric(metric.to_string()))?;
    Ok(values[start..end].iter().flatten().copied().collect())
}
