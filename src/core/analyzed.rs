//! Analysed series and incremental re-analysis.

use super::options::AnalysisOptions;
use super::series::{present_values, Series};
use crate::changepoint::{detect, redetect, ComparativeStats, Detection, Split, WindowConfig};
use crate::error::{HunterError, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A change point in a single metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePoint {
    /// Index of the first observation after the change
    pub index: usize,
    pub time: DateTime<Utc>,
    pub metric: String,
    /// Comparison of the stable ranges on either side
    pub stats: ComparativeStats,
}

impl ChangePoint {
    pub fn forward_change_percent(&self) -> f64 {
        self.stats.forward_change_percent()
    }

    pub fn magnitude(&self) -> f64 {
        self.stats.magnitude()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "metric": self.metric,
            "forward_change_percent": self.forward_change_percent(),
            "magnitude": self.magnitude(),
            "mean_1": self.stats.mean_1,
            "mean_2": self.stats.mean_2,
            "std_1": self.stats.std_1,
            "std_2": self.stats.std_2,
            "pvalue": self.stats.pvalue,
        })
    }
}

/// Change points of several metrics at the same observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePointGroup {
    pub index: usize,
    pub time: DateTime<Utc>,
    /// Time of the observation before the change
    pub prev_time: DateTime<Utc>,
    pub attributes: BTreeMap<String, String>,
    /// Attributes of the observation before the change
    pub prev_attributes: BTreeMap<String, String>,
    /// Changes in metric order
    pub changes: Vec<ChangePoint>,
}

impl ChangePointGroup {
    pub fn to_json(&self) -> Value {
        json!({
            "index": self.index,
            "time": self.time.timestamp(),
            "attributes": self.attributes,
            "changes": self.changes.iter().map(ChangePoint::to_json).collect::<Vec<_>>(),
        })
    }
}

/// A series together with the change points found in each of its metrics.
///
/// Missing values are skipped: each metric is analysed on its present values
/// and the results are placed back on the shared time axis. The split state
/// of every metric is kept so that appending new observations only re-splits
/// the tail of each metric.
#[derive(Debug, Clone)]
pub struct AnalyzedSeries {
    series: Series,
    options: AnalysisOptions,
    change_points: HashMap<String, Vec<ChangePoint>>,
    /// Weak change points and resume point per metric, on the time axis
    splits: HashMap<String, Split>,
    groups: Vec<ChangePointGroup>,
}

impl AnalyzedSeries {
    /// Analyse `series` with `options`.
    pub fn new(series: Series, options: AnalysisOptions) -> Result<Self> {
        options.validate()?;
        info!(
            test = series.test_name(),
            metrics = series.metric_names().count(),
            points = series.len(),
            "analyzing series"
        );

        let config = options.window_config();
        let mut detections = HashMap::new();
        for name in series.metric_names() {
            let (positions, values) = present_values(series.values(name).unwrap_or(&[]));
            let detection = if values.is_empty() {
                Detection::default()
            } else {
                detect(&values, &config, &mut metric_rng(&options))?
                    .map_indices(|i| positions[i])
            };
            debug!(
                metric = name,
                weak = detection.weak.len(),
                accepted = detection.change_points.len(),
                "metric analyzed"
            );
            detections.insert(name.to_string(), detection);
        }

        Ok(Self::from_detections(series, options, detections))
    }

    fn from_detections(
        series: Series,
        options: AnalysisOptions,
        detections: HashMap<String, Detection>,
    ) -> Self {
        let mut change_points = HashMap::with_capacity(detections.len());
        let mut splits = HashMap::with_capacity(detections.len());
        for (name, detection) in detections {
            let points = detection
                .change_points
                .iter()
                .map(|&(index, stats)| ChangePoint {
                    index,
                    time: series.time()[index],
                    metric: name.clone(),
                    stats,
                })
                .collect();
            change_points.insert(name.clone(), points);
            splits.insert(
                name,
                Split {
                    weak: detection.weak,
                    resume_point: detection.resume_point,
                },
            );
        }

        let groups = group_by_time(&series, &change_points);
        Self {
            series,
            options,
            change_points,
            splits,
            groups,
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn test_name(&self) -> &str {
        self.series.test_name()
    }

    /// Change points of one metric, ascending by index.
    pub fn change_points(&self, metric: &str) -> &[ChangePoint] {
        self.change_points.get(metric).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Change points of every metric, in metric order.
    pub fn change_points_by_metric(&self) -> impl Iterator<Item = (&str, &[ChangePoint])> {
        self.series
            .metric_names()
            .map(move |name| (name, self.change_points(name)))
    }

    /// Change points grouped by observation, ascending by index.
    pub fn change_points_by_time(&self) -> &[ChangePointGroup] {
        &self.groups
    }

    /// Weak change points of one metric from the split phase.
    pub fn weak_change_points(&self, metric: &str) -> &[usize] {
        self.splits
            .get(metric)
            .map(|split| split.weak.as_slice())
            .unwrap_or(&[])
    }

    /// Range `[start, end)` around `index` that contains no change point of `metric`.
    ///
    /// `index` may equal the series length, which selects the last range.
    pub fn get_stable_range(&self, metric: &str, index: usize) -> Result<(usize, usize)> {
        if !self.series.has_metric(metric) {
            return Err(HunterError::UnknownMetric(metric.to_string()));
        }
        let n = self.series.len();
        if index > n {
            return Err(HunterError::IndexOutOfBounds { index, size: n });
        }

        let points = self.change_points(metric);
        let start = points
            .iter()
            .rev()
            .map(|cp| cp.index)
            .find(|&i| i <= index)
            .unwrap_or(0);
        let end = points
            .iter()
            .map(|cp| cp.index)
            .find(|&i| i > index)
            .unwrap_or(n);
        Ok((start, end))
    }

    /// Append observations and update the change points.
    ///
    /// Nothing is modified when the input is rejected.
    pub fn append(
        &mut self,
        time: &[DateTime<Utc>],
        new_data: &HashMap<String, Vec<f64>>,
        attributes: &HashMap<String, Vec<String>>,
    ) -> Result<()> {
        *self = self.appended(time, new_data, attributes)?;
        Ok(())
    }

    /// Copy of this analysis with observations appended.
    ///
    /// Each metric is re-split from the start of its last split window only;
    /// earlier weak change points are kept and all of them are merged again
    /// against the new data. A metric without new values keeps its change
    /// points unchanged.
    pub fn appended(
        &self,
        time: &[DateTime<Utc>],
        new_data: &HashMap<String, Vec<f64>>,
        attributes: &HashMap<String, Vec<String>>,
    ) -> Result<Self> {
        self.validate_append(time, new_data, attributes)?;

        let series = self.series.extended(time, new_data, attributes);
        let config = self.options.window_config();

        let mut detections = HashMap::new();
        for name in series.metric_names() {
            let detection = if new_data.contains_key(name) {
                self.redetect_metric(&series, name, &config)?
            } else {
                self.detection(name)
            };
            debug!(
                metric = name,
                appended = time.len(),
                accepted = detection.change_points.len(),
                "metric re-analyzed"
            );
            detections.insert(name.to_string(), detection);
        }

        Ok(Self::from_detections(series, self.options.clone(), detections))
    }

    fn redetect_metric(
        &self,
        series: &Series,
        name: &str,
        config: &WindowConfig,
    ) -> Result<Detection> {
        let (positions, values) = present_values(series.values(name).unwrap_or(&[]));
        if values.is_empty() {
            return Ok(Detection::default());
        }

        // Earlier positions are unchanged, so each old index maps to the
        // first present value at or after it.
        let to_present = |i: usize| positions.partition_point(|&p| p < i);
        let previous = self.splits.get(name).map_or_else(Split::default, |split| Split {
            weak: split.weak.iter().map(|&i| to_present(i)).collect(),
            resume_point: to_present(split.resume_point),
        });

        Ok(redetect(&values, &previous, config, &mut metric_rng(&self.options))?
            .map_indices(|i| positions[i]))
    }

    /// Current detection of one metric, on the time axis.
    fn detection(&self, name: &str) -> Detection {
        let split = self.splits.get(name).cloned().unwrap_or_default();
        Detection {
            change_points: self
                .change_points(name)
                .iter()
                .map(|cp| (cp.index, cp.stats))
                .collect(),
            weak: split.weak,
            resume_point: split.resume_point,
        }
    }

    /// Whether [`append`](Self::append) would accept these observations.
    pub fn can_append(
        &self,
        time: &[DateTime<Utc>],
        new_data: &HashMap<String, Vec<f64>>,
        attributes: &HashMap<String, Vec<String>>,
    ) -> bool {
        self.validate_append(time, new_data, attributes).is_ok()
    }

    /// Check observations for [`append`](Self::append) without applying them.
    pub fn validate_append(
        &self,
        time: &[DateTime<Utc>],
        new_data: &HashMap<String, Vec<f64>>,
        attributes: &HashMap<String, Vec<String>>,
    ) -> Result<()> {
        self.check_consistency()?;

        if time.is_empty() {
            return Err(HunterError::InvalidInput("no timestamps to append".to_string()));
        }
        if new_data.is_empty() {
            return Err(HunterError::InvalidInput("no metric values to append".to_string()));
        }

        for name in new_data.keys() {
            if !self.series.has_metric(name) {
                return Err(HunterError::UnknownMetric(name.clone()));
            }
        }
        for name in attributes.keys() {
            if !self.series.has_attribute(name) {
                return Err(HunterError::UnknownAttribute(name.clone()));
            }
        }

        let lengths = new_data
            .iter()
            .map(|(name, values)| (name, values.len()))
            .chain(attributes.iter().map(|(name, values)| (name, values.len())));
        for (name, got) in lengths {
            if got != time.len() {
                return Err(HunterError::LengthMismatch {
                    name: name.clone(),
                    expected: time.len(),
                    got,
                });
            }
        }

        if time.windows(2).any(|w| w[1] <= w[0]) {
            return Err(HunterError::TimestampError(
                "appended timestamps must be strictly increasing".to_string(),
            ));
        }
        if let Some(last) = self.series.time().last() {
            if time[0] <= *last {
                return Err(HunterError::TimestampError(format!(
                    "appended timestamp {} is not after the last timestamp {}",
                    time[0], last
                )));
            }
        }

        for (name, values) in new_data {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(HunterError::InvalidInput(format!(
                    "metric '{name}' contains non-finite values"
                )));
            }
        }

        Ok(())
    }

    /// Change point bookkeeping must cover every metric and lie inside the series.
    fn check_consistency(&self) -> Result<()> {
        let n = self.series.len();
        for name in self.series.metric_names() {
            let points = self.change_points.get(name).ok_or_else(|| {
                HunterError::CorruptedState(format!("no change points recorded for '{name}'"))
            })?;
            let split = self.splits.get(name).ok_or_else(|| {
                HunterError::CorruptedState(format!("no weak change points recorded for '{name}'"))
            })?;
            let weak = &split.weak;
            let out_of_range = weak.iter().any(|&i| i >= n) || (n > 0 && split.resume_point >= n);
            if weak.windows(2).any(|w| w[1] <= w[0]) || out_of_range {
                return Err(HunterError::CorruptedState(format!(
                    "weak change points of '{name}' are out of order or out of range"
                )));
            }
            if points.iter().any(|cp| cp.index >= n) {
                return Err(HunterError::CorruptedState(format!(
                    "change point of '{name}' beyond the series end"
                )));
            }
        }
        Ok(())
    }

    /// JSON document with the test name and all change point groups.
    pub fn to_json(&self) -> Value {
        json!({
            "test_name": self.test_name(),
            "change_points": self.groups.iter().map(ChangePointGroup::to_json).collect::<Vec<_>>(),
        })
    }
}

fn metric_rng(options: &AnalysisOptions) -> StdRng {
    match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn group_by_time(
    series: &Series,
    change_points: &HashMap<String, Vec<ChangePoint>>,
) -> Vec<ChangePointGroup> {
    let mut by_index: BTreeMap<usize, Vec<ChangePoint>> = BTreeMap::new();
    for name in series.metric_names() {
        for cp in change_points.get(name).into_iter().flatten() {
            by_index.entry(cp.index).or_default().push(cp.clone());
        }
    }

    by_index
        .into_iter()
        .map(|(index, changes)| {
            let prev = index.saturating_sub(1);
            ChangePointGroup {
                index,
                time: series.time()[index],
                prev_time: series.time()[prev],
                attributes: series.attributes_at(index),
                prev_attributes: series.attributes_at(prev),
                changes,
            }
        })
        .collect()
}
