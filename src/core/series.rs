//! Multi-metric series of performance measurements.

use super::analyzed::AnalyzedSeries;
use super::options::AnalysisOptions;
use crate::error::{HunterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Which way a metric should move to be an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Larger values are better (throughput).
    #[default]
    HigherIsBetter,
    /// Smaller values are better (latency).
    LowerIsBetter,
}

impl Direction {
    /// Direction from a sign: negative means lower is better.
    pub fn from_sign(sign: i8) -> Self {
        if sign < 0 {
            Direction::LowerIsBetter
        } else {
            Direction::HigherIsBetter
        }
    }

    /// +1 for higher-is-better, -1 for lower-is-better.
    pub fn sign(&self) -> i8 {
        match self {
            Direction::HigherIsBetter => 1,
            Direction::LowerIsBetter => -1,
        }
    }
}

/// Metadata of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub direction: Direction,
    /// Multiplier applied when values are rendered
    pub scale: f64,
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            direction: Direction::HigherIsBetter,
            scale: 1.0,
        }
    }
}

impl Metric {
    pub fn new(direction: Direction, scale: f64) -> Self {
        Self { direction, scale }
    }
}

/// Measurements of one test: several metrics and attributes on a shared time axis.
///
/// Metrics and attributes keep the order they were added in.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    test_name: String,
    branch: Option<String>,
    time: Vec<DateTime<Utc>>,
    metrics: Vec<(String, Metric)>,
    /// values[metric][observation], aligned with `metrics`
    values: Vec<Vec<Option<f64>>>,
    attributes: Vec<(String, Vec<String>)>,
}

/// Builder for constructing a Series.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuilder {
    test_name: String,
    branch: Option<String>,
    time: Vec<DateTime<Utc>>,
    metrics: Vec<(String, Metric)>,
    values: Vec<(String, Vec<Option<f64>>)>,
    attributes: Vec<(String, Vec<String>)>,
}

impl SeriesBuilder {
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            ..Default::default()
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn time(mut self, time: Vec<DateTime<Utc>>) -> Self {
        self.time = time;
        self
    }

    /// Add a metric with all values present.
    pub fn metric(self, name: impl Into<String>, metric: Metric, values: Vec<f64>) -> Self {
        self.metric_with_gaps(name, metric, values.into_iter().map(Some).collect())
    }

    /// Add a metric where `None` marks a missing measurement.
    pub fn metric_with_gaps(
        mut self,
        name: impl Into<String>,
        metric: Metric,
        values: Vec<Option<f64>>,
    ) -> Self {
        let name = name.into();
        self.metrics.push((name.clone(), metric));
        self.values.push((name, values));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.push((name.into(), values));
        self
    }

    pub fn build(self) -> Result<Series> {
        Series::new(
            self.test_name,
            self.branch,
            self.time,
            self.metrics,
            self.values,
            self.attributes,
        )
    }
}

impl Series {
    /// Create a new Series.
    ///
    /// # Errors
    /// - `TimestampError` if `time` is not non-decreasing
    /// - `InvalidInput` for duplicate names, a metric without values or
    ///   non-finite values
    /// - `UnknownMetric` for values of a metric not listed in `metrics`
    /// - `LengthMismatch` if a metric or attribute does not match `time`
    pub fn new(
        test_name: impl Into<String>,
        branch: Option<String>,
        time: Vec<DateTime<Utc>>,
        metrics: Vec<(String, Metric)>,
        data: Vec<(String, Vec<Option<f64>>)>,
        attributes: Vec<(String, Vec<String>)>,
    ) -> Result<Self> {
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(HunterError::TimestampError(
                "timestamps must be non-decreasing".to_string(),
            ));
        }

        let n = time.len();
        let mut data: HashMap<String, Vec<Option<f64>>> = {
            let mut map = HashMap::with_capacity(data.len());
            for (name, values) in data {
                if map.insert(name.clone(), values).is_some() {
                    return Err(HunterError::InvalidInput(format!(
                        "duplicate values for metric '{name}'"
                    )));
                }
            }
            map
        };

        let mut values = Vec::with_capacity(metrics.len());
        for (i, (name, _)) in metrics.iter().enumerate() {
            if metrics[..i].iter().any(|(other, _)| other == name) {
                return Err(HunterError::InvalidInput(format!("duplicate metric '{name}'")));
            }
            let series = data.remove(name).ok_or_else(|| {
                HunterError::InvalidInput(format!("no values for metric '{name}'"))
            })?;
            if series.len() != n {
                return Err(HunterError::LengthMismatch {
                    name: name.clone(),
                    expected: n,
                    got: series.len(),
                });
            }
            if series.iter().flatten().any(|v| !v.is_finite()) {
                return Err(HunterError::InvalidInput(format!(
                    "metric '{name}' contains non-finite values"
                )));
            }
            values.push(series);
        }
        if let Some(name) = data.into_keys().next() {
            return Err(HunterError::UnknownMetric(name));
        }

        for (i, (name, column)) in attributes.iter().enumerate() {
            if attributes[..i].iter().any(|(other, _)| other == name) {
                return Err(HunterError::InvalidInput(format!("duplicate attribute '{name}'")));
            }
            if column.len() != n {
                return Err(HunterError::LengthMismatch {
                    name: name.clone(),
                    expected: n,
                    got: column.len(),
                });
            }
        }

        Ok(Self {
            test_name: test_name.into(),
            branch,
            time,
            metrics,
            values,
            attributes,
        })
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Metric names in insertion order.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|(name, _)| name.as_str())
    }

    /// Metrics with their metadata in insertion order.
    pub fn metrics(&self) -> impl Iterator<Item = (&str, &Metric)> {
        self.metrics.iter().map(|(name, metric)| (name.as_str(), metric))
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metric_position(name).map(|i| &self.metrics[i].1)
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.metric_position(name).is_some()
    }

    /// Raw values of a metric, `None` where the measurement is missing.
    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.metric_position(name).map(|i| self.values[i].as_slice())
    }

    /// Attribute names in insertion order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, column)| column.as_slice())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    /// Attribute values of observation `index`.
    pub fn attributes_at(&self, index: usize) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|(name, column)| column.get(index).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Analyse every metric for change points.
    ///
    /// The series itself is left untouched; the result owns a copy.
    pub fn analyze(&self, options: &AnalysisOptions) -> Result<AnalyzedSeries> {
        AnalyzedSeries::new(self.clone(), options.clone())
    }

    fn metric_position(&self, name: &str) -> Option<usize> {
        self.metrics.iter().position(|(n, _)| n == name)
    }

    /// Copy of the series with new observations appended.
    ///
    /// Metrics missing from `new_data` get `None`, attributes missing from
    /// `attributes` get an empty string. Inputs must already be validated.
    pub(crate) fn extended(
        &self,
        time: &[DateTime<Utc>],
        new_data: &HashMap<String, Vec<f64>>,
        attributes: &HashMap<String, Vec<String>>,
    ) -> Self {
        let mut extended = self.clone();
        extended.time.extend_from_slice(time);

        for ((name, _), column) in extended.metrics.iter().zip(extended.values.iter_mut()) {
            match new_data.get(name) {
                Some(values) => column.extend(values.iter().copied().map(Some)),
                None => column.extend(std::iter::repeat(None).take(time.len())),
            }
        }

        for (name, column) in extended.attributes.iter_mut() {
            match attributes.get(name) {
                Some(values) => column.extend(values.iter().cloned()),
                None => column.extend(std::iter::repeat(String::new()).take(time.len())),
            }
        }

        extended
    }
}

/// Present values of a metric and their positions on the time axis.
pub fn present_values(values: &[Option<f64>]) -> (Vec<usize>, Vec<f64>) {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn times(n: i64) -> Vec<DateTime<Utc>> {
        (0..n).map(ts).collect()
    }

    #[test]
    fn direction_sign_round_trip() {
        assert_eq!(Direction::from_sign(1), Direction::HigherIsBetter);
        assert_eq!(Direction::from_sign(-1), Direction::LowerIsBetter);
        assert_eq!(Direction::from_sign(0), Direction::HigherIsBetter);
        assert_eq!(Direction::LowerIsBetter.sign(), -1);
        assert_eq!(Direction::HigherIsBetter.sign(), 1);
    }

    #[test]
    fn metric_default() {
        let m = Metric::default();
        assert_eq!(m.direction, Direction::HigherIsBetter);
        assert_eq!(m.scale, 1.0);
    }

    #[test]
    fn builder_preserves_order() {
        let series = SeriesBuilder::new("test")
            .branch("main")
            .time(times(3))
            .metric("b", Metric::default(), vec![1.0, 2.0, 3.0])
            .metric("a", Metric::new(Direction::LowerIsBetter, 1e-3), vec![4.0, 5.0, 6.0])
            .attribute("commit", vec!["x".into(), "y".into(), "z".into()])
            .build()
            .unwrap();

        assert_eq!(series.test_name(), "test");
        assert_eq!(series.branch(), Some("main"));
        assert_eq!(series.len(), 3);
        assert_eq!(series.metric_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(series.metric("a").unwrap().direction, Direction::LowerIsBetter);
        assert_eq!(series.values("b").unwrap(), &[Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(series.attribute("commit").unwrap()[1], "y");
        assert_eq!(series.attributes_at(2).get("commit").map(String::as_str), Some("z"));
        assert!(series.values("missing").is_none());
    }

    #[test]
    fn new_rejects_bad_input() {
        let decreasing = vec![ts(2), ts(1)];
        let err = SeriesBuilder::new("t")
            .time(decreasing)
            .metric("m", Metric::default(), vec![1.0, 2.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, HunterError::TimestampError(_)));

        let err = SeriesBuilder::new("t")
            .time(times(3))
            .metric("m", Metric::default(), vec![1.0, 2.0])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            HunterError::LengthMismatch {
                name: "m".to_string(),
                expected: 3,
                got: 2
            }
        );

        let err = SeriesBuilder::new("t")
            .time(times(2))
            .metric("m", Metric::default(), vec![1.0, f64::NAN])
            .build()
            .unwrap_err();
        assert!(matches!(err, HunterError::InvalidInput(_)));

        let err = SeriesBuilder::new("t")
            .time(times(2))
            .attribute("commit", vec!["a".into()])
            .build()
            .unwrap_err();
        assert!(matches!(err, HunterError::LengthMismatch { .. }));
    }

    #[test]
    fn new_checks_metric_keys() {
        let err = Series::new(
            "t",
            None,
            times(1),
            vec![],
            vec![("m".to_string(), vec![Some(1.0)])],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, HunterError::UnknownMetric("m".to_string()));

        let err = Series::new(
            "t",
            None,
            times(1),
            vec![("m".to_string(), Metric::default())],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, HunterError::InvalidInput(_)));
    }

    #[test]
    fn equal_timestamps_are_allowed() {
        let series = SeriesBuilder::new("t")
            .time(vec![ts(1), ts(1), ts(2)])
            .metric("m", Metric::default(), vec![1.0, 2.0, 3.0])
            .build();
        assert!(series.is_ok());
    }

    #[test]
    fn present_values_skip_gaps() {
        let (positions, values) = present_values(&[None, Some(2.0), None, Some(4.0), None]);
        assert_eq!(positions, vec![1, 3]);
        assert_eq!(values, vec![2.0, 4.0]);
        let (positions, values) = present_values(&[None, None]);
        assert!(positions.is_empty() && values.is_empty());
    }

    #[test]
    fn extended_pads_missing_columns() {
        let series = SeriesBuilder::new("t")
            .time(times(2))
            .metric("a", Metric::default(), vec![1.0, 2.0])
            .metric("b", Metric::default(), vec![3.0, 4.0])
            .attribute("commit", vec!["x".into(), "y".into()])
            .build()
            .unwrap();

        let new_data = HashMap::from([("a".to_string(), vec![5.0])]);
        let extended = series.extended(&[ts(10)], &new_data, &HashMap::new());

        assert_eq!(extended.len(), 3);
        assert_eq!(extended.values("a").unwrap()[2], Some(5.0));
        assert_eq!(extended.values("b").unwrap()[2], None);
        assert_eq!(extended.attribute("commit").unwrap()[2], "");
        assert_eq!(series.len(), 2);
    }
}
