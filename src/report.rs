//! Text and JSON reports of change points and regressions.

use crate::changepoint::ComparativeStats;
use crate::core::{ChangePointGroup, Series};
use crate::error::{HunterError, Result};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const COLUMN_GAP: usize = 2;

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportType {
    /// Human-readable text.
    #[default]
    Log,
    /// JSON document.
    Json,
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Log => write!(f, "log"),
            ReportType::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportType {
    type Err = HunterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "log" => Ok(ReportType::Log),
            "json" => Ok(ReportType::Json),
            other => Err(HunterError::InvalidParameter(format!(
                "unknown report type: {other}"
            ))),
        }
    }
}

/// Report of the change points of one series.
///
/// The log form is the full table of observations with a marker block
/// inserted above every change point row.
#[derive(Debug, Clone)]
pub struct ChangePointReport<'a> {
    series: &'a Series,
    change_points: &'a [ChangePointGroup],
}

impl<'a> ChangePointReport<'a> {
    pub fn new(series: &'a Series, change_points: &'a [ChangePointGroup]) -> Self {
        Self {
            series,
            change_points,
        }
    }

    pub fn produce_report(&self, test_name: &str, report_type: ReportType) -> Result<String> {
        match report_type {
            ReportType::Log => Ok(self.format_log_annotated()),
            ReportType::Json => self.format_json(test_name),
        }
    }

    /// Column names (time, attributes, metrics) and their cells.
    fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::new();
        columns.push(Column {
            name: "time".to_string(),
            header: "time".to_string(),
            cells: self
                .series
                .time()
                .iter()
                .map(|t| t.format(TIME_FORMAT).to_string())
                .collect(),
            numeric: false,
        });

        for name in self.series.attribute_names() {
            columns.push(Column {
                name: name.to_string(),
                header: name.to_string(),
                cells: self.series.attribute(name).unwrap_or_default().to_vec(),
                numeric: false,
            });
        }

        let names: Vec<String> = self.series.metric_names().map(str::to_string).collect();
        let headers = remove_common_prefix(&names, ".");
        for ((name, metric), header) in self.series.metrics().zip(headers) {
            let cells = self
                .series
                .values(name)
                .unwrap_or_default()
                .iter()
                .map(|v| v.map(|v| (v * metric.scale).to_string()).unwrap_or_default())
                .collect();
            columns.push(Column {
                name: name.to_string(),
                header,
                cells,
                numeric: true,
            });
        }

        columns
    }

    fn format_log_annotated(&self) -> String {
        let columns = self.columns();
        let widths: Vec<usize> = columns.iter().map(Column::width).collect();

        let mut lines = Vec::with_capacity(self.series.len() + 2 + 3 * self.change_points.len());
        lines.push(join_row(columns.iter().zip(&widths).map(|(c, &w)| c.align(&c.header, w))));
        lines.push(join_row(widths.iter().map(|&w| "-".repeat(w))));

        let mut pending = self.change_points.iter().peekable();
        for row in 0..self.series.len() {
            while let Some(group) = pending.next_if(|g| g.index <= row) {
                lines.extend(separator_block(group, &columns, &widths));
            }
            lines.push(join_row(
                columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, &w)| c.align(&c.cells[row], w)),
            ));
        }
        for group in pending {
            lines.extend(separator_block(group, &columns, &widths));
        }

        lines.join("\n")
    }

    fn format_json(&self, test_name: &str) -> Result<String> {
        let groups: Vec<Value> = self.change_points.iter().map(ChangePointGroup::to_json).collect();
        let mut document = Map::new();
        document.insert(test_name.to_string(), Value::Array(groups));
        Ok(serde_json::to_string(&document)?)
    }
}

/// Report of metrics that regressed between two series.
#[derive(Debug, Clone, Default)]
pub struct RegressionsReport {
    regressions: Vec<(String, ComparativeStats)>,
}

impl RegressionsReport {
    pub fn new(regressions: Vec<(String, ComparativeStats)>) -> Self {
        Self { regressions }
    }

    pub fn produce_report(&self, test_name: &str, report_type: ReportType) -> Result<String> {
        match report_type {
            ReportType::Log => Ok(self.format_log(test_name)),
            ReportType::Json => self.format_json(test_name),
        }
    }

    fn format_log(&self, test_name: &str) -> String {
        if self.regressions.is_empty() {
            return format!("{test_name}: OK");
        }

        let mut output = format!("{test_name}:");
        for (metric, stats) in &self.regressions {
            output.push_str(&format!(
                "\n    {:<16}: {:>8} --> {:>8} ({:+6.1}%)",
                metric,
                significant(stats.mean_1, 3),
                significant(stats.mean_2, 3),
                stats.forward_change_percent()
            ));
        }
        output
    }

    fn format_json(&self, test_name: &str) -> Result<String> {
        let entries = self
            .regressions
            .iter()
            .map(|(metric, stats)| -> Result<Value> {
                let mut entry = json!({
                    "metric": metric,
                    "forward_change_percent": stats.forward_change_percent(),
                });
                if let (Value::Object(entry), Value::Object(fields)) =
                    (&mut entry, serde_json::to_value(stats)?)
                {
                    entry.extend(fields);
                }
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut document = Map::new();
        document.insert(test_name.to_string(), Value::Array(entries));
        Ok(serde_json::to_string(&document)?)
    }
}

struct Column {
    name: String,
    header: String,
    cells: Vec<String>,
    numeric: bool,
}

impl Column {
    fn width(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.chars().count())
            .chain(std::iter::once(self.header.chars().count()))
            .max()
            .unwrap_or(0)
    }

    fn align(&self, text: &str, width: usize) -> String {
        if self.numeric {
            format!("{text:>width$}")
        } else {
            format!("{text:<width$}")
        }
    }
}

fn join_row(cells: impl Iterator<Item = String>) -> String {
    cells
        .collect::<Vec<_>>()
        .join(&" ".repeat(COLUMN_GAP))
        .trim_end()
        .to_string()
}

/// Dotted line, change percentages, dotted line.
fn separator_block(group: &ChangePointGroup, columns: &[Column], widths: &[usize]) -> [String; 3] {
    let mut separator = Vec::with_capacity(columns.len());
    let mut info = Vec::with_capacity(columns.len());
    for (column, &width) in columns.iter().zip(widths) {
        match group.changes.iter().find(|c| c.metric == column.name) {
            Some(change) => {
                separator.push("·".repeat(width));
                let percent = format!("{:+.1}%", change.forward_change_percent());
                info.push(format!("{percent:>width$}"));
            }
            None => {
                separator.push(" ".repeat(width));
                info.push(" ".repeat(width));
            }
        }
    }
    let separator = join_row(separator.into_iter());
    [separator.clone(), join_row(info.into_iter()), separator]
}

/// Strip the leading `sep`-delimited components shared by all names.
///
/// At least one component of every name is kept.
pub fn remove_common_prefix(names: &[String], sep: &str) -> Vec<String> {
    let split: Vec<Vec<&str>> = names.iter().map(|n| n.split(sep).collect()).collect();
    let min_len = split.iter().map(Vec::len).min().unwrap_or(0);

    let mut prefix_len = 0;
    while prefix_len + 1 < min_len && split.iter().all(|parts| parts[prefix_len] == split[0][prefix_len])
    {
        prefix_len += 1;
    }

    split.iter().map(|parts| parts[prefix_len..].join(sep)).collect()
}

/// Format with `digits` significant digits, keeping trailing zeros.
fn significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{:.*}", digits.saturating_sub(1), value);
    }
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= digits as i32 {
        format!("{:.*e}", digits.saturating_sub(1), value)
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        format!("{value:.decimals$}")
    }
}
