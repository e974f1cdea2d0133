//! Core data structures: series, analysis options and analysed series.

mod analyzed;
mod compare;
mod options;
mod series;

pub use analyzed::{AnalyzedSeries, ChangePoint, ChangePointGroup};
pub use compare::{compare, SeriesComparison};
pub use options::AnalysisOptions;
pub use series::{present_values, Direction, Metric, Series, SeriesBuilder};
