//! # anofox-changepoint
//!
//! Change point detection for performance-metric histories.
//!
//! Finds the points at which benchmark results shift (regressions or
//! improvements) with the E-Divisive algorithm, keeps the analysis current as
//! new results arrive, compares stable ranges across series and renders
//! text and JSON reports.
//!
//! # Example
//!
//! ```
//! use anofox_changepoint::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! let time = (0..11).map(|i| Utc.timestamp_opt(i, 0).unwrap()).collect();
//! let series = SeriesBuilder::new("test")
//!     .time(time)
//!     .metric(
//!         "throughput",
//!         Metric::default(),
//!         vec![1.02, 0.95, 0.99, 1.00, 1.12, 0.90, 0.50, 0.51, 0.48, 0.48, 0.55],
//!     )
//!     .build()
//!     .unwrap();
//!
//! let analyzed = series.analyze(&AnalysisOptions::default()).unwrap();
//! let points = analyzed.change_points("throughput");
//! assert_eq!(points.len(), 1);
//! assert_eq!(points[0].index, 6);
//! ```

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::needless_range_loop)]

pub mod changepoint;
pub mod core;
pub mod error;
pub mod report;
pub mod utils;

pub use error::{HunterError, Result};

pub mod prelude {
    pub use crate::changepoint::ComparativeStats;
    pub use crate::core::{
        compare, AnalysisOptions, AnalyzedSeries, ChangePoint, ChangePointGroup, Direction, Metric,
        Series, SeriesBuilder, SeriesComparison,
    };
    pub use crate::error::{HunterError, Result};
    pub use crate::report::{ChangePointReport, RegressionsReport, ReportType};
}
