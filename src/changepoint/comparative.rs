//! Two-sample comparison statistics.
//!
//! Quantifies how far apart the segments on either side of a change point are,
//! both in relative terms (forward change) and statistically (t-test p-value).

use crate::error::Result;
use crate::utils::stats::{mean, std_dev, students_t_pvalue};
use serde::{Deserialize, Serialize};

/// Result of comparing two numeric samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparativeStats {
    /// Mean of the first (earlier) sample
    pub mean_1: f64,
    /// Mean of the second (later) sample
    pub mean_2: f64,
    /// Sample standard deviation of the first sample
    pub std_1: f64,
    /// Sample standard deviation of the second sample
    pub std_2: f64,
    /// Two-sided p-value of the difference in means
    pub pvalue: f64,
}

impl ComparativeStats {
    /// Relative change from the first to the second mean.
    ///
    /// Zero when the first mean is zero.
    pub fn forward_rel_change(&self) -> f64 {
        if self.mean_1 == 0.0 {
            return 0.0;
        }
        (self.mean_2 - self.mean_1) / self.mean_1.abs()
    }

    /// Relative change from the second to the first mean.
    ///
    /// Zero when the second mean is zero.
    pub fn backward_rel_change(&self) -> f64 {
        if self.mean_2 == 0.0 {
            return 0.0;
        }
        (self.mean_1 - self.mean_2) / self.mean_2.abs()
    }

    /// Forward relative change in percent.
    pub fn forward_change_percent(&self) -> f64 {
        self.forward_rel_change() * 100.0
    }

    /// Backward relative change in percent.
    pub fn backward_change_percent(&self) -> f64 {
        self.backward_rel_change() * 100.0
    }

    /// Size of the shift on a 0..1+ scale.
    pub fn magnitude(&self) -> f64 {
        self.forward_change_percent().abs() / 100.0
    }
}

/// Compare two samples with Student's t-test.
///
/// Either sample may hold a single observation; the p-value then degenerates
/// to a conservative value instead of failing.
///
/// # Errors
/// Returns [`HunterError::EmptyData`](crate::HunterError::EmptyData) if either
/// sample is empty.
pub fn compare_samples(left: &[f64], right: &[f64]) -> Result<ComparativeStats> {
    let mean_1 = mean(left)?;
    let mean_2 = mean(right)?;
    let std_1 = std_dev(left)?;
    let std_2 = std_dev(right)?;
    let pvalue = students_t_pvalue(mean_1, std_1, left.len(), mean_2, std_2, right.len());

    Ok(ComparativeStats {
        mean_1,
        mean_2,
        std_1,
        std_2,
        pvalue,
    })
}

/// Statistics of a change point at `index`, compared against its neighbours.
///
/// `endpoints` holds the other change points (and optionally the series
/// bounds) in ascending order. The left sample starts at the closest endpoint
/// below `index`, the right sample ends at the closest endpoint above it.
pub fn change_point_stats(
    index: usize,
    values: &[f64],
    endpoints: &[usize],
) -> Result<ComparativeStats> {
    let left = endpoints
        .iter()
        .rev()
        .find(|&&e| e < index)
        .copied()
        .unwrap_or(0);
    let right = endpoints
        .iter()
        .find(|&&e| e > index)
        .copied()
        .unwrap_or(values.len())
        .min(values.len());

    compare_samples(&values[left..index.min(right)], &values[index.min(right)..right])
}
