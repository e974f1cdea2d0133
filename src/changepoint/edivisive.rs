//! E-Divisive hierarchical change point detection.
//!
//! Recursively splits the series at the point of maximal divergence for as long
//! as the split is statistically significant.
//!
//! # Example
//!
//! ```
//! use anofox_changepoint::changepoint::{edivisive_detect, EDivisiveConfig};
//!
//! let mut series = vec![1.0, 1.1, 0.9, 1.0, 1.05, 0.95];
//! series.extend(vec![2.0, 2.1, 1.9, 2.0, 2.05, 1.95]);
//!
//! let result = edivisive_detect(&series, &EDivisiveConfig::default().max_pvalue(0.01));
//! assert_eq!(result.changepoints, vec![6]);
//! ```

use super::comparative::compare_samples;
use super::divergence::{best_split, Divergence, MIN_SEGMENT_LEN};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::VecDeque;

/// How a candidate split is judged significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignificanceTest {
    /// Student's t-test between the two sides of the split.
    #[default]
    TTest,
    /// Empirical p-value from shuffling the interval.
    Permutation {
        /// Number of shuffles per candidate
        permutations: usize,
        /// Random seed for reproducibility (None for random).
        seed: Option<u64>,
    },
}

/// Configuration for E-Divisive detection.
#[derive(Debug, Clone)]
pub struct EDivisiveConfig {
    /// Divergence statistic used to locate candidates
    pub divergence: Divergence,
    /// Significance test applied to each candidate
    pub significance: SignificanceTest,
    /// Largest p-value at which a candidate is accepted
    pub max_pvalue: f64,
    /// Smallest relative mean shift at which a candidate is accepted
    pub min_magnitude: f64,
}

impl Default for EDivisiveConfig {
    fn default() -> Self {
        Self {
            divergence: Divergence::RobustEnergy,
            significance: SignificanceTest::TTest,
            max_pvalue: 0.001,
            min_magnitude: 0.0,
        }
    }
}

impl EDivisiveConfig {
    /// Configuration matching the published algorithm: raw energy statistic
    /// with a permutation test.
    pub fn original(permutations: usize, seed: Option<u64>) -> Self {
        Self {
            divergence: Divergence::Energy,
            significance: SignificanceTest::Permutation { permutations, seed },
            ..Default::default()
        }
    }

    /// Set the divergence statistic.
    pub fn divergence(mut self, divergence: Divergence) -> Self {
        self.divergence = divergence;
        self
    }

    /// Set the significance test.
    pub fn significance(mut self, significance: SignificanceTest) -> Self {
        self.significance = significance;
        self
    }

    /// Set the p-value threshold.
    pub fn max_pvalue(mut self, max_pvalue: f64) -> Self {
        self.max_pvalue = max_pvalue;
        self
    }

    /// Set the minimum magnitude.
    pub fn min_magnitude(mut self, min_magnitude: f64) -> Self {
        self.min_magnitude = min_magnitude.max(0.0);
        self
    }
}

/// A split accepted by E-Divisive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedSplit {
    /// Index of the first sample after the split
    pub index: usize,
    /// Start of the interval the split was found in
    pub interval_start: usize,
    /// End (exclusive) of the interval the split was found in
    pub interval_end: usize,
    /// Divergence at the split
    pub divergence: f64,
    /// Significance test p-value
    pub pvalue: f64,
}

/// Result of E-Divisive detection.
#[derive(Debug, Clone, Default)]
pub struct EDivisiveResult {
    /// Detected change point indices, ascending
    pub changepoints: Vec<usize>,
    /// Accepted splits in the order they were found
    pub splits: Vec<AcceptedSplit>,
}

/// Detect change points with E-Divisive.
///
/// # Arguments
/// * `series` - Input values, no missing entries
/// * `config` - E-Divisive configuration
///
/// # Returns
/// Ascending change point indices, each in `[MIN_SEGMENT_LEN, n - MIN_SEGMENT_LEN]`.
pub fn edivisive_detect(series: &[f64], config: &EDivisiveConfig) -> EDivisiveResult {
    let mut rng = match config.significance {
        SignificanceTest::Permutation { seed: Some(seed), .. } => StdRng::seed_from_u64(seed),
        SignificanceTest::Permutation { seed: None, .. } => StdRng::from_entropy(),
        // The t-test never draws from the generator
        SignificanceTest::TTest => StdRng::seed_from_u64(0),
    };
    edivisive_detect_with_rng(series, config, &mut rng)
}

/// Detect change points with E-Divisive drawing shuffles from `rng`.
///
/// Used when several windows of one series must share a random stream.
pub fn edivisive_detect_with_rng(
    series: &[f64],
    config: &EDivisiveConfig,
    rng: &mut StdRng,
) -> EDivisiveResult {
    let mut splits = Vec::new();
    let mut queue = VecDeque::from([(0, series.len())]);

    while let Some((start, end)) = queue.pop_front() {
        if end - start < 2 * MIN_SEGMENT_LEN {
            continue;
        }

        let interval = &series[start..end];
        let Some((tau, divergence)) = best_split(interval, config.divergence) else {
            continue;
        };

        let Ok(stats) = compare_samples(&interval[..tau], &interval[tau..]) else {
            continue;
        };

        let pvalue = match config.significance {
            SignificanceTest::TTest => stats.pvalue,
            SignificanceTest::Permutation { permutations, .. } => {
                permutation_pvalue(interval, divergence, config.divergence, permutations, rng)
            }
        };

        if pvalue <= config.max_pvalue && stats.magnitude() >= config.min_magnitude {
            let index = start + tau;
            splits.push(AcceptedSplit {
                index,
                interval_start: start,
                interval_end: end,
                divergence,
                pvalue,
            });
            queue.push_back((start, index));
            queue.push_back((index, end));
        }
    }

    let mut changepoints: Vec<usize> = splits.iter().map(|s| s.index).collect();
    changepoints.sort_unstable();

    EDivisiveResult {
        changepoints,
        splits,
    }
}

/// Fraction of shuffles whose best divergence meets or exceeds `observed`.
fn permutation_pvalue(
    interval: &[f64],
    observed: f64,
    divergence: Divergence,
    permutations: usize,
    rng: &mut StdRng,
) -> f64 {
    if permutations == 0 {
        return 1.0;
    }

    let mut shuffled = interval.to_vec();
    let mut exceeded = 0usize;
    for _ in 0..permutations {
        shuffled.shuffle(rng);
        let best = best_split(&shuffled, divergence).map_or(0.0, |b| b.1);
        if best >= observed {
            exceeded += 1;
        }
    }

    exceeded as f64 / permutations as f64
}
