//! Windowed split and merge around E-Divisive.
//!
//! Detection runs in two phases. The split phase runs E-Divisive over
//! overlapping windows with a relaxed threshold and collects "weak" change
//! points. The merge phase repeatedly drops the weakest of them until every
//! survivor is significant against its neighbours. Keeping the weak points
//! lets a grown series be re-split from its last window only.

use super::comparative::{change_point_stats, ComparativeStats};
use super::edivisive::{edivisive_detect_with_rng, EDivisiveConfig};
use crate::error::Result;
use rand::rngs::StdRng;

/// Configuration of the split and merge phases.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Half-width of the split windows; `None` analyses the series in one pass
    pub window_len: Option<usize>,
    /// E-Divisive settings for the split phase
    pub split: EDivisiveConfig,
    /// p-value a change point must meet to survive the merge phase
    pub max_pvalue: f64,
    /// Magnitude a change point must meet to survive the merge phase
    pub min_magnitude: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::t_test(None, 0.001, 0.0)
    }
}

impl WindowConfig {
    /// Split with a t-test at a relaxed threshold and merge at `max_pvalue`.
    pub fn t_test(window_len: Option<usize>, max_pvalue: f64, min_magnitude: f64) -> Self {
        Self {
            window_len,
            split: EDivisiveConfig::default().max_pvalue(first_pass_pvalue(max_pvalue)),
            max_pvalue,
            min_magnitude: min_magnitude.max(0.0),
        }
    }

    /// Split with a permutation test at `max_pvalue`; the merge phase only
    /// enforces the magnitude.
    pub fn permutation(
        window_len: Option<usize>,
        max_pvalue: f64,
        min_magnitude: f64,
        permutations: usize,
        seed: Option<u64>,
    ) -> Self {
        Self {
            window_len,
            split: EDivisiveConfig::original(permutations, seed).max_pvalue(max_pvalue),
            max_pvalue: 1.0,
            min_magnitude: min_magnitude.max(0.0),
        }
    }
}

/// Change points of one metric together with the weak points they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// Change points that survived merging, ascending, with their statistics
    pub change_points: Vec<(usize, ComparativeStats)>,
    /// All candidates found by the split phase, ascending
    pub weak: Vec<usize>,
    /// Start of the last split window
    pub resume_point: usize,
}

impl Detection {
    /// Indices of the surviving change points.
    pub fn indices(&self) -> Vec<usize> {
        self.change_points.iter().map(|&(i, _)| i).collect()
    }

    /// Same detection with every index passed through `f`.
    pub fn map_indices(self, f: impl Fn(usize) -> usize) -> Self {
        Self {
            change_points: self
                .change_points
                .into_iter()
                .map(|(i, stats)| (f(i), stats))
                .collect(),
            weak: self.weak.into_iter().map(&f).collect(),
            resume_point: f(self.resume_point),
        }
    }
}

/// Weak points of a split together with the start of its last window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub weak: Vec<usize>,
    pub resume_point: usize,
}

/// Threshold used by the split phase for a final threshold of `max_pvalue`.
///
/// Small thresholds are relaxed tenfold, moderate ones doubled.
pub fn first_pass_pvalue(max_pvalue: f64) -> f64 {
    if max_pvalue < 0.05 {
        max_pvalue * 10.0
    } else if max_pvalue < 0.5 {
        max_pvalue * 2.0
    } else {
        max_pvalue
    }
}

/// Run the split phase from `start`.
///
/// Windows span `2 * window_len` samples and advance by at least `window_len`,
/// restarting at the last point found when that lies further right. A window
/// length of zero is treated as one. Points in `keep` at or before `start`
/// are carried over unchanged.
///
/// Windows before the last one end inside the series, so a longer series
/// split from the returned resume point finds the same points as a split
/// from zero.
pub fn split(
    values: &[f64],
    window_len: Option<usize>,
    config: &EDivisiveConfig,
    start: usize,
    keep: &[usize],
    rng: &mut StdRng,
) -> Split {
    let n = values.len();
    let mut weak: Vec<usize> = keep.iter().copied().filter(|&i| i <= start).collect();

    let (width, stride) = match window_len {
        Some(w) => (2 * w.max(1), w.max(1)),
        None => (n, n),
    };

    let mut start = start;
    let mut resume_point = start;
    while start < n {
        resume_point = start;
        let end = (start + width).min(n);
        let found = edivisive_detect_with_rng(&values[start..end], config, rng);

        let mut last = 0;
        for index in found.changepoints.iter().map(|&i| i + start) {
            last = last.max(index);
            if !weak.contains(&index) {
                weak.push(index);
            }
        }

        if end == n {
            break;
        }
        start = last.max(start + stride);
    }

    weak.sort_unstable();
    Split { weak, resume_point }
}

/// Run the merge phase over `candidates`.
///
/// While some candidate has a p-value above `max_pvalue`, the first one with
/// the highest p-value is removed. Once all pass, the first one with the
/// lowest magnitude is removed while it is below `min_magnitude`. Statistics
/// are recomputed against the neighbouring survivors after every removal.
pub fn merge(
    candidates: &[usize],
    values: &[f64],
    max_pvalue: f64,
    min_magnitude: f64,
) -> Result<Vec<(usize, ComparativeStats)>> {
    let mut indices = candidates.to_vec();

    while !indices.is_empty() {
        let stats = indices
            .iter()
            .map(|&i| change_point_stats(i, values, &indices))
            .collect::<Result<Vec<_>>>()?;

        let mut weakest = 0;
        for (pos, s) in stats.iter().enumerate() {
            if s.pvalue > stats[weakest].pvalue {
                weakest = pos;
            }
        }

        if stats[weakest].pvalue <= max_pvalue {
            weakest = 0;
            for (pos, s) in stats.iter().enumerate() {
                if s.magnitude() < stats[weakest].magnitude() {
                    weakest = pos;
                }
            }
            if stats[weakest].magnitude() >= min_magnitude {
                return Ok(indices.into_iter().zip(stats).collect());
            }
        }

        indices.remove(weakest);
    }

    Ok(Vec::new())
}

/// Detect change points in `values` from scratch.
pub fn detect(values: &[f64], config: &WindowConfig, rng: &mut StdRng) -> Result<Detection> {
    let split = split(values, config.window_len, &config.split, 0, &[], rng);
    finish(values, split, config)
}

/// Detect change points after `values` grew past the end of `previous`.
///
/// Only the last window of the previous split is searched again, so with the
/// t-test the result equals [`detect`] on the grown series. The merge phase
/// always covers the whole series.
pub fn redetect(
    values: &[f64],
    previous: &Split,
    config: &WindowConfig,
    rng: &mut StdRng,
) -> Result<Detection> {
    let split = split(
        values,
        config.window_len,
        &config.split,
        previous.resume_point,
        &previous.weak,
        rng,
    );
    finish(values, split, config)
}

fn finish(values: &[f64], split: Split, config: &WindowConfig) -> Result<Detection> {
    let change_points = merge(&split.weak, values, config.max_pvalue, config.min_magnitude)?;
    Ok(Detection {
        change_points,
        weak: split.weak,
        resume_point: split.resume_point,
    })
}
