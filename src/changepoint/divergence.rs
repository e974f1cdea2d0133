//! Divergence statistics for E-Divisive.
//!
//! A divergence measures how differently the values before and after a split
//! point are distributed. Higher divergence indicates a better split.

use serde::{Deserialize, Serialize};

/// Smallest number of samples allowed on either side of a split.
pub const MIN_SEGMENT_LEN: usize = 2;

/// Divergence statistic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Divergence {
    /// Energy distance (E-statistic) on the raw values, as published for E-Divisive.
    Energy,
    /// Energy distance on a width-3 running median of the values.
    /// Isolated spikes are removed while level shifts keep their exact position.
    #[default]
    RobustEnergy,
}

/// Compute the divergence for every split point of `values`.
///
/// The returned vector has `values.len() + 1` entries; entry `tau` is the
/// divergence between `values[..tau]` and `values[tau..]`. Split points closer
/// than [`MIN_SEGMENT_LEN`] to either end are left at zero.
pub fn divergence_profile(values: &[f64], divergence: Divergence) -> Vec<f64> {
    match divergence {
        Divergence::Energy => energy_profile(values),
        Divergence::RobustEnergy => energy_profile(&median_filter(values)),
    }
}

/// Find the split point with the largest divergence.
///
/// Returns the first maximising index and its divergence, or `None` when the
/// series is too short to be split.
pub fn best_split(values: &[f64], divergence: Divergence) -> Option<(usize, f64)> {
    let n = values.len();
    if n < 2 * MIN_SEGMENT_LEN {
        return None;
    }

    let profile = divergence_profile(values, divergence);
    let mut best: Option<(usize, f64)> = None;
    for (tau, &q) in profile
        .iter()
        .enumerate()
        .take(n - MIN_SEGMENT_LEN + 1)
        .skip(MIN_SEGMENT_LEN)
    {
        if !q.is_finite() {
            continue;
        }
        match best {
            Some((_, best_q)) if q <= best_q => {}
            _ => best = Some((tau, q)),
        }
    }
    best
}

/// Energy statistic of Székely and Rizzo for every split point.
///
/// q(tau) = (m k / n) (2 B - A_L - A_R), where B is the mean absolute difference
/// across the split and A_L, A_R the mean pairwise absolute differences within
/// each side. Runs in O(n^2) using running sums of pairwise distances.
fn energy_profile(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut profile = vec![0.0; n + 1];
    if n < 2 * MIN_SEGMENT_LEN {
        return profile;
    }

    // Distances from each point to all points before / after it
    let mut dist_before = vec![0.0; n];
    let mut dist_after = vec![0.0; n];
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (values[i] - values[j]).abs();
            total += d;
            dist_after[i] += d;
            dist_before[j] += d;
        }
    }

    let n_f64 = n as f64;
    let mut within_left = 0.0;
    let mut within_right = total;
    for tau in 1..n {
        // Point tau-1 moves from the right side to the left side
        within_left += dist_before[tau - 1];
        within_right -= dist_after[tau - 1];

        if tau < MIN_SEGMENT_LEN || tau > n - MIN_SEGMENT_LEN {
            continue;
        }

        let m = tau as f64;
        let k = n_f64 - m;
        let between = total - within_left - within_right;

        let mean_between = between / (m * k);
        let mean_left = 2.0 * within_left / (m * (m - 1.0));
        let mean_right = 2.0 * within_right / (k * (k - 1.0));

        profile[tau] = (m * k / n_f64) * (2.0 * mean_between - mean_left - mean_right);
    }

    profile
}

/// Width-3 running median with the end points replicated.
pub fn median_filter(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 3 {
        return values.to_vec();
    }

    (0..n)
        .map(|i| {
            let a = values[i.saturating_sub(1)];
            let b = values[i];
            let c = values[(i + 1).min(n - 1)];
            median_of_three(a, b, c)
        })
        .collect()
}

fn median_of_three(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).min(a.min(b).max(c))
}
