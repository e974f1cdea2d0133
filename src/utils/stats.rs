//! Statistical utility functions.
//!
//! All functions reject empty input with [`HunterError::EmptyData`] instead of
//! returning NaN, so callers never propagate a division by zero.

use crate::error::{HunterError, Result};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(HunterError::EmptyData);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Calculate the sample variance of a slice (n-1 denominator).
///
/// A single observation has no spread, so its variance is 0.
pub fn variance(values: &[f64]) -> Result<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Ok(sum_sq / (values.len() - 1) as f64)
}

/// Calculate the sample standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> Result<f64> {
    variance(values).map(f64::sqrt)
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(HunterError::EmptyData);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Ok(sorted[n / 2])
    }
}

/// Two-sided p-value of Student's t-test with pooled variance.
///
/// Takes summary statistics (sample standard deviations) rather than raw data.
/// Degenerate inputs never produce NaN:
/// - no degrees of freedom (two single observations) gives 1.0
/// - zero pooled standard error gives 1.0 for equal means and 0.0 otherwise
pub fn students_t_pvalue(
    mean_1: f64,
    std_1: f64,
    n_1: usize,
    mean_2: f64,
    std_2: f64,
    n_2: usize,
) -> f64 {
    if n_1 == 0 || n_2 == 0 || n_1 + n_2 <= 2 {
        return 1.0;
    }

    let df = (n_1 + n_2 - 2) as f64;
    let pooled_var =
        ((n_1 - 1) as f64 * std_1 * std_1 + (n_2 - 1) as f64 * std_2 * std_2) / df;
    let std_err = (pooled_var * (1.0 / n_1 as f64 + 1.0 / n_2 as f64)).sqrt();

    // Constant samples leave rounding noise in the variance.
    let tolerance = 1e-12 * mean_1.abs().max(mean_2.abs());
    let diff = (mean_1 - mean_2).abs();
    if std_err.is_nan() || std_err <= tolerance {
        return if diff <= tolerance { 1.0 } else { 0.0 };
    }

    let t = diff / std_err;
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), 3.0, epsilon = 1e-10);
        assert_relative_eq!(mean(&[10.0]).unwrap(), 10.0, epsilon = 1e-10);
        assert_eq!(mean(&[]), Err(HunterError::EmptyData));
    }

    #[test]
    fn variance_calculates_correctly() {
        // Sample variance of [1, 2, 3, 4, 5] = 2.5
        assert_relative_eq!(
            variance(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            2.5,
            epsilon = 1e-10
        );
        assert_relative_eq!(variance(&[1.0]).unwrap(), 0.0, epsilon = 1e-10);
        assert_eq!(variance(&[]), Err(HunterError::EmptyData));
    }

    #[test]
    fn std_dev_calculates_correctly() {
        assert_relative_eq!(
            std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            2.5_f64.sqrt(),
            epsilon = 1e-10
        );
        assert_relative_eq!(std_dev(&[7.0, 7.0, 7.0]).unwrap(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn median_calculates_correctly() {
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), 3.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5, epsilon = 1e-10);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap(), 3.0, epsilon = 1e-10);
        assert_eq!(median(&[]), Err(HunterError::EmptyData));
    }

    #[test]
    fn t_test_identical_samples_is_not_significant() {
        let p = students_t_pvalue(1.0, 0.1, 10, 1.0, 0.1, 10);
        assert_relative_eq!(p, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn t_test_known_value() {
        // mean diff 1, pooled sd 1, n = 6 each -> t = sqrt(3), df = 10, p ≈ 0.114
        let p = students_t_pvalue(0.0, 1.0, 6, 1.0, 1.0, 6);
        assert!(p > 0.1 && p < 0.13, "p = {p}");
    }

    #[test]
    fn t_test_clear_difference_is_significant() {
        let p = students_t_pvalue(1.0, 0.05, 6, 2.0, 0.05, 6);
        assert!(p < 1e-6);
    }

    #[test]
    fn t_test_two_single_points_is_uninformative() {
        assert_relative_eq!(students_t_pvalue(1.0, 0.0, 1, 5.0, 0.0, 1), 1.0);
    }

    #[test]
    fn t_test_constant_samples_do_not_produce_nan() {
        assert_relative_eq!(students_t_pvalue(0.0, 0.0, 3, 0.0, 0.0, 3), 1.0);
        assert_relative_eq!(students_t_pvalue(0.0, 0.0, 3, 1.0, 0.0, 3), 0.0);
        assert!(!students_t_pvalue(0.1, 1e-17, 10, 0.1, 1e-17, 7).is_nan());
    }

    #[test]
    fn t_test_singleton_against_sample() {
        // One observation close to the sample mean
        let p = students_t_pvalue(0.50, 0.0212, 5, 0.51, 0.0, 1);
        assert!(p > 0.5);
    }
}
