//! Analysis options.

use crate::changepoint::WindowConfig;
use crate::error::{HunterError, Result};
use serde::{Deserialize, Serialize};

/// Options controlling change point analysis.
///
/// Deserialises from a partial document; missing fields take their defaults.
///
/// ```
/// use anofox_changepoint::core::AnalysisOptions;
///
/// let options: AnalysisOptions = serde_json::from_str(r#"{"max_pvalue": 0.01}"#).unwrap();
/// assert_eq!(options.max_pvalue, 0.01);
/// assert_eq!(options.window_len, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Half-width of the analysis windows; `None` analyses each metric in one pass
    pub window_len: Option<usize>,
    /// Largest p-value at which a change point is reported
    pub max_pvalue: f64,
    /// Smallest relative mean shift at which a change point is reported
    pub min_magnitude: f64,
    /// Use the original E-Divisive: raw energy statistic with a permutation test.
    ///
    /// When false no permutations are drawn: candidates are judged with a
    /// Student t-test, and `permutations` and `seed` are ignored.
    pub orig_edivisive: bool,
    /// Shuffles per candidate for the permutation test
    pub permutations: usize,
    /// Seed for the permutation test (None for OS entropy)
    pub seed: Option<u64>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            window_len: None,
            max_pvalue: 0.001,
            min_magnitude: 0.0,
            orig_edivisive: false,
            permutations: 100,
            seed: None,
        }
    }
}

impl AnalysisOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window half-width.
    pub fn with_window_len(mut self, window_len: usize) -> Self {
        self.window_len = Some(window_len);
        self
    }

    /// Set the p-value threshold.
    pub fn with_max_pvalue(mut self, max_pvalue: f64) -> Self {
        self.max_pvalue = max_pvalue;
        self
    }

    /// Set the minimum magnitude.
    pub fn with_min_magnitude(mut self, min_magnitude: f64) -> Self {
        self.min_magnitude = min_magnitude;
        self
    }

    /// Switch to the original permutation-based E-Divisive.
    pub fn with_orig_edivisive(mut self, orig_edivisive: bool) -> Self {
        self.orig_edivisive = orig_edivisive;
        self
    }

    /// Set the number of permutations.
    pub fn with_permutations(mut self, permutations: usize) -> Self {
        self.permutations = permutations;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that every option is in range.
    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.window_len {
            if w < 2 {
                return Err(HunterError::InvalidParameter(format!(
                    "window_len must be at least 2, got {w}"
                )));
            }
        }
        if !(self.max_pvalue > 0.0 && self.max_pvalue <= 1.0) {
            return Err(HunterError::InvalidParameter(format!(
                "max_pvalue must be in (0, 1], got {}",
                self.max_pvalue
            )));
        }
        if !self.min_magnitude.is_finite() || self.min_magnitude < 0.0 {
            return Err(HunterError::InvalidParameter(format!(
                "min_magnitude must be a non-negative number, got {}",
                self.min_magnitude
            )));
        }
        if self.permutations == 0 {
            return Err(HunterError::InvalidParameter(
                "permutations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Detection pipeline configuration for these options.
    pub fn window_config(&self) -> WindowConfig {
        if self.orig_edivisive {
            WindowConfig::permutation(
                self.window_len,
                self.max_pvalue,
                self.min_magnitude,
                self.permutations,
                self.seed,
            )
        } else {
            WindowConfig::t_test(self.window_len, self.max_pvalue, self.min_magnitude)
        }
    }
}
