//! Change point detection algorithms.
//!
//! Detects points at which the distribution of a series shifts.
//!
//! # Building blocks
//!
//! - **Divergence**: energy statistic over every split point, optionally on a
//!   running median of the values
//! - **E-Divisive**: recursive bisection at the split of maximal divergence
//! - **Window**: split over overlapping windows, then merge away weak points
//! - **Comparative**: mean, spread and t-test p-value on both sides of a split
//!
//! # Example
//!
//! ```
//! use anofox_changepoint::changepoint::{detect, WindowConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut series = vec![1.0, 1.1, 0.9, 1.0, 1.05, 0.95, 1.0, 1.1];
//! series.extend(vec![2.0, 2.1, 1.9, 2.0, 2.05, 1.95, 2.0, 2.1]);
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let detection = detect(&series, &WindowConfig::default(), &mut rng).unwrap();
//! assert_eq!(detection.indices(), vec![8]);
//! ```

pub mod comparative;
pub mod divergence;
pub mod edivisive;
pub mod window;

pub use comparative::{change_point_stats, compare_samples, ComparativeStats};
pub use divergence::{best_split, divergence_profile, median_filter, Divergence, MIN_SEGMENT_LEN};
pub use edivisive::{
    edivisive_detect, edivisive_detect_with_rng, AcceptedSplit, EDivisiveConfig, EDivisiveResult,
    SignificanceTest,
};
pub use window::{
    detect, first_pass_pvalue, merge, redetect, split, Detection, Split, WindowConfig,
};
