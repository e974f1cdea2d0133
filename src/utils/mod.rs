//! Utility functions shared by the detection and comparison code.

pub mod stats;

pub use stats::{mean, median, std_dev, students_t_pvalue, variance};
