//! Property-based tests for change point analysis.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated metric histories.

use anofox_changepoint::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

/// Create a single-metric Series from a vector of values.
fn make_series(values: &[f64]) -> Series {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let time = (0..values.len())
        .map(|i| base + Duration::hours(i as i64))
        .collect();
    SeriesBuilder::new("prop")
        .time(time)
        .metric("metric", Metric::default(), values.to_vec())
        .build()
        .unwrap()
}

fn indices(analyzed: &AnalyzedSeries) -> Vec<usize> {
    analyzed.change_points("metric").iter().map(|cp| cp.index).collect()
}

/// Strategy for generating benchmark-like values.
fn values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..100.0_f64, min_len..max_len)
}

/// Strategy for generating a noisy series with one level shift.
fn shifted_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        (
            prop::collection::vec(-1.0..1.0_f64, len),
            2..len - 2,
            10.0..50.0_f64,
        )
            .prop_map(|(noise, at, shift)| {
                noise
                    .into_iter()
                    .enumerate()
                    .map(|(i, e)| 100.0 + e + if i >= at { shift } else { 0.0 })
                    .collect()
            })
    })
}

// =============================================================================
// Property: Analysis is deterministic
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn analysis_is_deterministic(values in values_strategy(4, 60)) {
        let series = make_series(&values);
        let options = AnalysisOptions::default();
        let a = series.analyze(&options).unwrap();
        let b = series.analyze(&options).unwrap();
        prop_assert_eq!(indices(&a), indices(&b));
        prop_assert_eq!(a.to_json(), b.to_json());
    }

    #[test]
    fn seeded_permutation_test_is_deterministic(values in values_strategy(4, 30)) {
        let series = make_series(&values);
        let options = AnalysisOptions::default()
            .with_orig_edivisive(true)
            .with_max_pvalue(0.05)
            .with_permutations(20)
            .with_seed(11);
        let a = series.analyze(&options).unwrap();
        let b = series.analyze(&options).unwrap();
        prop_assert_eq!(indices(&a), indices(&b));
    }
}

// =============================================================================
// Property: Change points are in range and increasing
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn change_points_in_range(values in shifted_values_strategy(8, 60)) {
        let n = values.len();
        let analyzed = make_series(&values).analyze(&AnalysisOptions::default()).unwrap();
        let found = indices(&analyzed);
        for &i in &found {
            prop_assert!((2..=n - 2).contains(&i), "index {} outside [2, {}]", i, n - 2);
        }
        for pair in found.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for group in analyzed.change_points_by_time().windows(2) {
            prop_assert!(group[0].index < group[1].index);
        }
    }

    #[test]
    fn windowed_change_points_in_range(
        values in shifted_values_strategy(8, 80),
        window in 2usize..20
    ) {
        let n = values.len();
        let options = AnalysisOptions::default().with_window_len(window);
        let analyzed = make_series(&values).analyze(&options).unwrap();
        let found = indices(&analyzed);
        for &i in &found {
            prop_assert!(i >= 1 && i < n);
        }
        for pair in found.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}

// =============================================================================
// Property: min_magnitude is a floor and is monotone
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn min_magnitude_is_monotone(
        values in shifted_values_strategy(8, 50),
        low in 0.0..0.2_f64,
        extra in 0.0..0.3_f64
    ) {
        let series = make_series(&values);
        let loose = series.analyze(&AnalysisOptions::default().with_min_magnitude(low)).unwrap();
        let strict = series
            .analyze(&AnalysisOptions::default().with_min_magnitude(low + extra))
            .unwrap();

        prop_assert!(indices(&strict).len() <= indices(&loose).len());
        for cp in strict.change_points("metric") {
            prop_assert!(cp.magnitude() >= low + extra);
        }
    }
}

// =============================================================================
// Property: Degenerate input analyses cleanly
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn constant_series_has_no_change_points(
        value in -1000.0..1000.0_f64,
        len in 2usize..60
    ) {
        let analyzed = make_series(&vec![value; len])
            .analyze(&AnalysisOptions::default())
            .unwrap();
        prop_assert!(indices(&analyzed).is_empty());
    }

    #[test]
    fn change_point_stats_are_finite(values in shifted_values_strategy(8, 50)) {
        let analyzed = make_series(&values).analyze(&AnalysisOptions::default()).unwrap();
        for cp in analyzed.change_points("metric") {
            prop_assert!(cp.stats.pvalue.is_finite());
            prop_assert!((0.0..=1.0).contains(&cp.stats.pvalue));
            prop_assert!(cp.stats.std_1.is_finite() && cp.stats.std_2.is_finite());
            prop_assert!(cp.forward_change_percent().is_finite());
        }
    }
}

// =============================================================================
// Property: can_append agrees with append
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn can_append_iff_append_succeeds(
        values in values_strategy(4, 30),
        new_values in prop::collection::vec(1.0..100.0_f64, 0..4),
        offset in -3i64..3,
        unknown_metric in any::<bool>()
    ) {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut analyzed = make_series(&values).analyze(&AnalysisOptions::default()).unwrap();

        let start = values.len() as i64 + offset;
        let time: Vec<_> = (0..new_values.len() as i64)
            .map(|i| base + Duration::hours(start + i))
            .collect();
        let name = if unknown_metric { "other" } else { "metric" };
        let new_data = HashMap::from([(name.to_string(), new_values)]);

        let can = analyzed.can_append(&time, &new_data, &HashMap::new());
        let did = analyzed.append(&time, &new_data, &HashMap::new()).is_ok();
        prop_assert_eq!(can, did);
    }

    #[test]
    fn append_extends_history(
        values in values_strategy(4, 30),
        new_values in prop::collection::vec(1.0..100.0_f64, 1..6)
    ) {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut analyzed = make_series(&values).analyze(&AnalysisOptions::default()).unwrap();
        let time: Vec<_> = (0..new_values.len())
            .map(|i| base + Duration::hours((values.len() + i) as i64))
            .collect();
        let added = new_values.len();
        let new_data = HashMap::from([("metric".to_string(), new_values)]);

        analyzed.append(&time, &new_data, &HashMap::new()).unwrap();
        prop_assert_eq!(analyzed.series().len(), values.len() + added);
        for cp in analyzed.change_points("metric") {
            prop_assert!(cp.index < values.len() + added);
        }
    }
}

// =============================================================================
// Property: Appending gives the same result as analysing from scratch
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn append_matches_fresh_analysis(
        values in shifted_values_strategy(10, 40),
        batches in prop::collection::vec(
            prop::collection::vec((-1.0..1.0_f64, any::<bool>()), 1..8),
            1..4
        ),
        window in prop::option::of(2usize..10)
    ) {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut options = AnalysisOptions::default();
        if let Some(w) = window {
            options = options.with_window_len(w);
        }
        let mut analyzed = make_series(&values).analyze(&options).unwrap();

        for batch in batches {
            let n = analyzed.series().len();
            let time: Vec<_> = (0..batch.len())
                .map(|i| base + Duration::hours((n + i) as i64))
                .collect();
            let new_values: Vec<f64> = batch
                .into_iter()
                .map(|(e, shifted)| 100.0 + e + if shifted { 5.0 } else { 0.0 })
                .collect();
            let new_data = HashMap::from([("metric".to_string(), new_values)]);
            analyzed.append(&time, &new_data, &HashMap::new()).unwrap();

            let fresh = analyzed.series().analyze(&options).unwrap();
            prop_assert_eq!(indices(&analyzed), indices(&fresh));
            prop_assert_eq!(
                analyzed.weak_change_points("metric"),
                fresh.weak_change_points("metric")
            );
            prop_assert_eq!(analyzed.to_json(), fresh.to_json());
        }
    }
}
