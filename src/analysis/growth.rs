//! Growth trend estimation over annual series.
//!
//! The estimator is deliberately conservative: single-period growths
//! outside a plausibility band are dropped as data artifacts, the trend is
//! the median of what survives (robust to one-off spikes), and extreme
//! medians are floored or capped before they reach a projection.

use crate::models::{ValuationParams, YearSeries};

/// Year-over-year growth rates between adjacent year keys.
///
/// A pair of adjacent keys contributes only when both carry a non-null
/// value and the earlier one is strictly positive: an explicit null leaves
/// both of its transitions undefined, and a growth off a zero or negative
/// base is meaningless. An absent key simply bridges to the next present
/// one. Growths outside `(lower, upper)` bounds are discarded.
pub fn period_growths(series: &YearSeries, lower: f64, upper: f64) -> Vec<f64> {
    let entries: Vec<Option<f64>> = series.values().copied().collect();

    let mut growths = Vec::new();
    for pair in entries.windows(2) {
        let (Some(prev), Some(next)) = (pair[0], pair[1]) else {
            continue;
        };
        if prev <= 0.0 {
            continue;
        }
        let g = (next - prev) / prev;
        if g >= lower && g <= upper {
            growths.push(g);
        }
    }
    growths
}

/// Median of a slice, averaging the two middle elements for even lengths.
/// Returns None on an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Robust annual growth trend for a series, or None when the method using
/// it must be excluded.
///
/// Exclusion cases: fewer than `min_growth_samples` valid period growths,
/// or a median strictly below `growth_floor` (a structurally declining
/// business is not projected). A median above `growth_spike_threshold` is
/// capped to `growth_cap`; a median exactly at the floor is kept.
pub fn median_growth(series: &YearSeries, params: &ValuationParams) -> Option<f64> {
    let growths = period_growths(series, params.growth_lower_bound, params.growth_upper_bound);
    if growths.len() < params.min_growth_samples {
        return None;
    }

    let m = median(&growths)?;
    if m < params.growth_floor {
        return None;
    }
    if m > params.growth_spike_threshold {
        return Some(params.growth_cap);
    }
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValuationParams;

    fn series(values: &[(i32, Option<f64>)]) -> YearSeries {
        values.iter().cloned().collect()
    }

    fn steady_series(rate: f64) -> YearSeries {
        // 2015..=2024, compounding at `rate` from 100.
        (0..10)
            .map(|i| (2015 + i as i32, Some(100.0 * (1.0 + rate).powi(i))))
            .collect()
    }

    #[test]
    fn test_null_year_leaves_both_transitions_undefined() {
        let s = series(&[(2018, Some(100.0)), (2019, None), (2020, Some(110.0))]);
        assert!(period_growths(&s, -0.50, 2.00).is_empty());
    }

    #[test]
    fn test_absent_year_bridges_to_next_key() {
        let s = series(&[(2018, Some(100.0)), (2020, Some(110.0))]);
        let g = period_growths(&s, -0.50, 2.00);
        assert_eq!(g.len(), 1);
        assert!((g[0] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_non_positive_base_contributes_nothing() {
        let s = series(&[
            (2019, Some(-10.0)),
            (2020, Some(-1.5)),
            (2021, Some(2.0)),
            (2022, Some(0.0)),
            (2023, Some(5.0)),
        ]);
        // -10 -> -1.5 and -1.5 -> 2.0 skipped (negative base), 2 -> 0 is
        // -100% (out of band), 0 -> 5 skipped (zero base).
        assert!(period_growths(&s, -0.50, 2.00).is_empty());
    }

    #[test]
    fn test_all_negative_series_has_no_trend() {
        let params = ValuationParams::default();
        // A loss narrowing from -10 to -3 must not read as growth.
        let s: YearSeries = (0..8).map(|i| (2017 + i, Some(-10.0 + i as f64))).collect();
        assert_eq!(median_growth(&s, &params), None);
    }

    #[test]
    fn test_period_growths_band_rejects_artifacts() {
        let s = series(&[
            (2019, Some(10.0)),
            (2020, Some(40.0)),  // +300%, above band
            (2021, Some(10.0)),  // -75%, below band
            (2022, Some(12.0)),  // +20%, kept
        ]);
        let g = period_growths(&s, -0.50, 2.00);
        assert_eq!(g.len(), 1);
        assert!((g[0] - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_median_growth_requires_min_samples() {
        let params = ValuationParams::default();
        // 5 values -> only 4 growths, below the 5-sample minimum.
        let s: YearSeries = (0..5).map(|i| (2020 + i, Some(100.0 + i as f64))).collect();
        assert_eq!(median_growth(&s, &params), None);

        // 6 values -> 5 growths, enough.
        let s: YearSeries = (0..6).map(|i| (2019 + i, Some(100.0 * 1.05f64.powi(i)))).collect();
        let g = median_growth(&s, &params).unwrap();
        assert!((g - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_floor_is_inclusive() {
        let params = ValuationParams::default();
        let g = median_growth(&steady_series(-0.20), &params);
        assert!(g.is_some());
        assert!((g.unwrap() + 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_below_floor_excluded() {
        let params = ValuationParams::default();
        assert_eq!(median_growth(&steady_series(-0.2001), &params), None);
    }

    #[test]
    fn test_spike_threshold_boundary() {
        let params = ValuationParams::default();
        // Exactly 50%: retained as-is.
        let g = median_growth(&steady_series(0.50), &params).unwrap();
        assert!((g - 0.50).abs() < 1e-9);
        // 51%: capped to 30%.
        let g = median_growth(&steady_series(0.51), &params).unwrap();
        assert!((g - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
