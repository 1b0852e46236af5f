//! Historical ratio aggregation.
//!
//! A ratio median only looks at the most recent years of the series (old
//! multiples describe a different company) and only at values inside a
//! per-ratio plausibility band. Too few surviving samples means the ratio
//! is unusable, not zero.

use crate::analysis::growth::median;
use crate::models::YearSeries;

/// The `window` most recent year keys of a series, values included as-is.
pub fn recent_window(series: &YearSeries, window: usize) -> Vec<(i32, Option<f64>)> {
    let mut recent: Vec<(i32, Option<f64>)> =
        series.iter().rev().take(window).map(|(y, v)| (*y, *v)).collect();
    recent.reverse();
    recent
}

/// Median of the in-band values within the recency window.
///
/// Bounds are exclusive-lower / inclusive-upper: `lower < v <= upper`.
/// Returns None with fewer than `min_samples` surviving values.
pub fn median_ratio(
    series: &YearSeries,
    window: usize,
    bounds: (f64, f64),
    min_samples: usize,
) -> Option<f64> {
    let (lower, upper) = bounds;
    let valid: Vec<f64> = recent_window(series, window)
        .into_iter()
        .filter_map(|(_, v)| v)
        .filter(|v| *v > lower && *v <= upper)
        .collect();

    if valid.len() < min_samples {
        return None;
    }
    median(&valid)
}
