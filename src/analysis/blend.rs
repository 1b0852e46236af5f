//! Weighted blending of the base method prices.
//!
//! Weights are renormalized over the methods that actually produced a
//! price, so an excluded method redistributes its share instead of
//! dragging the blend toward zero. The sector discount factor applies
//! once, after blending.

use crate::models::{MethodResult, WeightEntry};
use std::collections::BTreeMap;

/// Blend the base method prices under the resolved weights.
///
/// Returns the discounted blended price (None when no method priced or all
/// applicable weights are zero) and the renormalized weight actually given
/// to each priced method.
pub fn blend_base_methods(
    results: &[(&'static str, &MethodResult)],
    weights: &WeightEntry,
) -> (Option<f64>, BTreeMap<String, f64>) {
    let weight_for = |name: &str| -> f64 {
        match name {
            "earnings" => weights.earnings,
            "fcf" => weights.fcf,
            "sales" => weights.sales,
            "ebitda" => weights.ebitda,
            "book_value" => weights.book_value,
            _ => 0.0,
        }
    };

    // Only methods with a price and a strictly positive weight take part;
    // a zero-weight method contributes nothing and is left out of the
    // provenance map.
    let priced: Vec<(&str, f64, f64)> = results
        .iter()
        .filter_map(|(name, r)| r.price.map(|p| (*name, p, weight_for(name))))
        .filter(|(_, _, w)| *w > 0.0)
        .collect();

    let total_weight: f64 = priced.iter().map(|(_, _, w)| w).sum();
    if priced.is_empty() || total_weight <= 0.0 {
        return (None, BTreeMap::new());
    }

    let mut normalized = BTreeMap::new();
    let mut blended = 0.0;
    for (name, price, weight) in &priced {
        let share = weight / total_weight;
        blended += price * share;
        normalized.insert((*name).to_string(), share);
    }

    (Some(blended * weights.discount_factor), normalized)
}
