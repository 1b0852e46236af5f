//! Final price synthesis.
//!
//! The candidate prices (blended plus the complementary methods, in fixed
//! order) are reduced through six averaging statistics; the fair price is
//! the median of whichever statistics are defined. The moving averages are
//! order-sensitive by construction, which is why the candidate order is
//! fixed and documented rather than sorted.

use crate::analysis::growth::median;
use crate::models::Synthesis;

const EMA_ALPHA: f64 = 0.3;

/// Exponential moving average seeded at the first element.
fn ema(values: &[f64], alpha: f64) -> f64 {
    let mut current = values[0];
    for v in &values[1..] {
        current = alpha * v + (1.0 - alpha) * current;
    }
    current
}

/// Compute the six statistics over a non-empty candidate list.
///
/// Harmonic and geometric means are taken over the strictly-positive
/// subset of the candidates and are undefined only when no candidate is
/// positive; the others cover the full list. The smoothed average
/// intentionally equals the arithmetic mean (see DESIGN.md).
pub fn synthesize(candidates: &[f64]) -> Option<Synthesis> {
    if candidates.is_empty() {
        return None;
    }
    let n = candidates.len() as f64;
    let arithmetic = candidates.iter().sum::<f64>() / n;

    let positives: Vec<f64> = candidates.iter().copied().filter(|v| *v > 0.0).collect();
    let (harmonic, geometric) = if positives.is_empty() {
        (None, None)
    } else {
        let np = positives.len() as f64;
        (
            Some(np / positives.iter().map(|v| 1.0 / v).sum::<f64>()),
            Some((positives.iter().map(|v| v.ln()).sum::<f64>() / np).exp()),
        )
    };

    let ema1 = ema(candidates, EMA_ALPHA);
    // DEMA over a short candidate list: reapply the smoothing to the
    // running EMA sequence.
    let ema_sequence: Vec<f64> = {
        let mut seq = Vec::with_capacity(candidates.len());
        let mut current = candidates[0];
        seq.push(current);
        for v in &candidates[1..] {
            current = EMA_ALPHA * v + (1.0 - EMA_ALPHA) * current;
            seq.push(current);
        }
        seq
    };
    let ema2 = ema(&ema_sequence, EMA_ALPHA);
    let dema = 2.0 * ema1 - ema2;

    Some(Synthesis {
        arithmetic,
        harmonic,
        geometric,
        ema: ema1,
        dema,
        smoothed: arithmetic,
    })
}

/// Fair price: median of the defined statistics.
pub fn fair_price(synthesis: &Synthesis) -> f64 {
    let mut stats = vec![
        synthesis.arithmetic,
        synthesis.ema,
        synthesis.dema,
        synthesis.smoothed,
    ];
    if let Some(h) = synthesis.harmonic {
        stats.push(h);
    }
    if let Some(g) = synthesis.geometric {
        stats.push(g);
    }
    // Non-empty by construction.
    median(&stats).unwrap_or(synthesis.arithmetic)
}

/// Entry price that delivers the required return on top of the fair price.
pub fn buy_price(fair: f64, target_return: f64) -> f64 {
    fair / (1.0 + target_return)
}

/// Signed percentage gap between the fair price and the market price.
/// Positive means undervalued.
pub fn gap_pct(fair: f64, current_price: f64) -> Option<f64> {
    if current_price == 0.0 {
        return None;
    }
    Some((fair - current_price) / current_price * 100.0)
}
