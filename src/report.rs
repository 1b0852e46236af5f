//! Terminal reporting and JSON export of valuation results.

use crate::models::{CompanyValuation, MethodResult, ValuationParams};
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use std::path::Path;

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:>10.2}", v),
        None => format!("{:>10}", "-"),
    }
}

fn signal(valuation: &CompanyValuation) -> &'static str {
    match (valuation.gap_pct, valuation.buy_price, valuation.current_price) {
        (Some(_), Some(buy), Some(price)) if price <= buy => "🟢 BUY",
        (Some(gap), _, _) if gap > 0.0 => "🟡 WATCH",
        (Some(_), _, _) => "🔴 RICH",
        _ => "⚪ N/A",
    }
}

/// One line per company: price, fair price, buy price, gap, signal.
pub fn print_summary(valuations: &[CompanyValuation]) {
    println!();
    println!("📊 Fair Price Summary ({} companies)", valuations.len());
    println!("{}", "=".repeat(92));
    println!(
        "{:<28} {:>10} {:>10} {:>10} {:>8}  {}",
        "Company", "Price", "Fair", "Buy", "Gap %", "Signal"
    );
    println!("{}", "-".repeat(92));

    for v in valuations {
        if let Some(reason) = &v.skipped {
            println!("{:<28} {:>42}  ⚪ skipped: {}", v.name, "", reason);
            continue;
        }
        println!(
            "{:<28} {} {} {} {:>7}  {}",
            v.name,
            fmt_opt(v.current_price),
            fmt_opt(v.fair_price),
            fmt_opt(v.buy_price),
            v.gap_pct
                .map(|g| format!("{:+.1}", g))
                .unwrap_or_else(|| "-".to_string()),
            signal(v),
        );
    }
    println!("{}", "=".repeat(92));
}

fn print_method(label: &str, result: &MethodResult) {
    match result.price {
        Some(price) => {
            let mut extras = Vec::new();
            if let Some(g) = result.growth {
                extras.push(format!("growth {:+.1}%", g * 100.0));
            }
            if let Some(r) = result.ratio {
                extras.push(format!("ratio {:.2}", r));
            }
            let extras = if extras.is_empty() {
                String::new()
            } else {
                format!("  ({})", extras.join(", "))
            };
            println!("   {:<14} {:>10.2}{}", label, price, extras);
        }
        None => println!("   {:<14} {:>10}  — {}", label, "-", result.reason),
    }
}

/// Full breakdown for one company: every method with its provenance or
/// exclusion reason, the blend weights, the synthesis statistics.
pub fn print_detail(v: &CompanyValuation) {
    println!();
    println!("🏢 {} ({})", v.name, v.ticker);
    if !v.sector.is_empty() {
        let size = v.size.map(|s| s.to_string()).unwrap_or_default();
        println!("   {} / {}", v.sector, size);
    }
    if let (Some(price), Some(currency)) = (v.current_price, v.currency.as_deref()) {
        println!("   Current price: {:.2} {}", price, currency);
    }
    if let Some(reason) = &v.skipped {
        println!("   ⚪ Skipped: {}", reason);
        return;
    }

    println!();
    println!("   Base methods");
    print_method("Earnings", &v.earnings);
    print_method("Free cash flow", &v.fcf);
    print_method("Sales", &v.sales);
    print_method("EBITDA", &v.ebitda);
    print_method("Book value", &v.book_value);

    if !v.normalized_weights.is_empty() {
        let weights = v
            .normalized_weights
            .iter()
            .map(|(name, share)| format!("{} {:.0}%", name, share * 100.0))
            .collect::<Vec<_>>()
            .join(", ");
        println!("   Weights: {} (profile {})", weights, v.weight_key.as_deref().unwrap_or("?"));
    }
    if let Some(d) = v.discount_factor {
        if d != 1.0 {
            println!("   Sector discount: x{:.2}", d);
        }
    }
    println!("   Blended:       {}", fmt_opt(v.blended_price).trim_start());

    println!();
    println!("   Complementary methods");
    print_method("PEG", &v.peg);
    print_method("Dividend", &v.dividend);
    print_method("Beta-adjusted", &v.capm);

    if let Some(s) = &v.synthesis {
        println!();
        println!("   Synthesis");
        println!("   {:<14} {:>10.2}", "Arithmetic", s.arithmetic);
        match s.harmonic {
            Some(h) => println!("   {:<14} {:>10.2}", "Harmonic", h),
            None => println!("   {:<14} {:>10}", "Harmonic", "-"),
        }
        match s.geometric {
            Some(g) => println!("   {:<14} {:>10.2}", "Geometric", g),
            None => println!("   {:<14} {:>10}", "Geometric", "-"),
        }
        println!("   {:<14} {:>10.2}", "EMA", s.ema);
        println!("   {:<14} {:>10.2}", "DEMA", s.dema);
        println!("   {:<14} {:>10.2}", "Smoothed", s.smoothed);
    }

    println!();
    if let Some(fair) = v.fair_price {
        println!("   💰 Fair price: {:.2}", fair);
    }
    if let Some(buy) = v.buy_price {
        println!("   🎯 Buy below:  {:.2}", buy);
    }
    if let Some(gap) = v.gap_pct {
        println!("   📈 Gap:        {:+.1}%  {}", gap, signal(v));
    }
}

/// Export the full result set as a timestamped JSON document.
pub fn export_json(
    path: &Path,
    valuations: &[CompanyValuation],
    params: &ValuationParams,
) -> Result<()> {
    let document = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "target_return": params.target_return,
        "projection_horizon": params.projection_horizon,
        "ratio_window": params.ratio_window,
        "results": valuations,
    });
    std::fs::write(path, serde_json::to_string_pretty(&document)?)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
