//! The individual valuation methods.
//!
//! Five base methods (earnings, free cash flow, sales, EBITDA, book value)
//! share one shape: take the latest positive per-share figure, project it
//! along the trend, apply a median historical multiple. Three complementary
//! methods (PEG, dividend discount, beta-adjusted) price from other angles.
//!
//! Every outcome is a [`MethodResult`]: a method that cannot price says why
//! and is excluded from the blend, it never aborts the company.

use crate::analysis::growth::{median, median_growth, period_growths};
use crate::analysis::ratios::median_ratio;
use crate::models::{CompanyRecord, MethodResult, ValuationParams, YearSeries};

/// Most recent year carrying a non-null, non-zero value.
fn latest_value(series: &YearSeries) -> Option<(i32, f64)> {
    series
        .iter()
        .rev()
        .find_map(|(year, v)| v.filter(|x| *x != 0.0).map(|x| (*year, x)))
}

/// Most recent non-null value, zero allowed (net debt can legitimately be
/// zero or negative).
fn latest_present(series: &YearSeries) -> Option<f64> {
    series.iter().rev().find_map(|(_, v)| *v)
}

fn project(latest: f64, growth: f64, horizon: u32) -> f64 {
    latest * (1.0 + growth).powi(horizon as i32)
}

/// Per-share view of an aggregate series.
fn per_share(series: &YearSeries, shares: f64) -> YearSeries {
    series
        .iter()
        .map(|(year, v)| (*year, v.map(|x| x / shares)))
        .collect()
}

/// Ratio series derived per year as capitalization over an aggregate
/// metric. Uses the current capitalization against each historical year.
fn derived_ratio_series(market_cap: f64, metric: &YearSeries) -> YearSeries {
    metric
        .iter()
        .filter_map(|(year, v)| {
            v.filter(|x| *x != 0.0).map(|x| (*year, Some(market_cap / x)))
        })
        .collect()
}

/// Demote a non-finite price (overflow, division blowup) to an exclusion.
fn finish(price: f64, growth: Option<f64>, ratio: Option<f64>) -> MethodResult {
    if price.is_finite() {
        MethodResult::priced(price, growth, ratio)
    } else {
        MethodResult::excluded("non-finite price")
    }
}

/// Earnings method: projected EPS times the median historical P/E.
pub fn value_earnings(record: &CompanyRecord, params: &ValuationParams) -> MethodResult {
    let eps = match record.eps_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no EPS history"),
    };
    let growth = match median_growth(eps, params) {
        Some(g) => g,
        None => return MethodResult::excluded("no usable EPS growth trend"),
    };
    let per = match record.per_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no P/E history"),
    };
    let per_median = match median_ratio(per, params.ratio_window, params.per_bounds, params.min_ratio_samples)
    {
        Some(m) => m,
        None => return MethodResult::excluded("no usable P/E median"),
    };
    let (_, latest_eps) = match latest_value(eps) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest EPS not positive"),
    };

    let price = project(latest_eps, growth, params.projection_horizon) * per_median;
    finish(price, Some(growth), Some(per_median))
}

/// Free cash flow method: projected FCF per share times the multiple
/// implied by the median FCF yield (100 / yield%).
pub fn value_fcf(
    record: &CompanyRecord,
    shares: f64,
    params: &ValuationParams,
) -> MethodResult {
    let fcfe = match record.fcfe_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no free cash flow history"),
    };
    let fcf_ps = per_share(fcfe, shares);
    let growth = match median_growth(&fcf_ps, params) {
        Some(g) => g,
        None => return MethodResult::excluded("no usable FCF growth trend"),
    };
    let yields = match record.fcf_yield_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no FCF yield history"),
    };
    let yield_median = match median_ratio(
        yields,
        params.ratio_window,
        params.fcf_yield_bounds,
        params.min_ratio_samples,
    ) {
        Some(m) => m,
        None => return MethodResult::excluded("no usable FCF yield median"),
    };
    let (_, latest) = match latest_value(&fcf_ps) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest FCF per share not positive"),
    };

    let multiple = 100.0 / yield_median;
    let price = project(latest, growth, params.projection_horizon) * multiple;
    finish(price, Some(growth), Some(yield_median))
}

/// Sales method: projected revenue per share times the median derived
/// price-to-sales ratio.
pub fn value_sales(
    record: &CompanyRecord,
    shares: f64,
    market_cap: f64,
    params: &ValuationParams,
) -> MethodResult {
    let revenue = match record.revenue_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no revenue history"),
    };
    let growth = match median_growth(revenue, params) {
        Some(g) => g,
        None => return MethodResult::excluded("no usable revenue growth trend"),
    };
    let ps_series = derived_ratio_series(market_cap, revenue);
    let ps_median = match median_ratio(
        &ps_series,
        params.ratio_window,
        params.price_sales_bounds,
        params.min_ratio_samples,
    ) {
        Some(m) => m,
        None => return MethodResult::excluded("no usable price/sales median"),
    };
    let (_, latest) = match latest_value(revenue) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest revenue not positive"),
    };

    let projected_per_share = project(latest, growth, params.projection_horizon) / shares;
    finish(projected_per_share * ps_median, Some(growth), Some(ps_median))
}

/// EBITDA method: projected total EBITDA times the median EV/EBITDA gives
/// an enterprise value; subtract net debt and divide by shares.
pub fn value_ebitda(
    record: &CompanyRecord,
    shares: f64,
    params: &ValuationParams,
) -> MethodResult {
    let ebitda = match record.ebitda_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no EBITDA history"),
    };
    let growth = match median_growth(ebitda, params) {
        Some(g) => g,
        None => return MethodResult::excluded("no usable EBITDA growth trend"),
    };
    let ev_ebitda = match record.ev_to_ebitda_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no EV/EBITDA history"),
    };
    let ev_median = match median_ratio(
        ev_ebitda,
        params.ratio_window,
        params.ev_ebitda_bounds,
        params.min_ratio_samples,
    ) {
        Some(m) => m,
        None => return MethodResult::excluded("no usable EV/EBITDA median"),
    };
    let (_, latest) = match latest_value(ebitda) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest EBITDA not positive"),
    };

    let net_debt = record
        .net_debt_series()
        .and_then(latest_present)
        .unwrap_or(0.0);

    let enterprise_value = project(latest, growth, params.projection_horizon) * ev_median;
    let price = (enterprise_value - net_debt) / shares;
    finish(price, Some(growth), Some(ev_median))
}

/// Book value method: projected equity per share times the median derived
/// price-to-book ratio.
pub fn value_book(
    record: &CompanyRecord,
    shares: f64,
    market_cap: f64,
    params: &ValuationParams,
) -> MethodResult {
    let equity = match record.equity_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no equity history"),
    };
    let growth = match median_growth(equity, params) {
        Some(g) => g,
        None => return MethodResult::excluded("no usable equity growth trend"),
    };
    let pb_series = derived_ratio_series(market_cap, equity);
    let pb_median = match median_ratio(
        &pb_series,
        params.ratio_window,
        params.price_book_bounds,
        params.min_ratio_samples,
    ) {
        Some(m) => m,
        None => return MethodResult::excluded("no usable price/book median"),
    };
    let (_, latest) = match latest_value(equity) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest equity not positive"),
    };

    let projected_per_share = project(latest, growth, params.projection_horizon) / shares;
    finish(projected_per_share * pb_median, Some(growth), Some(pb_median))
}

/// PEG method: price a stock at the P/E a growth investor would pay, the
/// target PEG times the growth rate in percentage points.
pub fn value_peg(record: &CompanyRecord, params: &ValuationParams) -> MethodResult {
    let eps = match record.eps_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no EPS history"),
    };
    let growth = match median_growth(eps, params) {
        Some(g) if g > 0.0 => g,
        Some(_) => return MethodResult::excluded("earnings growth not positive"),
        None => return MethodResult::excluded("no usable EPS growth trend"),
    };
    let (_, latest_eps) = match latest_value(eps) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest EPS not positive"),
    };

    let implied_pe = params.peg_target * growth * 100.0;
    finish(latest_eps * implied_pe, Some(growth), Some(implied_pe))
}

/// Dividend discount (Gordon) method: next dividend over the spread
/// between required return and dividend growth.
pub fn value_dividend(record: &CompanyRecord, params: &ValuationParams) -> MethodResult {
    let dividends = match record.dividend_series() {
        Some(s) => s,
        None => return MethodResult::excluded("no dividend history"),
    };
    let growths = period_growths(
        dividends,
        params.growth_lower_bound,
        params.growth_upper_bound,
    );
    if growths.len() < params.min_dividend_samples {
        return MethodResult::excluded("insufficient dividend history");
    }
    let growth = match median(&growths) {
        Some(g) => g,
        None => return MethodResult::excluded("insufficient dividend history"),
    };
    if growth < 0.0 {
        return MethodResult::excluded("dividend growth negative");
    }
    if growth >= params.target_return {
        return MethodResult::excluded("dividend growth exceeds required return");
    }
    let (_, latest_div) = match latest_value(dividends) {
        Some(v) if v.1 > 0.0 => v,
        _ => return MethodResult::excluded("latest dividend not positive"),
    };

    let price = latest_div * (1.0 + growth) / (params.target_return - growth);
    finish(price, Some(growth), None)
}

/// Beta-adjusted method: discount the blended price by the company's
/// CAPM-style required premium. Riskier stocks must be cheaper to clear
/// the same hurdle.
pub fn value_beta_adjusted(
    blended_price: Option<f64>,
    beta: Option<f64>,
    params: &ValuationParams,
) -> MethodResult {
    let blended = match blended_price {
        Some(p) => p,
        None => return MethodResult::excluded("no blended price to adjust"),
    };
    let beta = match beta {
        Some(b) => b,
        None => return MethodResult::excluded("no beta available"),
    };

    let required = params.risk_free_rate + beta * params.market_risk_premium;
    finish(blended / (1.0 + required), None, Some(beta))
}
