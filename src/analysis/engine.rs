//! Valuation orchestrator.
//!
//! Owns the loaded company records, the weight table and the parameter
//! set, walks every company through the method pipeline and caches the
//! results. Changing a parameter invalidates the cache; valuations are
//! ephemeral and recomputed, never persisted.

use crate::analysis::blend::blend_base_methods;
use crate::analysis::methods;
use crate::analysis::synthesis::{buy_price, fair_price, gap_pct, synthesize};
use crate::analysis::weights::resolve_weights;
use crate::models::{
    CompanyRecord, CompanyValuation, SizeBucket, ValuationParams, WeightTable,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub struct ValuationEngine {
    companies: BTreeMap<String, CompanyRecord>,
    weights: WeightTable,
    params: ValuationParams,
    cache: HashMap<String, CompanyValuation>,
}

impl ValuationEngine {
    pub fn new(
        companies: BTreeMap<String, CompanyRecord>,
        weights: WeightTable,
        params: ValuationParams,
    ) -> Self {
        Self {
            companies,
            weights,
            params,
            cache: HashMap::new(),
        }
    }

    pub fn params(&self) -> &ValuationParams {
        &self.params
    }

    pub fn company_names(&self) -> Vec<String> {
        self.companies.keys().cloned().collect()
    }

    pub fn set_target_return(&mut self, target_return: f64) {
        if self.params.target_return != target_return {
            self.params.target_return = target_return;
            self.cache.clear();
        }
    }

    pub fn set_projection_horizon(&mut self, horizon: u32) {
        if self.params.projection_horizon != horizon {
            self.params.projection_horizon = horizon;
            self.cache.clear();
        }
    }

    pub fn set_ratio_window(&mut self, window: usize) {
        if self.params.ratio_window != window {
            self.params.ratio_window = window;
            self.cache.clear();
        }
    }

    /// Value one company by its store name. None when the name is unknown.
    pub fn value_company(&mut self, name: &str) -> Option<CompanyValuation> {
        if let Some(cached) = self.cache.get(name) {
            return Some(cached.clone());
        }
        let record = self.companies.get(name)?;
        let valuation = compute_valuation(name, record, &self.weights, &self.params);
        self.cache.insert(name.to_string(), valuation.clone());
        Some(valuation)
    }

    /// Value every company in the store, in name order. Skipped companies
    /// are included with their skip reason.
    pub fn value_all(&mut self) -> Vec<CompanyValuation> {
        let names = self.company_names();
        names
            .iter()
            .filter_map(|name| self.value_company(name))
            .collect()
    }
}

/// Prerequisites every valuation needs from the market snapshot.
fn validate(record: &CompanyRecord) -> Result<(f64, f64, f64), String> {
    let market = record
        .market()
        .ok_or("no market snapshot (run a quote refresh first)")?;
    let price = market
        .current_price
        .filter(|p| *p > 0.0)
        .ok_or("no current price")?;
    market
        .currency
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or("no currency")?;
    let market_cap = market
        .market_cap
        .filter(|c| *c > 0.0)
        .ok_or("no market capitalization")?;
    let shares = market
        .shares_outstanding
        .filter(|s| *s > 0.0)
        .ok_or("no shares outstanding")?;
    Ok((price, market_cap, shares))
}

/// Full pipeline for one company: validation, the five base methods, the
/// weighted blend, the three complementary methods, synthesis.
pub fn compute_valuation(
    name: &str,
    record: &CompanyRecord,
    weights: &WeightTable,
    params: &ValuationParams,
) -> CompanyValuation {
    let (current_price, market_cap, shares) = match validate(record) {
        Ok(v) => v,
        Err(reason) => {
            debug!("skipping {}: {}", name, reason);
            return CompanyValuation::skipped(name, record, reason);
        }
    };

    let size = SizeBucket::from_market_cap(market_cap);
    let weight_entry = resolve_weights(weights, &record.info.sector, size);

    let earnings = methods::value_earnings(record, params);
    let fcf = methods::value_fcf(record, shares, params);
    let sales = methods::value_sales(record, shares, market_cap, params);
    let ebitda = methods::value_ebitda(record, shares, params);
    let book_value = methods::value_book(record, shares, market_cap, params);

    let base_results = [
        ("earnings", &earnings),
        ("fcf", &fcf),
        ("sales", &sales),
        ("ebitda", &ebitda),
        ("book_value", &book_value),
    ];
    let (blended_price, normalized_weights) = blend_base_methods(&base_results, &weight_entry);

    let peg = methods::value_peg(record, params);
    let dividend = methods::value_dividend(record, params);
    let beta = record.market().and_then(|m| m.beta);
    let capm = methods::value_beta_adjusted(blended_price, beta, params);

    // Fixed candidate order: the moving averages in the synthesis are
    // order-sensitive.
    let candidates: Vec<f64> = [
        blended_price,
        peg.price,
        dividend.price,
        capm.price,
    ]
    .into_iter()
    .flatten()
    .collect();

    let synthesis = synthesize(&candidates);
    let fair = synthesis.as_ref().map(fair_price);
    let buy = fair.map(|f| buy_price(f, params.target_return));
    let gap = fair.and_then(|f| gap_pct(f, current_price));

    CompanyValuation {
        name: name.to_string(),
        ticker: record.info.ticker.clone(),
        sector: record.info.sector.clone(),
        size: Some(size),
        currency: record.market().and_then(|m| m.currency.clone()),
        current_price: Some(current_price),
        skipped: None,
        earnings,
        fcf,
        sales,
        ebitda,
        book_value,
        peg,
        dividend,
        capm,
        weight_key: Some(weight_entry.key.clone()),
        normalized_weights,
        discount_factor: Some(weight_entry.discount_factor),
        blended_price,
        synthesis,
        fair_price: fair,
        buy_price: buy,
        gap_pct: gap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyInfo, IncomeStatement, MarketData, RatioHistory, YearSeries};

    fn growing_series(start: f64, rate: f64, years: usize) -> YearSeries {
        (0..years)
            .map(|i| (2015 + i as i32, Some(start * (1.0 + rate).powi(i as i32))))
            .collect()
    }

    fn flat_series(value: f64, years: usize) -> YearSeries {
        (0..years).map(|i| (2015 + i as i32, Some(value))).collect()
    }

    fn earnings_only_record() -> CompanyRecord {
        CompanyRecord {
            info: CompanyInfo {
                ticker: "TST".to_string(),
                sector: "Technology".to_string(),
                ..Default::default()
            },
            income_statement: Some(IncomeStatement {
                eps: Some(growing_series(10.0, 0.10, 10)),
                ..Default::default()
            }),
            ratios: Some(RatioHistory {
                per: Some(flat_series(18.0, 10)),
                ..Default::default()
            }),
            market: Some(MarketData {
                current_price: Some(250.0),
                currency: Some("USD".to_string()),
                market_cap: Some(5_000_000_000.0),
                shares_outstanding: Some(20_000_000.0),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn engine_with(record: CompanyRecord) -> ValuationEngine {
        let mut companies = BTreeMap::new();
        companies.insert("Test Co".to_string(), record);
        ValuationEngine::new(companies, WeightTable::default(), ValuationParams::default())
    }

    #[test]
    fn test_missing_shares_skips_company() {
        let mut record = earnings_only_record();
        record.market.as_mut().unwrap().shares_outstanding = None;
        let mut engine = engine_with(record);
        let v = engine.value_company("Test Co").unwrap();
        assert_eq!(v.skipped.as_deref(), Some("no shares outstanding"));
        assert!(v.fair_price.is_none());
    }

    #[test]
    fn test_missing_currency_skips_company() {
        let mut record = earnings_only_record();
        record.market.as_mut().unwrap().currency = None;
        let mut engine = engine_with(record);
        let v = engine.value_company("Test Co").unwrap();
        assert_eq!(v.skipped.as_deref(), Some("no currency"));
        assert!(v.fair_price.is_none());
        assert_eq!(v.earnings.reason, "not attempted");
    }

    #[test]
    fn test_earnings_only_valuation_flows_to_fair_price() {
        let mut engine = engine_with(earnings_only_record());
        let v = engine.value_company("Test Co").unwrap();

        assert!(v.skipped.is_none());
        assert!(v.earnings.is_valid());
        assert!(!v.fcf.is_valid());
        // Only earnings priced: blend = earnings price (hard default
        // discount factor is 1.0).
        assert_eq!(v.blended_price, v.earnings.price);
        assert!((v.normalized_weights["earnings"] - 1.0).abs() < 1e-12);
        // No beta -> no beta-adjusted price; no dividends -> no Gordon.
        assert!(!v.capm.is_valid());
        assert!(!v.dividend.is_valid());
        // Candidates: blended + PEG. Fair and buy prices defined.
        assert!(v.fair_price.is_some());
        let buy = v.buy_price.unwrap();
        assert!((buy - v.fair_price.unwrap() / 1.15).abs() < 1e-9);
        assert!(v.gap_pct.is_some());
    }

    #[test]
    fn test_capm_runs_off_blended_price() {
        let mut record = earnings_only_record();
        record.market.as_mut().unwrap().beta = Some(1.2);
        let mut engine = engine_with(record);
        let v = engine.value_company("Test Co").unwrap();
        let expected = v.blended_price.unwrap() / (1.0 + 0.04 + 1.2 * 0.055);
        assert!((v.capm.price.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_parameter_change_invalidates_cache() {
        let mut engine = engine_with(earnings_only_record());
        let before = engine.value_company("Test Co").unwrap();
        engine.set_target_return(0.10);
        let after = engine.value_company("Test Co").unwrap();
        // Same fair price, different buy price.
        assert_eq!(before.fair_price, after.fair_price);
        assert!(before.buy_price.unwrap() < after.buy_price.unwrap());
    }

    #[test]
    fn test_valuation_is_idempotent() {
        let mut engine = engine_with(earnings_only_record());
        let a = engine.value_company("Test Co").unwrap();
        let b = engine.value_company("Test Co").unwrap();
        assert_eq!(a.fair_price, b.fair_price);
        assert_eq!(a.normalized_weights, b.normalized_weights);
    }

    #[test]
    fn test_unknown_name() {
        let mut engine = engine_with(earnings_only_record());
        assert!(engine.value_company("Nobody").is_none());
    }

    #[test]
    fn test_value_all_includes_skipped() {
        let mut companies = BTreeMap::new();
        companies.insert("Good".to_string(), earnings_only_record());
        companies.insert("Bare".to_string(), CompanyRecord::default());
        let mut engine =
            ValuationEngine::new(companies, WeightTable::default(), ValuationParams::default());
        let all = engine.value_all();
        assert_eq!(all.len(), 2);
        // Name order from the store.
        assert_eq!(all[0].name, "Bare");
        assert!(all[0].skipped.is_some());
        assert!(all[1].skipped.is_none());
    }
}
