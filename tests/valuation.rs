//! End-to-end valuation scenarios over a real store file.

use pretty_assertions::assert_eq;
use rust_fairprice::analysis::engine::ValuationEngine;
use rust_fairprice::models::{
    CompanyInfo, CompanyRecord, IncomeStatement, MarketData, RatioHistory, ValuationParams,
    WeightTable, YearSeries,
};
use rust_fairprice::store;
use std::collections::BTreeMap;
use tempfile::tempdir;

/// EPS 10..=19 over 2015-2024, earnings multiple flat at 15, nothing else.
fn earnings_scenario_record() -> CompanyRecord {
    let eps: YearSeries = (0..10).map(|i| (2015 + i, Some(10.0 + i as f64))).collect();
    let per: YearSeries = (2020..=2024).map(|y| (y, Some(15.0))).collect();
    CompanyRecord {
        info: CompanyInfo {
            ticker: "SCN".to_string(),
            sector: "Industrials".to_string(),
            ..Default::default()
        },
        income_statement: Some(IncomeStatement {
            eps: Some(eps),
            ..Default::default()
        }),
        ratios: Some(RatioHistory {
            per: Some(per),
            ..Default::default()
        }),
        market: Some(MarketData {
            current_price: Some(280.0),
            currency: Some("EUR".to_string()),
            market_cap: Some(4_000_000_000.0),
            shares_outstanding: Some(14_285_714.0),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn engine_for(record: CompanyRecord) -> ValuationEngine {
    let mut companies = BTreeMap::new();
    companies.insert("Scenario Co".to_string(), record);
    ValuationEngine::new(companies, WeightTable::default(), ValuationParams::default())
}

#[test]
fn earnings_only_scenario_prices_through_the_pipeline() {
    let mut engine = engine_for(earnings_scenario_record());
    let v = engine.value_company("Scenario Co").unwrap();

    assert!(v.skipped.is_none());

    // Median of the nine year-over-year growths is the middle one, 15/14.
    let median_growth = 1.0 / 14.0;
    let growth = v.earnings.growth.unwrap();
    assert!((growth - median_growth).abs() < 1e-9);
    assert_eq!(v.earnings.ratio, Some(15.0));

    // Projected EPS times the multiple; sole valid method carries the
    // whole blend (hard default discount factor is 1.0).
    let expected_price = 19.0 * (1.0 + median_growth) * 15.0;
    assert!((v.earnings.price.unwrap() - expected_price).abs() < 1e-6);
    assert!((v.blended_price.unwrap() - expected_price).abs() < 1e-6);
    assert!((v.normalized_weights["earnings"] - 1.0).abs() < 1e-12);

    // Other base methods are exclusions, not errors.
    assert!(!v.fcf.is_valid());
    assert!(!v.sales.is_valid());
    assert!(!v.ebitda.is_valid());
    assert!(!v.book_value.is_valid());
    assert!(!v.dividend.is_valid());
    assert!(!v.capm.is_valid()); // no beta

    let fair = v.fair_price.unwrap();
    assert!(fair.is_finite());
    assert!((v.buy_price.unwrap() - fair / 1.15).abs() < 1e-9);
}

#[test]
fn missing_shares_skips_before_any_method() {
    let mut record = earnings_scenario_record();
    record.market.as_mut().unwrap().shares_outstanding = None;
    let mut engine = engine_for(record);
    let v = engine.value_company("Scenario Co").unwrap();

    assert_eq!(v.skipped.as_deref(), Some("no shares outstanding"));
    assert_eq!(v.earnings.reason, "not attempted");
    assert!(v.blended_price.is_none());
    assert!(v.fair_price.is_none());
}

#[test]
fn valuation_is_idempotent() {
    let mut engine = engine_for(earnings_scenario_record());
    let a = engine.value_company("Scenario Co").unwrap();
    let b = engine.value_company("Scenario Co").unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn store_roundtrip_preserves_valuation_inputs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("companies.json");

    let mut companies = BTreeMap::new();
    companies.insert("Scenario Co".to_string(), earnings_scenario_record());
    store::save_companies(&path, &companies).unwrap();

    let reloaded = store::load_companies(&path).unwrap();
    let mut engine = ValuationEngine::new(
        reloaded,
        WeightTable::default(),
        ValuationParams::default(),
    );
    let v = engine.value_company("Scenario Co").unwrap();
    let expected_price = 19.0 * (1.0 + 1.0 / 14.0) * 15.0;
    assert!((v.earnings.price.unwrap() - expected_price).abs() < 1e-6);
}

#[test]
fn weight_table_from_disk_drives_the_blend() {
    let dir = tempdir().unwrap();
    let weights_path = dir.path().join("weights.json");
    std::fs::write(
        &weights_path,
        r#"{
            "Industrials_Mid": {
                "earnings": 0.5, "fcf": 0.2, "sales": 0.1,
                "ebitda": 0.1, "book_value": 0.1,
                "discount_factor": 0.9
            }
        }"#,
    )
    .unwrap();
    let weights = store::load_weight_table(&weights_path).unwrap();

    let mut companies = BTreeMap::new();
    companies.insert("Scenario Co".to_string(), earnings_scenario_record());
    let mut engine = ValuationEngine::new(companies, weights, ValuationParams::default());
    let v = engine.value_company("Scenario Co").unwrap();

    // 4B market cap -> Mid bucket -> sector profile with 0.9 discount.
    assert_eq!(v.weight_key.as_deref(), Some("Industrials_Mid"));
    let expected_price = 19.0 * (1.0 + 1.0 / 14.0) * 15.0 * 0.9;
    assert!((v.blended_price.unwrap() - expected_price).abs() < 1e-6);
}
