use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Year -> nullable value series. Missing years are absent keys or explicit
/// nulls, never zero: a calculation must be able to tell "no data" apart
/// from a genuine zero.
pub type YearSeries = BTreeMap<i32, Option<f64>>;

/// Static descriptors for a company, filled in at registration time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub ticker: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub country: String,
}

/// Income statement lines extracted from the statement spreadsheets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_per_share: Option<YearSeries>,
}

/// Balance sheet lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_equity: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<YearSeries>,
}

/// Cash flow statement lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcfe: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_cash_flow: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capex: Option<YearSeries>,
}

/// Historical valuation ratios as published, one value per year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatioHistory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcf_yield: Option<YearSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ev_to_ebitda: Option<YearSeries>,
}

/// Current-state market fields, refreshed from the quote provider. The
/// refresh job overwrites this section only; historical series are never
/// touched by it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_pe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peg_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One company's full record in the store: static info, extracted
/// historical series and the refreshed market snapshot. The valuation
/// engine consumes this read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(default)]
    pub info: CompanyInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_statement: Option<IncomeStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_sheet: Option<BalanceSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_flow: Option<CashFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratios: Option<RatioHistory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketData>,
}

impl CompanyRecord {
    pub fn market(&self) -> Option<&MarketData> {
        self.market.as_ref()
    }

    pub fn eps_series(&self) -> Option<&YearSeries> {
        self.income_statement.as_ref()?.eps.as_ref()
    }

    pub fn revenue_series(&self) -> Option<&YearSeries> {
        self.income_statement.as_ref()?.revenue.as_ref()
    }

    pub fn ebitda_series(&self) -> Option<&YearSeries> {
        self.income_statement.as_ref()?.ebitda.as_ref()
    }

    pub fn dividend_series(&self) -> Option<&YearSeries> {
        self.income_statement.as_ref()?.dividend_per_share.as_ref()
    }

    pub fn equity_series(&self) -> Option<&YearSeries> {
        self.balance_sheet.as_ref()?.total_equity.as_ref()
    }

    pub fn net_debt_series(&self) -> Option<&YearSeries> {
        self.balance_sheet.as_ref()?.net_debt.as_ref()
    }

    pub fn fcfe_series(&self) -> Option<&YearSeries> {
        self.cash_flow.as_ref()?.fcfe.as_ref()
    }

    pub fn per_series(&self) -> Option<&YearSeries> {
        self.ratios.as_ref()?.per.as_ref()
    }

    pub fn fcf_yield_series(&self) -> Option<&YearSeries> {
        self.ratios.as_ref()?.fcf_yield.as_ref()
    }

    pub fn ev_to_ebitda_series(&self) -> Option<&YearSeries> {
        self.ratios.as_ref()?.ev_to_ebitda.as_ref()
    }
}

/// Coarse size classification by market capitalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeBucket {
    Large,
    Mid,
    Small,
    Micro,
}

impl SizeBucket {
    pub fn from_market_cap(market_cap: f64) -> Self {
        if market_cap >= 10_000_000_000.0 {
            SizeBucket::Large
        } else if market_cap >= 2_000_000_000.0 {
            SizeBucket::Mid
        } else if market_cap >= 300_000_000.0 {
            SizeBucket::Small
        } else {
            SizeBucket::Micro
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeBucket::Large => "Large",
            SizeBucket::Mid => "Mid",
            SizeBucket::Small => "Small",
            SizeBucket::Micro => "Micro",
        }
    }
}

impl std::fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight coefficients for the five base valuation methods plus the
/// discount factor applied after blending. Weights need not sum to 1; the
/// blender renormalizes over the methods that actually produced a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightEntry {
    /// Lookup key, `<sector>_<size>` (e.g. "Technology_Large").
    pub key: String,
    pub earnings: f64,
    pub fcf: f64,
    pub sales: f64,
    pub ebitda: f64,
    pub book_value: f64,
    pub discount_factor: f64,
}

/// Collection of weight entries indexed by their `sector_size` key.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    entries: std::collections::HashMap<String, WeightEntry>,
}

impl WeightTable {
    pub fn new(entries: Vec<WeightEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&WeightEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a single valuation method: either a price with its
/// computation provenance, or an exclusion with a specific reason. Expected
/// data insufficiency is always an exclusion, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    pub reason: String,
}

impl MethodResult {
    pub fn priced(price: f64, growth: Option<f64>, ratio: Option<f64>) -> Self {
        Self {
            price: Some(price),
            growth,
            ratio,
            reason: "ok".to_string(),
        }
    }

    pub fn excluded(reason: impl Into<String>) -> Self {
        Self {
            price: None,
            growth: None,
            ratio: None,
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.price.is_some()
    }
}

/// The six averaging statistics computed over the valid candidate prices.
/// `smoothed` is intentionally identical to `arithmetic` (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    pub arithmetic: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmonic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometric: Option<f64>,
    pub ema: f64,
    pub dema: f64,
    pub smoothed: f64,
}

/// Full valuation output for one company. Ephemeral: recomputed whenever
/// the engine parameters change, never persisted as canonical state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyValuation {
    pub name: String,
    pub ticker: String,
    pub sector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,

    /// Company-level skip reason; when set, no method was computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,

    pub earnings: MethodResult,
    pub fcf: MethodResult,
    pub sales: MethodResult,
    pub ebitda: MethodResult,
    pub book_value: MethodResult,
    pub peg: MethodResult,
    pub dividend: MethodResult,
    pub capm: MethodResult,

    /// Weight table key the resolver settled on, after fallbacks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_key: Option<String>,
    /// Renormalized weights over the base methods that produced a price.
    pub normalized_weights: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_factor: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blended_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Synthesis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fair_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_pct: Option<f64>,
}

impl CompanyValuation {
    /// Valuation shell for a company skipped before any method ran.
    pub fn skipped(name: &str, record: &CompanyRecord, reason: impl Into<String>) -> Self {
        let not_attempted = || MethodResult::excluded("not attempted");
        Self {
            name: name.to_string(),
            ticker: record.info.ticker.clone(),
            sector: record.info.sector.clone(),
            size: None,
            currency: record.market().and_then(|m| m.currency.clone()),
            current_price: record.market().and_then(|m| m.current_price),
            skipped: Some(reason.into()),
            earnings: not_attempted(),
            fcf: not_attempted(),
            sales: not_attempted(),
            ebitda: not_attempted(),
            book_value: not_attempted(),
            peg: not_attempted(),
            dividend: not_attempted(),
            capm: not_attempted(),
            weight_key: None,
            normalized_weights: BTreeMap::new(),
            discount_factor: None,
            blended_price: None,
            synthesis: None,
            fair_price: None,
            buy_price: None,
            gap_pct: None,
        }
    }
}

/// Current-state snapshot pulled from the quote provider for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    pub currency: Option<String>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub beta: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub long_name: Option<String>,
}

/// Every threshold the valuation engine uses, in one explicit place.
/// Nothing in the engine reads ambient state.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationParams {
    /// Required annual return; drives the buy price and the dividend model.
    pub target_return: f64,
    /// Forward projection periods for the base methods.
    pub projection_horizon: u32,
    /// Recency window (years) for ratio medians.
    pub ratio_window: usize,

    /// Single-period growths outside this band are data artifacts.
    pub growth_lower_bound: f64,
    pub growth_upper_bound: f64,
    /// Minimum valid period growths for a trend to be usable.
    pub min_growth_samples: usize,
    /// Median growth strictly below this excludes the method entirely.
    pub growth_floor: f64,
    /// Median growth above this is capped...
    pub growth_spike_threshold: f64,
    /// ...to this value.
    pub growth_cap: f64,

    pub min_ratio_samples: usize,
    /// Plausibility bounds per ratio: exclusive lower, inclusive upper.
    pub per_bounds: (f64, f64),
    pub fcf_yield_bounds: (f64, f64),
    pub ev_ebitda_bounds: (f64, f64),
    pub price_sales_bounds: (f64, f64),
    pub price_book_bounds: (f64, f64),

    pub min_dividend_samples: usize,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
    pub peg_target: f64,
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self {
            target_return: 0.15,
            projection_horizon: 1,
            ratio_window: 5,
            growth_lower_bound: -0.50,
            growth_upper_bound: 2.00,
            min_growth_samples: 5,
            growth_floor: -0.20,
            growth_spike_threshold: 0.50,
            growth_cap: 0.30,
            min_ratio_samples: 3,
            per_bounds: (0.0, 100.0),
            fcf_yield_bounds: (0.0, 20.0),
            ev_ebitda_bounds: (0.0, 50.0),
            price_sales_bounds: (0.0, 30.0),
            price_book_bounds: (0.0, 20.0),
            min_dividend_samples: 3,
            risk_free_rate: 0.04,
            market_risk_premium: 0.055,
            peg_target: 1.0,
        }
    }
}

/// File locations and I/O tuning, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub companies_path: String,
    pub weights_path: String,
    pub roster_path: String,
    pub markets_path: String,
    pub statements_dir: String,
    pub export_path: String,
    pub rate_limit_per_minute: u32,
    pub refresh_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables, with defaults that
    /// keep everything under a local `data/` directory.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            companies_path: std::env::var("FAIRPRICE_COMPANIES")
                .unwrap_or_else(|_| "data/companies.json".to_string()),
            weights_path: std::env::var("FAIRPRICE_WEIGHTS")
                .unwrap_or_else(|_| "data/weights.json".to_string()),
            roster_path: std::env::var("FAIRPRICE_ROSTER")
                .unwrap_or_else(|_| "data/roster.json".to_string()),
            markets_path: std::env::var("FAIRPRICE_MARKETS")
                .unwrap_or_else(|_| "data/markets.json".to_string()),
            statements_dir: std::env::var("FAIRPRICE_STATEMENTS")
                .unwrap_or_else(|_| "data/statements".to_string()),
            export_path: std::env::var("FAIRPRICE_EXPORT")
                .unwrap_or_else(|_| "fair_price_results.json".to_string()),
            rate_limit_per_minute: std::env::var("FAIRPRICE_RATE_LIMIT")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            refresh_concurrency: std::env::var("FAIRPRICE_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bucket_thresholds() {
        assert_eq!(SizeBucket::from_market_cap(10_000_000_000.0), SizeBucket::Large);
        assert_eq!(SizeBucket::from_market_cap(9_999_999_999.0), SizeBucket::Mid);
        assert_eq!(SizeBucket::from_market_cap(2_000_000_000.0), SizeBucket::Mid);
        assert_eq!(SizeBucket::from_market_cap(300_000_000.0), SizeBucket::Small);
        assert_eq!(SizeBucket::from_market_cap(299_999_999.0), SizeBucket::Micro);
    }

    #[test]
    fn test_record_accessors_tolerate_absent_sections() {
        let record = CompanyRecord::default();
        assert!(record.eps_series().is_none());
        assert!(record.fcfe_series().is_none());
        assert!(record.per_series().is_none());
        assert!(record.market().is_none());
    }

    #[test]
    fn test_year_series_roundtrip_with_nulls() {
        let mut series = YearSeries::new();
        series.insert(2020, Some(1.5));
        series.insert(2021, None);
        let json = serde_json::to_string(&series).unwrap();
        let back: YearSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&2020), Some(&Some(1.5)));
        assert_eq!(back.get(&2021), Some(&None));
    }
}
