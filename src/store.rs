//! JSON document store.
//!
//! Everything persistent lives in four small JSON files: the company
//! records, the weight table, the roster of tracked tickers and the
//! country-to-exchange-suffix map. Load-modify-save; a missing file reads
//! as empty rather than failing, so a fresh checkout works immediately.

use crate::models::{CompanyRecord, WeightEntry, WeightTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store file: {0}")]
    Json(#[from] serde_json::Error),
}

fn read_or_default<T: Default + for<'de> Deserialize<'de>>(
    path: &Path,
) -> Result<T, StoreError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Load the company records, keyed by display name.
pub fn load_companies(path: &Path) -> Result<BTreeMap<String, CompanyRecord>, StoreError> {
    let companies: BTreeMap<String, CompanyRecord> = read_or_default(path)?;
    info!("loaded {} companies from {}", companies.len(), path.display());
    Ok(companies)
}

pub fn save_companies(
    path: &Path,
    companies: &BTreeMap<String, CompanyRecord>,
) -> Result<(), StoreError> {
    write_pretty(path, companies)?;
    info!("saved {} companies to {}", companies.len(), path.display());
    Ok(())
}

/// On-disk weight row; the key lives on the enclosing object.
#[derive(Debug, Serialize, Deserialize)]
struct WeightRow {
    earnings: f64,
    fcf: f64,
    sales: f64,
    ebitda: f64,
    book_value: f64,
    #[serde(default = "default_discount")]
    discount_factor: f64,
}

fn default_discount() -> f64 {
    1.0
}

/// Load the `sector_size` keyed weight table. Absent file means an empty
/// table; the resolver falls back to its hard default profile.
pub fn load_weight_table(path: &Path) -> Result<WeightTable, StoreError> {
    let rows: BTreeMap<String, WeightRow> = read_or_default(path)?;
    let entries = rows
        .into_iter()
        .map(|(key, row)| WeightEntry {
            key,
            earnings: row.earnings,
            fcf: row.fcf,
            sales: row.sales,
            ebitda: row.ebitda,
            book_value: row.book_value,
            discount_factor: row.discount_factor,
        })
        .collect();
    Ok(WeightTable::new(entries))
}

/// One tracked ticker in the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
}

/// The roster of tracked tickers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub stocks: Vec<RosterEntry>,
}

impl Roster {
    pub fn contains_ticker(&self, ticker: &str) -> bool {
        self.stocks
            .iter()
            .any(|e| e.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Append an entry unless the ticker is already tracked. Returns
    /// whether it was added.
    pub fn add(&mut self, entry: RosterEntry) -> bool {
        if self.contains_ticker(&entry.ticker) {
            return false;
        }
        self.stocks.push(entry);
        true
    }
}

pub fn load_roster(path: &Path) -> Result<Roster, StoreError> {
    read_or_default(path)
}

pub fn save_roster(path: &Path, roster: &Roster) -> Result<(), StoreError> {
    write_pretty(path, roster)
}

/// Country name -> ticker suffix for the quote provider (e.g. "france" ->
/// ".PA"). An empty suffix means the ticker is used as-is.
pub type MarketMap = BTreeMap<String, String>;

/// Built-in fallback when no markets file is present.
pub fn default_markets() -> MarketMap {
    [
        ("usa", ""),
        ("united states", ""),
        ("canada", ".TO"),
        ("france", ".PA"),
        ("germany", ".DE"),
        ("netherlands", ".AS"),
        ("belgium", ".BR"),
        ("italy", ".MI"),
        ("spain", ".MC"),
        ("portugal", ".LS"),
        ("united kingdom", ".L"),
        ("switzerland", ".SW"),
        ("sweden", ".ST"),
        ("norway", ".OL"),
        ("denmark", ".CO"),
        ("finland", ".HE"),
        ("austria", ".VI"),
        ("japan", ".T"),
        ("australia", ".AX"),
        ("hong kong", ".HK"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn load_markets(path: &Path) -> Result<MarketMap, StoreError> {
    if !path.exists() {
        return Ok(default_markets());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
