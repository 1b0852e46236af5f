//! Statement extraction from exported CSV spreadsheets.
//!
//! Each company has a directory of CSV files (one per statement, layout:
//! row label in the first column, one column per year). Row labels are
//! matched through normalization and an alias list, so exports from
//! different sources land on the same fields. Cell values carry the usual
//! spreadsheet noise: comma decimals, thousands spaces, currency symbols,
//! `%` / `x` suffixes and M / Md / B magnitude suffixes.

use crate::models::{
    BalanceSheet, CashFlow, CompanyRecord, IncomeStatement, RatioHistory, YearSeries,
};
use crate::store::Roster;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Lowercase and strip everything but letters, digits and '/'. The slash
/// survives so "P/E" and "EV/EBITDA" stay distinguishable.
pub fn normalize_label(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '/')
        .collect()
}

/// Parse one spreadsheet cell into a number, or None when it is blank or
/// not numeric. Handles comma decimals, currency symbols, percentage and
/// multiple suffixes, and k / M / Md / B magnitudes.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '\u{a0}' | '€' | '$' | '£'))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    let lower = cleaned.to_lowercase().replace(',', ".");
    if matches!(lower.as_str(), "n/a" | "na" | "nd") {
        return None;
    }

    let (body, multiplier) = if let Some(b) = lower.strip_suffix("md") {
        (b, 1_000_000_000.0)
    } else if let Some(b) = lower.strip_suffix('b') {
        (b, 1_000_000_000.0)
    } else if let Some(b) = lower.strip_suffix('m') {
        (b, 1_000_000.0)
    } else if let Some(b) = lower.strip_suffix('k') {
        (b, 1_000.0)
    } else if let Some(b) = lower.strip_suffix('%') {
        (b, 1.0)
    } else if let Some(b) = lower.strip_suffix('x') {
        (b, 1.0)
    } else {
        (lower.as_str(), 1.0)
    };

    body.parse::<f64>().ok().map(|v| v * multiplier)
}

fn parse_year(header: &str) -> Option<i32> {
    let year: i32 = header.trim().parse().ok()?;
    (1900..2100).contains(&year).then_some(year)
}

/// All labeled rows found across a company's statement files.
#[derive(Debug, Default)]
pub struct ExtractedStatements {
    rows: BTreeMap<String, YearSeries>,
}

impl ExtractedStatements {
    /// First alias with a matching row.
    fn series(&self, aliases: &[&str]) -> Option<YearSeries> {
        aliases.iter().find_map(|a| self.rows.get(*a).cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse one statement CSV into normalized-label rows. Columns whose
/// header is not a year are ignored.
pub fn parse_statement_csv(path: &Path) -> Result<BTreeMap<String, YearSeries>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    let mut records = reader.records();
    let header = match records.next() {
        Some(h) => h?,
        None => return Ok(BTreeMap::new()),
    };

    // Column index -> year, skipping the label column and any non-year
    // columns (TTM, estimates, blank).
    let year_columns: Vec<(usize, i32)> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, cell)| parse_year(cell).map(|y| (idx, y)))
        .collect();

    let mut rows = BTreeMap::new();
    for record in records {
        let record = record?;
        let label = normalize_label(record.get(0).unwrap_or(""));
        if label.is_empty() {
            continue;
        }
        let mut series = YearSeries::new();
        for (idx, year) in &year_columns {
            let cell = record.get(*idx).unwrap_or("");
            series.insert(*year, parse_cell(cell));
        }
        rows.insert(label, series);
    }
    Ok(rows)
}

/// Parse every CSV in a company directory into one row collection.
pub fn extract_dir(dir: &Path) -> Result<ExtractedStatements> {
    let mut extracted = ExtractedStatements::default();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    entries.sort();

    for path in entries {
        match parse_statement_csv(&path) {
            Ok(rows) => extracted.rows.extend(rows),
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    Ok(extracted)
}

/// Replace a record's historical sections with the extracted rows. The
/// market section is never touched here; quotes have their own job.
pub fn apply_statements(record: &mut CompanyRecord, extracted: &ExtractedStatements) {
    let income = IncomeStatement {
        revenue: extracted.series(&["revenue", "sales", "totalrevenue", "chiffredaffaires"]),
        eps: extracted.series(&["eps", "earningspershare", "dilutedeps", "bpa", "beneficeparaction"]),
        ebitda: extracted.series(&["ebitda"]),
        net_income: extracted.series(&["netincome", "resultatnet"]),
        dividend_per_share: extracted.series(&["dividendpershare", "dps", "dividend", "dividendeparaction"]),
    };
    let balance = BalanceSheet {
        total_equity: extracted.series(&["totalequity", "shareholdersequity", "bookvalue", "capitauxpropres"]),
        total_debt: extracted.series(&["totaldebt", "dettetotale"]),
        net_debt: extracted.series(&["netdebt", "dettenette"]),
    };
    let cash_flow = CashFlow {
        fcfe: extracted.series(&["freecashflow", "fcf", "freecashflowtoequity"]),
        operating_cash_flow: extracted.series(&["operatingcashflow", "cashflowfromoperations"]),
        capex: extracted.series(&["capex", "capitalexpenditure", "capitalexpenditures"]),
    };
    let ratios = RatioHistory {
        per: extracted.series(&["per", "pe", "p/e", "priceearnings"]),
        fcf_yield: extracted.series(&["fcfyield", "freecashflowyield", "rendementfcf"]),
        ev_to_ebitda: extracted.series(&["evebitda", "ev/ebitda", "enterprisevaluetoebitda"]),
    };

    if income.revenue.is_some()
        || income.eps.is_some()
        || income.ebitda.is_some()
        || income.net_income.is_some()
        || income.dividend_per_share.is_some()
    {
        record.income_statement = Some(income);
    }
    if balance.total_equity.is_some() || balance.total_debt.is_some() || balance.net_debt.is_some()
    {
        record.balance_sheet = Some(balance);
    }
    if cash_flow.fcfe.is_some()
        || cash_flow.operating_cash_flow.is_some()
        || cash_flow.capex.is_some()
    {
        record.cash_flow = Some(cash_flow);
    }
    if ratios.per.is_some() || ratios.fcf_yield.is_some() || ratios.ev_to_ebitda.is_some() {
        record.ratios = Some(ratios);
    }
}

#[derive(Debug, Default)]
pub struct ExtractReport {
    pub extracted: Vec<String>,
    pub empty: Vec<String>,
}

/// Match a statement directory to a roster entry by normalized name
/// containment, either direction.
fn match_roster<'a>(roster: &'a Roster, dir_name: &str) -> Option<&'a crate::store::RosterEntry> {
    let needle = normalize_label(dir_name);
    if needle.is_empty() {
        return None;
    }
    roster.stocks.iter().find(|e| {
        let name = normalize_label(&e.name);
        name.contains(&needle) || needle.contains(&name)
    })
}

/// Walk the statements directory and merge every company's extracted
/// history into the store map, creating records for new companies. An
/// optional filter restricts the run to directories matching that name.
pub fn run_extraction(
    statements_dir: &Path,
    companies: &mut BTreeMap<String, CompanyRecord>,
    roster: &Roster,
    only: Option<&str>,
) -> Result<ExtractReport> {
    let filter = only.map(normalize_label).filter(|f| !f.is_empty());
    let mut report = ExtractReport::default();
    let mut dirs: Vec<_> = std::fs::read_dir(statements_dir)
        .with_context(|| format!("cannot read {}", statements_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    for dir in dirs {
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(f) = &filter {
            let normalized = normalize_label(&dir_name);
            if !normalized.contains(f.as_str()) && !f.contains(normalized.as_str()) {
                continue;
            }
        }
        let extracted = extract_dir(&dir)?;
        if extracted.is_empty() {
            debug!("no usable rows under {}", dir.display());
            report.empty.push(dir_name);
            continue;
        }

        let roster_entry = match_roster(roster, &dir_name);
        let name = roster_entry
            .map(|e| e.name.clone())
            .unwrap_or_else(|| dir_name.clone());

        let record = companies.entry(name.clone()).or_default();
        if let Some(entry) = roster_entry {
            record.info.ticker = entry.ticker.clone();
            record.info.sector = entry.sector.clone();
            record.info.industry = entry.industry.clone();
            record.info.country = entry.country.clone();
        }
        apply_statements(record, &extracted);
        report.extracted.push(name);
    }

    info!(
        "extraction done: {} companies, {} empty directories",
        report.extracted.len(),
        report.empty.len()
    );
    Ok(report)
}
