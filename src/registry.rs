//! Interactive roster registration.
//!
//! Adds tickers to the tracked roster from the terminal: resolve the
//! listing country to an exchange suffix (fuzzy matched, typos happen),
//! build the provider symbol, pull the metadata for confirmation, then
//! append after a duplicate check.

use crate::api::QuoteProvider;
use crate::store::{self, MarketMap, Roster, RosterEntry};
use anyhow::{Context, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::io::{self, Write};
use std::path::Path;

/// Resolve a typed country to `(country, suffix)`. Exact match first, then
/// the best fuzzy match over the known countries.
pub fn match_country(markets: &MarketMap, input: &str) -> Option<(String, String)> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(suffix) = markets.get(&needle) {
        return Some((needle, suffix.clone()));
    }

    let matcher = SkimMatcherV2::default();
    markets
        .iter()
        .filter_map(|(country, suffix)| {
            matcher
                .fuzzy_match(country, &needle)
                .map(|score| (score, country.clone(), suffix.clone()))
        })
        .max_by_key(|(score, _, _)| *score)
        .map(|(_, country, suffix)| (country, suffix))
}

/// Provider symbol for a base ticker on a given exchange.
pub fn build_symbol(base: &str, suffix: &str) -> String {
    let base = base.trim().to_uppercase();
    if suffix.is_empty() || base.ends_with(suffix) {
        base
    } else {
        format!("{}{}", base, suffix)
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "q" | "quit" | "exit")
}

fn print_markets(markets: &MarketMap) {
    println!("   Known markets:");
    for (country, suffix) in markets {
        let suffix = if suffix.is_empty() { "(none)" } else { suffix };
        println!("   {:<18} {}", country, suffix);
    }
}

/// Interactive add loop. 'q' / 'quit' / 'exit' at any prompt exits,
/// 'list' prints the known markets.
pub async fn run_add_workflow(
    provider: &(dyn QuoteProvider + Sync),
    markets: &MarketMap,
    roster_path: &Path,
) -> Result<()> {
    let mut roster = store::load_roster(roster_path)?;

    loop {
        println!();
        let base = prompt("Ticker symbol ('list' for markets, 'q' to quit): ")?;
        if base.is_empty() {
            continue;
        }
        if is_quit(&base) {
            break;
        }
        if base.eq_ignore_ascii_case("list") {
            print_markets(markets);
            continue;
        }

        let country_input = prompt("Listing country: ")?;
        if is_quit(&country_input) {
            break;
        }
        let (country, suffix) = match match_country(markets, &country_input) {
            Some(m) => m,
            None => {
                println!("❌ Unknown country '{}'", country_input);
                continue;
            }
        };
        if country != country_input.trim().to_lowercase() {
            println!("   Matched country: {}", country);
        }

        let symbol = build_symbol(&base, &suffix);
        if roster.contains_ticker(&symbol) {
            println!("⚠️  {} is already tracked", symbol);
            continue;
        }

        println!("🔍 Fetching {}...", symbol);
        let snapshot = match provider.fetch_quote(&symbol).await {
            Ok(Some(s)) => Some(s),
            Ok(None) => {
                println!("⚠️  No quote data for {}; it can still be added manually", symbol);
                None
            }
            Err(e) => {
                println!("⚠️  Quote fetch failed for {}: {}", symbol, e);
                None
            }
        };

        let default_name = snapshot
            .as_ref()
            .and_then(|s| s.long_name.clone())
            .unwrap_or_else(|| base.to_uppercase());
        println!();
        println!("   Ticker:   {}", symbol);
        println!("   Name:     {}", default_name);
        if let Some(s) = &snapshot {
            println!("   Price:    {:.2} {}", s.price, s.currency.as_deref().unwrap_or("?"));
            if let Some(cap) = s.market_cap {
                println!("   Mkt cap:  {:.1} B", cap / 1_000_000_000.0);
            }
        }

        let confirm = prompt("Add this company? (y/n): ")?;
        if !confirm.eq_ignore_ascii_case("y") {
            println!("   Skipped");
            continue;
        }

        let sector = prompt("Sector: ")?;
        let industry = prompt("Industry (optional): ")?;

        let entry = RosterEntry {
            ticker: symbol.clone(),
            name: default_name,
            sector,
            industry,
            country: country.clone(),
            currency: snapshot.as_ref().and_then(|s| s.currency.clone()),
            market_cap: snapshot.as_ref().and_then(|s| s.market_cap),
        };
        if roster.add(entry) {
            store::save_roster(roster_path, &roster)?;
            println!("✅ {} added ({} tracked)", symbol, roster.stocks.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::default_markets;

    #[test]
    fn test_exact_country_match() {
        let markets = default_markets();
        let (country, suffix) = match_country(&markets, "France").unwrap();
        assert_eq!(country, "france");
        assert_eq!(suffix, ".PA");
    }

    #[test]
    fn test_fuzzy_country_match() {
        let markets = default_markets();
        let (country, _) = match_country(&markets, "frnce").unwrap();
        assert_eq!(country, "france");
        let (country, suffix) = match_country(&markets, "netherland").unwrap();
        assert_eq!(country, "netherlands");
        assert_eq!(suffix, ".AS");
    }

    #[test]
    fn test_unmatchable_country() {
        let markets = default_markets();
        assert!(match_country(&markets, "").is_none());
        assert!(match_country(&markets, "zzzzqqqq").is_none());
    }

    #[test]
    fn test_build_symbol() {
        assert_eq!(build_symbol("mc", ".PA"), "MC.PA");
        assert_eq!(build_symbol("MC.PA", ".PA"), "MC.PA");
        assert_eq!(build_symbol("aapl", ""), "AAPL");
    }
}
