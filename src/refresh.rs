//! Batch quote refresh.
//!
//! Fetches a current snapshot for every company with a ticker and merges
//! it into the record's market section. Historical series are never
//! touched, and a failed fetch leaves the whole record as it was.

use crate::api::{ApiRateLimiter, QuoteProvider};
use crate::models::{CompanyRecord, MarketData, QuoteSnapshot};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct RefreshReport {
    pub updated: usize,
    pub failed: Vec<String>,
    pub skipped: usize,
}

/// Merge a snapshot into the market section. Fields the provider did not
/// return keep their previous value.
fn apply_snapshot(record: &mut CompanyRecord, snapshot: QuoteSnapshot) {
    let previous = record.market.take().unwrap_or_default();
    record.market = Some(MarketData {
        current_price: Some(snapshot.price),
        currency: snapshot.currency.or(previous.currency),
        market_cap: snapshot.market_cap.or(previous.market_cap),
        shares_outstanding: snapshot.shares_outstanding.or(previous.shares_outstanding),
        beta: snapshot.beta.or(previous.beta),
        week_52_high: snapshot.week_52_high.or(previous.week_52_high),
        week_52_low: snapshot.week_52_low.or(previous.week_52_low),
        trailing_pe: snapshot.trailing_pe.or(previous.trailing_pe),
        forward_pe: snapshot.forward_pe.or(previous.forward_pe),
        peg_ratio: snapshot.peg_ratio.or(previous.peg_ratio),
        updated_at: Some(Utc::now()),
    });
}

/// Refresh every company's market snapshot, a few requests in flight at a
/// time. Companies without a ticker are counted as skipped.
pub async fn refresh_quotes(
    provider: &(dyn QuoteProvider + Sync),
    companies: &mut BTreeMap<String, CompanyRecord>,
    rate_limit_per_minute: u32,
    concurrency: usize,
) -> RefreshReport {
    let limiter = ApiRateLimiter::new(rate_limit_per_minute);

    let mut report = RefreshReport::default();
    let targets: Vec<(String, String)> = companies
        .iter()
        .filter_map(|(name, record)| {
            if record.info.ticker.is_empty() {
                report.skipped += 1;
                None
            } else {
                Some((name.clone(), record.info.ticker.clone()))
            }
        })
        .collect();

    info!("refreshing quotes for {} companies", targets.len());

    let results: Vec<(String, String, anyhow::Result<Option<QuoteSnapshot>>)> =
        stream::iter(targets)
            .map(|(name, ticker)| {
                let limiter = &limiter;
                async move {
                    limiter.wait().await;
                    let result = provider.fetch_quote(&ticker).await;
                    (name, ticker, result)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    for (name, ticker, result) in results {
        match result {
            Ok(Some(snapshot)) => {
                if let Some(record) = companies.get_mut(&name) {
                    apply_snapshot(record, snapshot);
                    report.updated += 1;
                }
            }
            Ok(None) => {
                warn!("no quote data for {} ({})", name, ticker);
                report.failed.push(name);
            }
            Err(e) => {
                warn!("quote fetch failed for {} ({}): {}", name, ticker, e);
                report.failed.push(name);
            }
        }
    }

    info!(
        "refresh done: {} updated, {} failed, {} skipped",
        report.updated,
        report.failed.len(),
        report.skipped
    );
    report
}
