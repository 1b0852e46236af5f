use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::api::QuoteProvider;
use crate::models::QuoteSnapshot;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Quote client for the public Yahoo Finance quote endpoint.
pub struct YahooClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuote {
    pub symbol: String,
    pub regular_market_price: Option<f64>,
    pub currency: Option<String>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub long_name: Option<String>,
}

/// Map a raw quote into a snapshot. None when the quote carries no price;
/// a priceless quote must leave the stored record untouched.
pub fn snapshot_from_quote(quote: YahooQuote) -> Option<QuoteSnapshot> {
    let price = quote.regular_market_price.filter(|p| *p > 0.0)?;
    Some(QuoteSnapshot {
        symbol: quote.symbol,
        price,
        currency: quote.currency,
        market_cap: quote.market_cap,
        shares_outstanding: quote.shares_outstanding,
        beta: quote.beta,
        week_52_high: quote.fifty_two_week_high,
        week_52_low: quote.fifty_two_week_low,
        trailing_pe: quote.trailing_pe,
        forward_pe: quote.forward_pe,
        peg_ratio: quote.peg_ratio,
        long_name: quote.long_name,
    })
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<QuoteSnapshot>> {
        let url = format!("{}/v7/finance/quote", self.base_url);
        debug!("fetching quote for {}", symbol);

        let envelope: QuoteEnvelope = self
            .client
            .get(&url)
            .query(&[("symbols", symbol)])
            .send()
            .await
            .with_context(|| format!("quote request failed for {}", symbol))?
            .error_for_status()
            .with_context(|| format!("quote request rejected for {}", symbol))?
            .json()
            .await
            .with_context(|| format!("malformed quote response for {}", symbol))?;

        Ok(envelope
            .quote_response
            .result
            .into_iter()
            .next()
            .and_then(snapshot_from_quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_quote(json: &str) -> YahooQuote {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_quote_mapping() {
        let quote = parse_quote(
            r#"{
                "symbol": "MC.PA",
                "regularMarketPrice": 612.4,
                "currency": "EUR",
                "marketCap": 306000000000.0,
                "sharesOutstanding": 500000000.0,
                "fiftyTwoWeekHigh": 800.0,
                "fiftyTwoWeekLow": 550.0,
                "trailingPE": 21.3,
                "forwardPE": 19.8,
                "longName": "LVMH"
            }"#,
        );
        let snapshot = snapshot_from_quote(quote).unwrap();
        assert_eq!(snapshot.symbol, "MC.PA");
        assert_eq!(snapshot.price, 612.4);
        assert_eq!(snapshot.currency.as_deref(), Some("EUR"));
        assert_eq!(snapshot.trailing_pe, Some(21.3));
        assert_eq!(snapshot.beta, None);
    }

    #[test]
    fn test_priceless_quote_is_dropped() {
        let quote = parse_quote(r#"{"symbol": "DEAD"}"#);
        assert!(snapshot_from_quote(quote).is_none());
        let quote = parse_quote(r#"{"symbol": "ZERO", "regularMarketPrice": 0.0}"#);
        assert!(snapshot_from_quote(quote).is_none());
    }

    #[test]
    fn test_envelope_with_empty_result() {
        let envelope: QuoteEnvelope =
            serde_json::from_str(r#"{"quoteResponse": {"result": [], "error": null}}"#).unwrap();
        assert!(envelope.quote_response.result.is_empty());
    }
}
