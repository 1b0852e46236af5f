use anyhow::Result;
use std::time::Duration;

use crate::models::QuoteSnapshot;

pub mod yahoo_client;
pub use yahoo_client::YahooClient;

/// Simple rate limiter for API requests
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}

/// Common trait for quote providers. Ok(None) means the provider answered
/// but had nothing for the symbol; Err is a transport or protocol fault.
#[async_trait::async_trait]
pub trait QuoteProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<QuoteSnapshot>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = ApiRateLimiter::new(60); // 60 requests per minute

        let start = std::time::Instant::now();

        limiter.wait().await;
        limiter.wait().await;
        // With 60 req/min, each wait should be ~1 second; be lenient.
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
