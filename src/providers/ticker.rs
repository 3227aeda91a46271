use crate::core::conversion::ConversionRatio;
use crate::providers::error::FeedError;
use crate::providers::http::HttpFetcher;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const TICKER_SOURCE: &str = "coinmarketcap.com";

#[derive(Debug, Deserialize)]
struct TickerEntry {
    price_btc: String,
}

/// Reads the DOGM/BTC ratio from element 0 of the ticker array.
pub fn parse_ticker(body: &str) -> Result<ConversionRatio, FeedError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(FeedError::Malformed)?;
    let first = entries.into_iter().next().ok_or(FeedError::EmptyTicker)?;
    let entry: TickerEntry = serde_json::from_value(first).map_err(FeedError::InvalidEntry)?;

    let value: f64 = entry
        .price_btc
        .trim()
        .parse()
        .map_err(|_| FeedError::InvalidNumber {
            value: entry.price_btc.clone(),
        })?;
    ConversionRatio::new(value).ok_or(FeedError::InvalidRatio(value))
}

pub struct TickerProvider {
    url: String,
    fetcher: Arc<dyn HttpFetcher>,
}

impl TickerProvider {
    pub fn new(url: &str, fetcher: Arc<dyn HttpFetcher>) -> Self {
        TickerProvider {
            url: url.to_string(),
            fetcher,
        }
    }

    #[instrument(name = "TickerFetch", skip(self), fields(url = %self.url))]
    pub async fn fetch_ratio(&self) -> Result<ConversionRatio> {
        let body = self.fetcher.fetch(&self.url).await?;
        let ratio = parse_ticker(&body)
            .with_context(|| format!("Failed to parse ticker response from {}", self.url))?;
        debug!(ratio = ratio.value(), source = TICKER_SOURCE, "Fetched conversion ratio");
        Ok(ratio)
    }
}
