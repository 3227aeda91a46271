//! BTC/fiat day averages from the aggregator feed.
//!
//! The feed is one JSON object keyed by `"BTC" + fiat code`:
//!
//! ```json
//! { "BTCUSD": { "averages": { "day": "50000.12" } }, "BTCEUR": { ... } }
//! ```
//!
//! Entries are decoded one by one; a bad entry is skipped and reported in
//! [`AggregatorBatch::skipped`] without affecting the others.

use crate::core::rate::PRIMARY_UNIT_CODES;
use crate::providers::error::{FeedError, SkippedEntry};
use crate::providers::http::HttpFetcher;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Source label carried by every rate derived from this feed.
pub const AGGREGATOR_SOURCE: &str = "BitcoinAverage.com";

const PAIR_PREFIX: &str = "BTC";

#[derive(Debug, Deserialize)]
struct AggregatorEntry {
    averages: Averages,
}

#[derive(Debug, Deserialize)]
struct Averages {
    day: DecimalValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DecimalValue {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalValue {
    fn to_decimal(&self) -> Result<Decimal, FeedError> {
        let text = match self {
            DecimalValue::Text(text) => text.trim().to_string(),
            DecimalValue::Number(number) => number.to_string(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| FeedError::InvalidDecimal { value: text })
    }
}

/// Decoded BTC quotes keyed by fiat code, plus the entries that were skipped.
#[derive(Debug, Default)]
pub struct AggregatorBatch {
    pub quotes: BTreeMap<String, Decimal>,
    pub skipped: Vec<SkippedEntry>,
}

fn parse_entry(value: serde_json::Value) -> Result<Decimal, FeedError> {
    let entry: AggregatorEntry = serde_json::from_value(value).map_err(FeedError::InvalidEntry)?;
    entry.averages.day.to_decimal()
}

/// Decodes a full aggregator body. Only a body that is not a JSON object fails.
pub fn parse_aggregator(body: &str) -> Result<AggregatorBatch, FeedError> {
    let pairs: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(body).map_err(FeedError::Malformed)?;

    let mut batch = AggregatorBatch::default();
    for (pair, value) in pairs {
        let Some(fiat_code) = pair.strip_prefix(PAIR_PREFIX) else {
            continue;
        };
        if PRIMARY_UNIT_CODES.contains(&fiat_code) {
            debug!(%pair, "Skipping self-rate pair");
            continue;
        }
        if fiat_code.is_empty() {
            batch.skipped.push(SkippedEntry {
                error: FeedError::InvalidPair(pair.clone()),
                pair,
            });
            continue;
        }

        match parse_entry(value) {
            Ok(day_average) => {
                batch.quotes.insert(fiat_code.to_string(), day_average);
            }
            Err(error) => {
                warn!(%pair, %error, "Problem decoding exchange rate entry");
                batch.skipped.push(SkippedEntry { pair, error });
            }
        }
    }
    Ok(batch)
}

pub struct AggregatorProvider {
    url: String,
    fetcher: Arc<dyn HttpFetcher>,
}

impl AggregatorProvider {
    pub fn new(url: &str, fetcher: Arc<dyn HttpFetcher>) -> Self {
        AggregatorProvider {
            url: url.to_string(),
            fetcher,
        }
    }

    #[instrument(name = "AggregatorFetch", skip(self), fields(url = %self.url))]
    pub async fn fetch_quotes(&self) -> Result<AggregatorBatch> {
        let started = Instant::now();
        let body = self.fetcher.fetch(&self.url).await?;
        let batch = parse_aggregator(&body)
            .with_context(|| format!("Failed to parse aggregator response from {}", self.url))?;

        info!(
            "Fetched {} exchange rates from {}, {} chars, took {:?}",
            batch.quotes.len(),
            self.url,
            body.len(),
            started.elapsed()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_skips_bad_entries_but_keeps_batch() {
        let body = r#"{
            "BTCUSD": {"averages": {"day": "123.45"}, "last": 1},
            "BTCXXX": {"averages": {"day": "bad"}},
            "BTCEUR": {"averages": {"week": "1.0"}},
            "BTCGBP": {"averages": {"day": 99.5}}
        }"#;

        let batch = parse_aggregator(body).unwrap();
        assert_eq!(batch.quotes.len(), 2);
        assert_eq!(batch.quotes["USD"], dec("123.45"));
        assert_eq!(batch.quotes["GBP"], dec("99.5"));

        let mut skipped = batch.skipped;
        skipped.sort_by(|a, b| a.pair.cmp(&b.pair));
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].pair, "BTCEUR");
        assert!(matches!(skipped[0].error, FeedError::InvalidEntry(_)));
        assert_eq!(skipped[1].pair, "BTCXXX");
        assert!(matches!(
            skipped[1].error,
            FeedError::InvalidDecimal { ref value } if value == "bad"
        ));
    }

    #[test]
    fn test_parse_ignores_self_rates_and_foreign_pairs() {
        let body = r#"{
            "BTCBTC": {"averages": {"day": "1"}},
            "BTCmBTC": {"averages": {"day": "1000"}},
            "BTCµBTC": {"averages": {"day": "1000000"}},
            "ETHUSD": {"averages": {"day": "3000"}},
            "BTC": {"averages": {"day": "1"}},
            "BTCJPY": {"averages": {"day": "7000000"}}
        }"#;

        let batch = parse_aggregator(body).unwrap();
        assert_eq!(batch.quotes.keys().collect::<Vec<_>>(), vec!["JPY"]);
        assert_eq!(batch.skipped.len(), 1);
        assert!(matches!(batch.skipped[0].error, FeedError::InvalidPair(_)));
    }

    #[test]
    fn test_parse_accepts_scientific_notation() {
        let body = r#"{"BTCUSD": {"averages": {"day": "5e4"}}}"#;
        let batch = parse_aggregator(body).unwrap();
        assert_eq!(batch.quotes["USD"], dec("50000"));
    }

    #[test]
    fn test_parse_rejects_non_object_body() {
        assert!(matches!(
            parse_aggregator("[1, 2, 3]"),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            parse_aggregator("<html>"),
            Err(FeedError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_quotes_from_server() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indices/global/ticker/short"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"BTCUSD": {"averages": {"day": "50000.00000000"}}}"#,
            ))
            .mount(&mock_server)
            .await;

        let fetcher = Arc::new(crate::providers::ReqwestFetcher::new("test", 0).unwrap());
        let provider = AggregatorProvider::new(
            &format!("{}/indices/global/ticker/short", mock_server.uri()),
            fetcher,
        );

        let batch = provider.fetch_quotes().await.unwrap();
        assert_eq!(batch.quotes["USD"], dec("50000"));
        assert!(batch.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_quotes_reports_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let fetcher = Arc::new(crate::providers::ReqwestFetcher::new("test", 0).unwrap());
        let provider = AggregatorProvider::new(&mock_server.uri(), fetcher);

        let result = provider.fetch_quotes().await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Failed to parse aggregator response")
        );
    }
}
