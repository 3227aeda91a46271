//! The exchange rate service: answers rate queries from the cache and refreshes
//! it from the upstream feeds when it goes stale.
//!
//! Readers always see the last fully committed table. A refresh runs behind a
//! gate, so concurrent stale queries share a single round of network calls,
//! and it either commits a complete new table or leaves the cache as it was.

use crate::core::cache::{CacheState, RateCache};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::conversion::{ConversionRatio, derive_rates};
use crate::core::currency::{CurrencyFallback, locale_currency, normalize_currency_code};
use crate::core::rate::{ExchangeRate, RateTable};
use crate::core::store::RateStore;
use crate::providers::aggregator::{AGGREGATOR_SOURCE, AggregatorProvider};
use crate::providers::error::{FeedError, SkippedEntry};
use crate::providers::http::{HttpFetcher, ReqwestFetcher};
use crate::providers::ticker::TickerProvider;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub refresh_interval: Duration,
    pub fallback_currency: String,
    pub locale_currency: Option<String>,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        ServiceSettings {
            refresh_interval: config.refresh_interval(),
            fallback_currency: config.fallback_currency.clone(),
            locale_currency: locale_currency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Exact code, with the currency fallback chain applied.
    Code(String),
    /// Case-insensitive substring of the code or its symbol.
    Search(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuery {
    pub selection: Selection,
    /// Serve whatever is cached and never touch the network.
    pub offline: bool,
}

impl RateQuery {
    pub fn all() -> Self {
        RateQuery {
            selection: Selection::All,
            offline: false,
        }
    }

    pub fn code(code: &str) -> Self {
        RateQuery {
            selection: Selection::Code(code.to_string()),
            offline: false,
        }
    }

    pub fn search(text: &str) -> Self {
        RateQuery {
            selection: Selection::Search(text.to_string()),
            offline: false,
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }
}

/// Outcome of a committed refresh.
#[derive(Debug)]
pub struct RefreshSummary {
    pub entries: usize,
    pub skipped: Vec<SkippedEntry>,
    pub ratio: ConversionRatio,
    pub updated_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Conversion ratio unknown: {0:#}")]
    ConversionUnavailable(#[source] anyhow::Error),

    #[error("Exchange rates unavailable: {0:#}")]
    AggregatorUnavailable(#[source] anyhow::Error),

    #[error("Conversion ratio {0} cannot be applied")]
    InvalidRatio(f64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub state: CacheState,
    pub last_updated: Option<DateTime<Utc>>,
    pub entries: usize,
}

pub struct ExchangeRateService {
    aggregator: AggregatorProvider,
    ticker: TickerProvider,
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
    cache: RateCache,
    // Last known ratio. Holding this lock is what makes a refresh exclusive.
    refresh_gate: Mutex<Option<ConversionRatio>>,
}

impl ExchangeRateService {
    /// Creates the service and seeds the cache from the persisted rate, if any.
    pub async fn activate(
        aggregator: AggregatorProvider,
        ticker: TickerProvider,
        store: Arc<dyn RateStore>,
        settings: ServiceSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = match store.load_cached_rate().await {
            Ok(Some(rate)) if rate.is_usable() => RateCache::seeded(rate),
            Ok(Some(rate)) => {
                warn!(?rate, "Ignoring unusable cached exchange rate");
                RateCache::new()
            }
            Ok(None) => RateCache::new(),
            Err(e) => {
                warn!("Ignoring unreadable cached exchange rate: {e:#}");
                RateCache::new()
            }
        };

        ExchangeRateService {
            aggregator,
            ticker,
            store,
            clock,
            settings,
            cache,
            refresh_gate: Mutex::new(None),
        }
    }

    /// Wires the service to the configured feeds over HTTP.
    pub async fn from_config(config: &AppConfig, store: Arc<dyn RateStore>) -> Result<Self> {
        let fetcher: Arc<dyn HttpFetcher> =
            Arc::new(ReqwestFetcher::new(&config.user_agent, config.request_retries)?);
        let aggregator =
            AggregatorProvider::new(&config.providers.aggregator.url, Arc::clone(&fetcher));
        let ticker = TickerProvider::new(&config.providers.ticker.url, fetcher);

        Ok(Self::activate(
            aggregator,
            ticker,
            store,
            ServiceSettings::from_config(config),
            Arc::new(SystemClock),
        )
        .await)
    }

    /// Answers a query. `None` means there is no rate data at all.
    pub async fn query(&self, query: &RateQuery) -> Option<Vec<ExchangeRate>> {
        if !query.offline {
            self.refresh_if_due().await;
        }

        let snapshot = self.cache.snapshot();
        let table = snapshot.table.as_ref()?;
        let rows = match &query.selection {
            Selection::All => table.iter().cloned().collect(),
            Selection::Search(text) => table.search(text),
            Selection::Code(code) => self
                .best_rate(table, Some(code.as_str()))
                .await
                .into_iter()
                .cloned()
                .collect(),
        };
        Some(rows)
    }

    /// Rate for `code`, or for the first currency of the fallback chain that has one.
    pub async fn lookup(&self, code: &str, offline: bool) -> Option<ExchangeRate> {
        self.resolve(Some(code), offline).await
    }

    /// Rate for the preferred, locale or fallback currency, in that order.
    pub async fn default_rate(&self, offline: bool) -> Option<ExchangeRate> {
        self.resolve(None, offline).await
    }

    async fn resolve(&self, requested: Option<&str>, offline: bool) -> Option<ExchangeRate> {
        if !offline {
            self.refresh_if_due().await;
        }
        let snapshot = self.cache.snapshot();
        let table = snapshot.table.as_ref()?;
        self.best_rate(table, requested).await.cloned()
    }

    pub async fn search(&self, text: &str, offline: bool) -> Option<Vec<ExchangeRate>> {
        self.query(&RateQuery::search(text).offline(offline)).await
    }

    pub async fn all(&self, offline: bool) -> Option<Vec<ExchangeRate>> {
        self.query(&RateQuery::all().offline(offline)).await
    }

    /// Fiat units worth `coin_units`, with the rate used.
    pub async fn convert(
        &self,
        coin_units: i64,
        code: Option<&str>,
        offline: bool,
    ) -> Option<(ExchangeRate, i64)> {
        let rate = self.resolve(code, offline).await?;
        let fiat_units = rate.coin_to_fiat(coin_units)?;
        Some((rate, fiat_units))
    }

    pub fn state(&self) -> ServiceStatus {
        let snapshot = self.cache.snapshot();
        ServiceStatus {
            state: snapshot.state,
            last_updated: snapshot.last_updated,
            entries: snapshot.table.as_ref().map_or(0, RateTable::len),
        }
    }

    pub async fn user_currency(&self) -> Option<String> {
        match self.store.load_user_currency().await {
            Ok(code) => code.map(|code| normalize_currency_code(&code)),
            Err(e) => {
                warn!("Problem reading preferred currency: {e:#}");
                None
            }
        }
    }

    /// Stores the preferred currency and returns the code as stored.
    pub async fn set_user_currency(&self, code: &str) -> Result<String> {
        let code = normalize_currency_code(code);
        self.store.store_user_currency(&code).await?;
        Ok(code)
    }

    /// Refreshes regardless of staleness. Waits for a refresh already in flight.
    pub async fn refresh_now(&self) -> Result<RefreshSummary, RefreshError> {
        let mut last_ratio = self.refresh_gate.lock().await;
        self.refresh_locked(&mut last_ratio).await
    }

    async fn refresh_if_due(&self) {
        let interval = self.settings.refresh_interval;
        if !self.cache.is_stale(self.clock.now(), interval) {
            debug!("Exchange rates are fresh");
            return;
        }

        let mut last_ratio = self.refresh_gate.lock().await;
        // Someone else may have refreshed while we waited for the gate
        if !self.cache.is_stale(self.clock.now(), interval) {
            debug!("Exchange rates refreshed by another caller");
            return;
        }

        if let Err(e) = self.refresh_locked(&mut last_ratio).await {
            warn!("Exchange rate refresh skipped: {e}");
        }
    }

    #[instrument(name = "RefreshRates", skip_all)]
    async fn refresh_locked(
        &self,
        last_ratio: &mut Option<ConversionRatio>,
    ) -> Result<RefreshSummary, RefreshError> {
        let ratio = match self.ticker.fetch_ratio().await {
            Ok(ratio) => {
                *last_ratio = Some(ratio);
                ratio
            }
            Err(e) => match *last_ratio {
                Some(ratio) => {
                    debug!(
                        "Problem fetching conversion ratio, keeping {}: {e:#}",
                        ratio.value()
                    );
                    ratio
                }
                None => {
                    debug!("Problem fetching conversion ratio: {e:#}");
                    return Err(RefreshError::ConversionUnavailable(e));
                }
            },
        };

        let batch = self
            .aggregator
            .fetch_quotes()
            .await
            .map_err(RefreshError::AggregatorUnavailable)?;
        let table = derive_rates(&batch.quotes, ratio, AGGREGATOR_SOURCE)
            .ok_or(RefreshError::InvalidRatio(ratio.value()))?;

        let mut skipped = batch.skipped;
        for (code, day_average) in &batch.quotes {
            if !table.contains(code) {
                warn!(%code, %day_average, "Dropping quote without a usable rate");
                skipped.push(SkippedEntry {
                    pair: format!("BTC{code}"),
                    error: FeedError::Underivable {
                        value: day_average.to_string(),
                    },
                });
            }
        }

        let updated_at = self.clock.now();
        let entries = table.len();
        let representative = self.best_rate(&table, None).await.cloned();
        self.cache.replace(table, updated_at);

        if let Some(rate) = representative {
            if let Err(e) = self.store.store_cached_rate(&rate).await {
                warn!("Problem persisting {} exchange rate: {e:#}", rate.currency_code);
            }
        }

        info!(
            entries,
            skipped = skipped.len(),
            ratio = ratio.value(),
            "Exchange rates updated"
        );
        Ok(RefreshSummary {
            entries,
            skipped,
            ratio,
            updated_at,
        })
    }

    /// requested → preferred → locale → fallback currency.
    async fn best_rate<'t>(
        &self,
        table: &'t RateTable,
        requested: Option<&str>,
    ) -> Option<&'t ExchangeRate> {
        let chain = CurrencyFallback::new()
            .then(requested.map(normalize_currency_code))
            .then(self.user_currency().await)
            .then(self.settings.locale_currency.as_deref())
            .then(Some(self.settings.fallback_currency.as_str()));
        chain.resolve(table)
    }
}
