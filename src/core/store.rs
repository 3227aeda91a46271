//! Persistence abstractions for the best-guess rate and the preferred currency

use crate::core::rate::ExchangeRate;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RateStore: Send + Sync {
    /// The rate persisted by the last successful refresh, if any.
    async fn load_cached_rate(&self) -> Result<Option<ExchangeRate>>;

    async fn store_cached_rate(&self, rate: &ExchangeRate) -> Result<()>;

    /// Currency code the user picked, if any.
    async fn load_user_currency(&self) -> Result<Option<String>>;

    async fn store_user_currency(&self, code: &str) -> Result<()>;
}
