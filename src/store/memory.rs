use crate::core::rate::ExchangeRate;
use crate::core::store::RateStore;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Stored {
    rate: Option<ExchangeRate>,
    currency: Option<String>,
}

/// In-memory rate store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryRateStore {
    inner: Mutex<Stored>,
}

impl MemoryRateStore {
    /// Creates a new, empty MemoryRateStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a best-guess rate
    pub fn with_cached_rate(rate: ExchangeRate) -> Self {
        Self {
            inner: Mutex::new(Stored {
                rate: Some(rate),
                currency: None,
            }),
        }
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn load_cached_rate(&self) -> Result<Option<ExchangeRate>> {
        Ok(self.inner.lock().await.rate.clone())
    }

    async fn store_cached_rate(&self, rate: &ExchangeRate) -> Result<()> {
        debug!(currency = %rate.currency_code, "Store PUT cached rate");
        self.inner.lock().await.rate = Some(rate.clone());
        Ok(())
    }

    async fn load_user_currency(&self) -> Result<Option<String>> {
        Ok(self.inner.lock().await.currency.clone())
    }

    async fn store_user_currency(&self, code: &str) -> Result<()> {
        debug!(currency = code, "Store PUT user currency");
        self.inner.lock().await.currency = Some(code.to_string());
        Ok(())
    }
}
