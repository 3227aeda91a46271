use crate::core::rate::ExchangeRate;
use crate::core::store::RateStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "exchange_rates";
const CACHED_RATE_KEY: &str = "cached_exchange_rate";
const USER_CURRENCY_KEY: &str = "exchange_currency";

/// Rate store backed by a fjall partition. Values are JSON encoded.
pub struct DiskRateStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            partition,
        })
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.partition.insert(key, value)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Store PUT for key: {:?}", key);
        Ok(())
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn load_cached_rate(&self) -> Result<Option<ExchangeRate>> {
        match self.partition.get(CACHED_RATE_KEY)? {
            Some(value) => {
                let rate = serde_json::from_slice(&value)
                    .context("Failed to decode cached exchange rate")?;
                debug!("Store HIT for key: {:?}", CACHED_RATE_KEY);
                Ok(Some(rate))
            }
            None => {
                debug!("Store MISS for key: {:?}", CACHED_RATE_KEY);
                Ok(None)
            }
        }
    }

    async fn store_cached_rate(&self, rate: &ExchangeRate) -> Result<()> {
        self.put(CACHED_RATE_KEY, serde_json::to_vec(rate)?)
    }

    async fn load_user_currency(&self) -> Result<Option<String>> {
        let value = self.partition.get(USER_CURRENCY_KEY)?;
        Ok(value.map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    async fn store_user_currency(&self, code: &str) -> Result<()> {
        self.put(USER_CURRENCY_KEY, code.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_store_round_trip() {
        let dir = tempdir().unwrap();
        let rate = ExchangeRate::from_fiat_price("GBP", Decimal::new(123, 2), "test").unwrap();

        let store = DiskRateStore::open(&dir.path().join("store")).unwrap();
        assert!(store.load_cached_rate().await.unwrap().is_none());
        assert!(store.load_user_currency().await.unwrap().is_none());

        store.store_cached_rate(&rate).await.unwrap();
        store.store_user_currency("GBP").await.unwrap();

        assert_eq!(store.load_cached_rate().await.unwrap(), Some(rate));
        assert_eq!(
            store.load_user_currency().await.unwrap().as_deref(),
            Some("GBP")
        );
    }

    #[tokio::test]
    async fn test_disk_store_overwrites_rate() {
        let dir = tempdir().unwrap();
        let store = DiskRateStore::open(dir.path()).unwrap();

        let first = ExchangeRate::from_fiat_price("USD", Decimal::ONE, "a").unwrap();
        let second = ExchangeRate::from_fiat_price("EUR", Decimal::TWO, "b").unwrap();
        store.store_cached_rate(&first).await.unwrap();
        store.store_cached_rate(&second).await.unwrap();

        assert_eq!(store.load_cached_rate().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_disk_store_rejects_corrupt_rate() {
        let dir = tempdir().unwrap();
        let store = DiskRateStore::open(dir.path()).unwrap();
        store.put(CACHED_RATE_KEY, b"{not json".to_vec()).unwrap();

        let result = store.load_cached_rate().await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to decode cached exchange rate"
        );
    }
}
