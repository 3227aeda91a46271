pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::store::RateStore;
use disk::DiskRateStore;
use memory::MemoryRateStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the persistent store under the configured data path. Falls back to an
/// in-memory store when the disk store cannot be opened, so rates can still be
/// served; nothing is persisted in that case.
pub fn open_rate_store(config: &AppConfig) -> Arc<dyn RateStore> {
    let opened = config
        .default_data_path()
        .and_then(|path| DiskRateStore::open(&path.join("store")));

    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Persistent store unavailable, rates will not be kept: {e:#}");
            Arc::new(MemoryRateStore::new())
        }
    }
}
