//! Core rate types, the cache and the abstractions the service is built on

pub mod cache;
pub mod clock;
pub mod config;
pub mod conversion;
pub mod currency;
pub mod log;
pub mod rate;
pub mod store;

// Re-export main types for cleaner imports
pub use cache::{CacheState, RateCache, RateSnapshot};
pub use clock::{Clock, SystemClock};
pub use conversion::ConversionRatio;
pub use rate::{ExchangeRate, RateTable};
pub use store::RateStore;
