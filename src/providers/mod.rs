pub mod aggregator;
pub mod error;
pub mod http;
pub mod ticker;
pub mod util;

pub use aggregator::{AggregatorBatch, AggregatorProvider};
pub use error::{FeedError, SkippedEntry};
pub use http::{HttpFetcher, ReqwestFetcher};
pub use ticker::TickerProvider;
