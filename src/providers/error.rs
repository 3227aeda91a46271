use thiserror::Error;

/// Decode failures for the upstream feeds.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The body as a whole could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(#[source] serde_json::Error),

    /// One aggregator entry does not match the expected schema.
    #[error("Unexpected entry layout: {0}")]
    InvalidEntry(#[source] serde_json::Error),

    #[error("Pair without a fiat code: {0}")]
    InvalidPair(String),

    #[error("Not a decimal: '{value}'")]
    InvalidDecimal { value: String },

    #[error("Not a number: '{value}'")]
    InvalidNumber { value: String },

    #[error("Ticker response holds no entries")]
    EmptyTicker,

    /// Decoded, but no positive rate representable in fiat units derives from it.
    #[error("No usable rate derives from '{value}'")]
    Underivable { value: String },

    /// Parsed, but zero, negative or not finite.
    #[error("Conversion ratio out of range: {0}")]
    InvalidRatio(f64),
}

/// An aggregator entry left out of a batch, and why.
#[derive(Debug)]
pub struct SkippedEntry {
    pub pair: String,
    pub error: FeedError,
}
