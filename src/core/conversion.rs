//! Derives secondary-coin fiat rates from BTC quotes and the DOGM/BTC ratio.

use crate::core::rate::{
    COIN_UNIT, ExchangeRate, FIAT_EXPONENT, MILLI_PRIMARY_CODE, RateTable, SECONDARY_COIN_CODE,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// Source label of the synthetic milli-BTC entry.
pub const MILLI_PRIMARY_SOURCE: &str = "conversion";
/// Source label of the synthetic 1:1 entry.
pub const SELF_SOURCE: &str = "priceofdogm.com";

const DERIVED_SCALE: u32 = 8;
const MILLI_SCALE: u32 = 4;

/// Value of one secondary coin expressed in primary coin. Always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRatio(f64);

impl ConversionRatio {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(ConversionRatio(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Exact decimal for the ratio's shortest float representation.
    pub fn as_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.0.to_string())
            .ok()
            .or_else(|| Decimal::from_f64(self.0))
    }
}

/// `primary × ratio`, rounded half-up to 8 decimals and turned into a rate.
///
/// Returns `None` on overflow or when the result is not strictly positive.
pub fn derive_rate(
    currency_code: &str,
    primary: Decimal,
    ratio: Decimal,
    source: &str,
) -> Option<ExchangeRate> {
    let price = primary
        .checked_mul(ratio)?
        .round_dp_with_strategy(DERIVED_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let rate = ExchangeRate::from_fiat_price(currency_code, price, source)?;
    if rate.fiat_amount <= 0 {
        debug!(currency_code, %price, "Discarding non-positive rate");
        return None;
    }
    Some(rate)
}

/// Milli-BTC entry: `ratio × 1000`, rounded half-up to 4 decimals.
///
/// Returns `None` when that rounds to zero.
pub fn milli_primary_rate(ratio: ConversionRatio) -> Option<ExchangeRate> {
    let price = ratio
        .as_decimal()?
        .checked_mul(Decimal::from(1000))?
        .round_dp_with_strategy(MILLI_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let rate = ExchangeRate::from_fiat_price(MILLI_PRIMARY_CODE, price, MILLI_PRIMARY_SOURCE)?;
    if rate.fiat_amount <= 0 {
        debug!(%price, "Discarding non-positive milli rate");
        return None;
    }
    Some(rate)
}

/// The secondary coin valued at exactly one unit of itself.
pub fn self_rate() -> ExchangeRate {
    ExchangeRate {
        currency_code: SECONDARY_COIN_CODE.to_string(),
        coin_amount: COIN_UNIT,
        fiat_amount: 10_i64.pow(FIAT_EXPONENT),
        source: SELF_SOURCE.to_string(),
    }
}

/// Builds the full table from BTC/fiat quotes, plus the two synthetic entries.
pub fn derive_rates(
    quotes: &BTreeMap<String, Decimal>,
    ratio: ConversionRatio,
    source: &str,
) -> Option<RateTable> {
    let ratio_decimal = ratio.as_decimal()?;
    let mut table = RateTable::new();

    for (code, primary) in quotes {
        if let Some(rate) = derive_rate(code, *primary, ratio_decimal, source) {
            table.insert(rate);
        }
    }

    if let Some(milli) = milli_primary_rate(ratio) {
        table.insert(milli);
    }
    table.insert(self_rate());

    debug!(entries = table.len(), ratio = ratio.value(), "Derived rate table");
    Some(table)
}
