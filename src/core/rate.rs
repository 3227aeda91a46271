//! Exchange rate value types and the rate table served to callers.

use crate::core::currency::currency_symbol;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code of the wallet's own coin, priced through BTC.
pub const SECONDARY_COIN_CODE: &str = "DOGM";
/// Code of the synthetic milli-BTC entry.
pub const MILLI_PRIMARY_CODE: &str = "mBTC";
/// Unit codes of the primary coin. Aggregator pairs quoting these are self-rates.
pub const PRIMARY_UNIT_CODES: [&str; 3] = ["BTC", "mBTC", "µBTC"];

/// Smallest coin units per whole coin.
pub const COIN_UNIT: i64 = 100_000_000;
/// Decimal places held by a fiat amount.
pub const FIAT_EXPONENT: u32 = 8;

/// How many coin units buy `fiat_amount` units of `currency_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency_code: String,
    pub coin_amount: i64,
    pub fiat_amount: i64,
    pub source: String,
}

impl ExchangeRate {
    /// Builds a rate for one whole coin from a decimal fiat price.
    ///
    /// Digits past [`FIAT_EXPONENT`] are truncated. Returns `None` when the
    /// price does not fit the fixed-point representation.
    pub fn from_fiat_price(currency_code: &str, price: Decimal, source: &str) -> Option<Self> {
        let fiat_amount = price
            .checked_mul(Decimal::from(10_i64.pow(FIAT_EXPONENT)))?
            .trunc()
            .to_i64()?;
        Some(ExchangeRate {
            currency_code: currency_code.to_string(),
            coin_amount: COIN_UNIT,
            fiat_amount,
            source: source.to_string(),
        })
    }

    /// Both sides strictly positive. Anything else cannot be served.
    pub fn is_usable(&self) -> bool {
        self.coin_amount > 0 && self.fiat_amount > 0
    }

    /// Fiat value of one whole coin.
    pub fn fiat_per_coin(&self) -> Decimal {
        let fiat = Decimal::new(self.fiat_amount, FIAT_EXPONENT);
        fiat * Decimal::from(COIN_UNIT) / Decimal::from(self.coin_amount)
    }

    /// Converts coin units into fiat units, rounding toward zero.
    pub fn coin_to_fiat(&self, coin_units: i64) -> Option<i64> {
        if self.coin_amount == 0 {
            return None;
        }
        let fiat = i128::from(coin_units) * i128::from(self.fiat_amount)
            / i128::from(self.coin_amount);
        i64::try_from(fiat).ok()
    }

    /// Converts fiat units into coin units, rounding toward zero.
    pub fn fiat_to_coin(&self, fiat_units: i64) -> Option<i64> {
        if self.fiat_amount == 0 {
            return None;
        }
        let coin = i128::from(fiat_units) * i128::from(self.coin_amount)
            / i128::from(self.fiat_amount);
        i64::try_from(coin).ok()
    }
}

/// Rates keyed by currency code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateTable {
    rates: BTreeMap<String, ExchangeRate>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding just `rate`, used to seed the cache at cold start.
    pub fn single(rate: ExchangeRate) -> Self {
        let mut table = Self::new();
        table.insert(rate);
        table
    }

    pub fn insert(&mut self, rate: ExchangeRate) {
        self.rates.insert(rate.currency_code.clone(), rate);
    }

    pub fn get(&self, code: &str) -> Option<&ExchangeRate> {
        self.rates.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExchangeRate> {
        self.rates.values()
    }

    /// Rates whose code or display symbol contains `needle`, ignoring case.
    pub fn search(&self, needle: &str) -> Vec<ExchangeRate> {
        let needle = needle.to_lowercase();
        self.iter()
            .filter(|rate| {
                rate.currency_code.to_lowercase().contains(&needle)
                    || currency_symbol(&rate.currency_code)
                        .to_lowercase()
                        .contains(&needle)
            })
            .cloned()
            .collect()
    }
}
