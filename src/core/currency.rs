//! Currency symbols, locale currency detection and the fallback chain used to
//! pick a rate when the requested currency is missing.

use crate::core::rate::{ExchangeRate, PRIMARY_UNIT_CODES, RateTable, SECONDARY_COIN_CODE};
use std::env;
use tracing::debug;

const SYMBOLS: &[(&str, &str)] = &[
    ("AUD", "A$"),
    ("BRL", "R$"),
    ("CAD", "CA$"),
    ("CHF", "CHF"),
    ("CNY", "CN¥"),
    ("CZK", "Kč"),
    ("DKK", "kr"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("HKD", "HK$"),
    ("ILS", "₪"),
    ("INR", "₹"),
    ("JPY", "¥"),
    ("KRW", "₩"),
    ("MXN", "MX$"),
    ("NGN", "₦"),
    ("NOK", "kr"),
    ("NZD", "NZ$"),
    ("PHP", "₱"),
    ("PLN", "zł"),
    ("RUB", "₽"),
    ("SEK", "kr"),
    ("THB", "฿"),
    ("TRY", "₺"),
    ("TWD", "NT$"),
    ("UAH", "₴"),
    ("USD", "$"),
    ("VND", "₫"),
    ("ZAR", "R"),
    ("mBTC", "mɃ"),
    ("DOGM", "Ð"),
];

// Region (ISO 3166) to currency (ISO 4217).
const REGION_CURRENCIES: &[(&str, &str)] = &[
    ("AT", "EUR"),
    ("AU", "AUD"),
    ("BE", "EUR"),
    ("BR", "BRL"),
    ("CA", "CAD"),
    ("CH", "CHF"),
    ("CN", "CNY"),
    ("CZ", "CZK"),
    ("DE", "EUR"),
    ("DK", "DKK"),
    ("ES", "EUR"),
    ("FI", "EUR"),
    ("FR", "EUR"),
    ("GB", "GBP"),
    ("GR", "EUR"),
    ("HK", "HKD"),
    ("IE", "EUR"),
    ("IL", "ILS"),
    ("IN", "INR"),
    ("IT", "EUR"),
    ("JP", "JPY"),
    ("KR", "KRW"),
    ("MX", "MXN"),
    ("NG", "NGN"),
    ("NL", "EUR"),
    ("NO", "NOK"),
    ("NZ", "NZD"),
    ("PH", "PHP"),
    ("PL", "PLN"),
    ("PT", "EUR"),
    ("RU", "RUB"),
    ("SE", "SEK"),
    ("TH", "THB"),
    ("TR", "TRY"),
    ("TW", "TWD"),
    ("UA", "UAH"),
    ("US", "USD"),
    ("VN", "VND"),
    ("ZA", "ZAR"),
];

/// Canonical spelling of a user-typed code: coin unit codes keep their mixed
/// case (`mbtc` → `mBTC`), everything else is upper-cased.
pub fn normalize_currency_code(code: &str) -> String {
    let code = code.trim();
    PRIMARY_UNIT_CODES
        .iter()
        .chain(std::iter::once(&SECONDARY_COIN_CODE))
        .find(|known| known.eq_ignore_ascii_case(code))
        .map_or_else(|| code.to_uppercase(), |known| known.to_string())
}

/// Display symbol for a currency code. Unknown codes display as themselves.
pub fn currency_symbol(code: &str) -> &str {
    SYMBOLS
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(code, |(_, symbol)| *symbol)
}

/// Currency of a POSIX locale string such as `de_DE.UTF-8` or `en_US`.
pub fn currency_for_locale(locale: &str) -> Option<&'static str> {
    let name = locale.split(['.', '@']).next()?;
    let (_, region) = name.split_once('_')?;
    let region = region.to_uppercase();
    REGION_CURRENCIES
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, currency)| *currency)
}

/// Currency of the process locale, read from `LC_ALL`, `LC_MONETARY` and `LANG`
/// in that order.
pub fn locale_currency() -> Option<String> {
    let currency = ["LC_ALL", "LC_MONETARY", "LANG"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.is_empty())
        .and_then(|locale| currency_for_locale(&locale))
        .map(str::to_string);
    debug!(?currency, "Resolved locale currency");
    currency
}

/// Ordered list of currency codes; the first one present in a table wins.
#[derive(Debug, Clone, Default)]
pub struct CurrencyFallback {
    candidates: Vec<String>,
}

impl CurrencyFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate. `None` is skipped so optional sources chain cleanly.
    pub fn then<S: Into<String>>(mut self, code: Option<S>) -> Self {
        if let Some(code) = code {
            self.candidates.push(code.into());
        }
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn resolve<'t>(&self, table: &'t RateTable) -> Option<&'t ExchangeRate> {
        self.candidates.iter().find_map(|code| table.get(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn table(codes: &[&str]) -> RateTable {
        let mut table = RateTable::new();
        for code in codes {
            table.insert(ExchangeRate::from_fiat_price(code, Decimal::ONE, "test").unwrap());
        }
        table
    }

    #[test]
    fn test_currency_symbol() {
        assert_eq!(currency_symbol("EUR"), "€");
        assert_eq!(currency_symbol("USD"), "$");
        assert_eq!(currency_symbol("XYZ"), "XYZ");
    }

    #[test]
    fn test_normalize_currency_code() {
        assert_eq!(normalize_currency_code("eur"), "EUR");
        assert_eq!(normalize_currency_code(" Usd "), "USD");
        assert_eq!(normalize_currency_code("mbtc"), "mBTC");
        assert_eq!(normalize_currency_code("MBTC"), "mBTC");
        assert_eq!(normalize_currency_code("µbtc"), "µBTC");
        assert_eq!(normalize_currency_code("dogm"), "DOGM");
    }

    #[test]
    fn test_currency_for_locale() {
        assert_eq!(currency_for_locale("de_DE.UTF-8"), Some("EUR"));
        assert_eq!(currency_for_locale("en_GB"), Some("GBP"));
        assert_eq!(currency_for_locale("sr_RS@latin"), None);
        assert_eq!(currency_for_locale("C"), None);
        assert_eq!(currency_for_locale("POSIX"), None);
    }

    #[test]
    fn test_fallback_takes_first_present_code() {
        let table = table(&["EUR", "USD"]);
        let chain = CurrencyFallback::new()
            .then(Some("JPY"))
            .then(None::<String>)
            .then(Some("EUR"))
            .then(Some("USD"));

        assert_eq!(chain.candidates(), ["JPY", "EUR", "USD"]);
        assert_eq!(chain.resolve(&table).unwrap().currency_code, "EUR");
    }

    #[test]
    fn test_fallback_without_match() {
        let table = table(&["USD"]);
        let chain = CurrencyFallback::new().then(Some("GBP"));
        assert!(chain.resolve(&table).is_none());
        assert!(CurrencyFallback::new().resolve(&table).is_none());
    }
}
