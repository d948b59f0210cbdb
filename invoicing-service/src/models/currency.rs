//! Currency code model and symbol/alias normalisation.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Code used when an invoice carries no currency at all.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Symbols and locale-prefixed aliases seen in invoice payloads.
const ALIASES: &[(&str, &str)] = &[
    ("$", "USD"),
    ("US$", "USD"),
    ("USD$", "USD"),
    ("€", "EUR"),
    ("EURO", "EUR"),
    ("£", "GBP"),
    ("GB£", "GBP"),
    ("¥", "JPY"),
    ("JP¥", "JPY"),
    ("₦", "NGN"),
    ("NG₦", "NGN"),
    ("CA$", "CAD"),
    ("CAD$", "CAD"),
    ("AU$", "AUD"),
    ("AUD$", "AUD"),
];

/// Normalised currency code.
///
/// Construction never fails: known symbols map to their ISO code, anything
/// else is kept uppercased so that conversion can reject it later with a
/// precise reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return Self::usd();
        }

        let code = ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, code)| (*code).to_string())
            .unwrap_or(upper);

        Self(code)
    }

    /// Normalise an optional value, defaulting to USD when absent.
    pub fn from_optional(raw: Option<&str>) -> Self {
        raw.map(Self::normalize).unwrap_or_else(Self::usd)
    }

    pub fn usd() -> Self {
        Self(DEFAULT_CURRENCY.to_string())
    }

    pub fn is_usd(&self) -> bool {
        self.0 == DEFAULT_CURRENCY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::usd()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_optional(raw.as_deref()))
    }
}
