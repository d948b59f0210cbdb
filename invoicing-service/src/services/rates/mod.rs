//! Exchange rate provider abstractions and implementations.
//!
//! Rates are quoted against USD: `rate[c]` is the number of units of `c`
//! per one US dollar. Providers are swappable behind [`RateProvider`]; the
//! service wraps the HTTP provider in a TTL cache.

pub mod cache;
pub mod http;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::CurrencyCode;

pub use cache::CachedRateProvider;
pub use http::{HttpRateConfig, HttpRateProvider};
pub use mock::StaticRateProvider;

/// Error type for exchange rate operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    #[error("Exchange rate provider not configured: {0}")]
    NotConfigured(String),

    #[error("Exchange rate provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error contacting exchange rate provider: {0}")]
    Network(String),

    #[error("Exchange rate provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed exchange rate response: {0}")]
    MalformedResponse(String),

    #[error("Currency not supported: {0}")]
    UnsupportedCurrency(CurrencyCode),

    #[error("No exchange rate available for {0}")]
    MissingRate(CurrencyCode),

    #[error("Exchange rate for {0} is zero")]
    ZeroRate(CurrencyCode),

    #[error("Amount converted into {0} is out of range")]
    Overflow(CurrencyCode),
}

impl RateError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RateError::NotConfigured(_) => "not_configured",
            RateError::Timeout(_) => "timeout",
            RateError::Network(_) => "network",
            RateError::Status { .. } => "status",
            RateError::MalformedResponse(_) => "malformed",
            RateError::UnsupportedCurrency(_) => "unsupported_currency",
            RateError::MissingRate(_) => "missing_rate",
            RateError::ZeroRate(_) => "zero_rate",
            RateError::Overflow(_) => "overflow",
        }
    }
}

/// Snapshot of USD-based exchange rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRateTable {
    rates: BTreeMap<CurrencyCode, Decimal>,
    fetched_at: DateTime<Utc>,
}

impl ExchangeRateTable {
    /// Build a table; USD is always present at exactly 1.
    pub fn new<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (CurrencyCode, Decimal)>,
    {
        let mut rates: BTreeMap<CurrencyCode, Decimal> = rates.into_iter().collect();
        rates.insert(CurrencyCode::usd(), Decimal::ONE);
        Self {
            rates,
            fetched_at: Utc::now(),
        }
    }

    pub fn rate(&self, code: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Number of quoted currencies, USD included.
    pub fn currency_count(&self) -> usize {
        self.rates.len()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Fail unless `target` can be converted into.
    pub fn ensure_target(&self, target: &CurrencyCode) -> Result<Decimal, RateError> {
        match self.rate(target) {
            None => Err(RateError::UnsupportedCurrency(target.clone())),
            Some(rate) if rate.is_zero() => Err(RateError::ZeroRate(target.clone())),
            Some(rate) => Ok(rate),
        }
    }

    /// Convert `amount` from `source` into `target` through USD.
    ///
    /// No rounding is applied; callers round once on the final sum. A result
    /// that does not fit in a `Decimal` is [`RateError::Overflow`].
    pub fn convert(
        &self,
        amount: Decimal,
        source: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Decimal, RateError> {
        if source == target {
            return Ok(amount);
        }

        let target_rate = self.ensure_target(target)?;
        let source_rate = match self.rate(source) {
            None => return Err(RateError::MissingRate(source.clone())),
            Some(rate) if rate.is_zero() => return Err(RateError::ZeroRate(source.clone())),
            Some(rate) => rate,
        };

        amount
            .checked_div(source_rate)
            .and_then(|usd_amount| usd_amount.checked_mul(target_rate))
            .ok_or_else(|| RateError::Overflow(target.clone()))
    }
}

/// Source of current exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch the latest USD-based rate table.
    async fn latest_rates(&self) -> Result<ExchangeRateTable, RateError>;

    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;
}
