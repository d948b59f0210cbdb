//! Fixed-table rate provider for tests and local runs.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ExchangeRateTable, RateError, RateProvider};
use crate::models::CurrencyCode;

/// Serves a fixed table, or a fixed error, and counts fetches.
pub struct StaticRateProvider {
    outcome: Result<ExchangeRateTable, RateError>,
    fetches: AtomicUsize,
}

impl StaticRateProvider {
    pub fn new<'a, I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Decimal)>,
    {
        let table = ExchangeRateTable::new(
            rates
                .into_iter()
                .map(|(code, rate)| (CurrencyCode::from(code), rate)),
        );
        Self::from_table(table)
    }

    pub fn from_table(table: ExchangeRateTable) -> Self {
        Self {
            outcome: Ok(table),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: RateError) -> Self {
        Self {
            outcome: Err(err),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of times `latest_rates` has been called.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn latest_rates(&self) -> Result<ExchangeRateTable, RateError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
