//! TTL cache in front of a rate provider.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{ExchangeRateTable, RateError, RateProvider};
use crate::services::metrics::RATE_CACHE_TOTAL;

struct CachedTable {
    table: ExchangeRateTable,
    expires_at: Instant,
}

/// Process-wide cache of the latest rate table.
///
/// The lock is held across a refresh, so concurrent misses wait for a single
/// upstream fetch. Failures are never cached.
pub struct CachedRateProvider {
    inner: Arc<dyn RateProvider>,
    ttl: Duration,
    slot: Mutex<Option<CachedTable>>,
}

impl CachedRateProvider {
    pub fn new(inner: Arc<dyn RateProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached table; the next lookup refetches.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[async_trait]
impl RateProvider for CachedRateProvider {
    async fn latest_rates(&self) -> Result<ExchangeRateTable, RateError> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.expires_at {
                RATE_CACHE_TOTAL.with_label_values(&["hit"]).inc();
                tracing::debug!(
                    fetched_at = %cached.table.fetched_at(),
                    "Serving cached exchange rates"
                );
                return Ok(cached.table.clone());
            }
        }

        RATE_CACHE_TOTAL.with_label_values(&["miss"]).inc();
        tracing::debug!(provider = self.inner.name(), "Refreshing exchange rate cache");

        let table = self.inner.latest_rates().await?;
        *slot = Some(CachedTable {
            table: table.clone(),
            expires_at: Instant::now() + self.ttl,
        });

        Ok(table)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
