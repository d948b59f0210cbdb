//! Currency aggregation engine.
//!
//! Folds a set of invoices in mixed currencies into revenue and outstanding
//! figures expressed in one target currency, alongside an unconverted
//! per-currency breakdown. Conversion is strict: any provider or rate
//! problem fails the whole aggregate rather than returning a partial sum.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{
    AggregateResult, CurrencyCode, CurrencyMetrics, InvoiceAggregateRecord, StatusCounts,
};

use super::calculator::round_money;
use super::metrics::AGGREGATIONS_TOTAL;
use super::rates::{ExchangeRateTable, RateError, RateProvider};

/// Converts amounts into a fixed target currency.
///
/// Holds no table when every amount is already in the target currency.
#[derive(Debug, Clone)]
pub struct Converter {
    target: CurrencyCode,
    table: Option<ExchangeRateTable>,
}

impl Converter {
    pub fn target(&self) -> &CurrencyCode {
        &self.target
    }

    /// Whether the rate provider was consulted.
    pub fn used_rates(&self) -> bool {
        self.table.is_some()
    }

    pub fn convert(&self, amount: Decimal, source: &CurrencyCode) -> Result<Decimal, RateError> {
        if amount.is_zero() || *source == self.target {
            return Ok(amount);
        }
        match &self.table {
            Some(table) => table.convert(amount, source, &self.target),
            None => Err(RateError::MissingRate(source.clone())),
        }
    }

    /// Add a converted amount to a running total in the target currency.
    pub fn accumulate(&self, total: &mut Decimal, amount: Decimal) -> Result<(), RateError> {
        *total = total
            .checked_add(amount)
            .ok_or_else(|| RateError::Overflow(self.target.clone()))?;
        Ok(())
    }
}

/// Aggregates invoices using a shared rate provider.
#[derive(Clone)]
pub struct AggregationEngine {
    rates: Arc<dyn RateProvider>,
}

impl AggregationEngine {
    pub fn new(rates: Arc<dyn RateProvider>) -> Self {
        Self { rates }
    }

    /// Build a converter able to handle every currency in `sources`.
    ///
    /// The provider is skipped only for a USD target with nothing to convert.
    /// Any other target is validated against a fresh table even when no
    /// amount needs converting.
    pub async fn converter<'a, I>(
        &self,
        target: &CurrencyCode,
        sources: I,
    ) -> Result<Converter, RateError>
    where
        I: IntoIterator<Item = &'a CurrencyCode>,
    {
        let needs_conversion = sources.into_iter().any(|code| code != target);

        if target.is_usd() && !needs_conversion {
            return Ok(Converter {
                target: target.clone(),
                table: None,
            });
        }

        let table = self.rates.latest_rates().await?;
        table.ensure_target(target)?;

        Ok(Converter {
            target: target.clone(),
            table: Some(table),
        })
    }

    /// Aggregate `invoices` into `target`.
    pub async fn aggregate(
        &self,
        invoices: &[InvoiceAggregateRecord],
        target: &CurrencyCode,
    ) -> Result<AggregateResult, RateError> {
        let result = self.try_aggregate(invoices, target).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        AGGREGATIONS_TOTAL
            .with_label_values(&[target.as_str(), outcome])
            .inc();

        result
    }

    async fn try_aggregate(
        &self,
        invoices: &[InvoiceAggregateRecord],
        target: &CurrencyCode,
    ) -> Result<AggregateResult, RateError> {
        let contributing: Vec<&InvoiceAggregateRecord> = invoices
            .iter()
            .filter(|inv| !inv.total.is_zero())
            .filter(|inv| inv.status.is_paid() || inv.status.is_outstanding())
            .collect();

        let converter = self
            .converter(target, contributing.iter().map(|inv| &inv.currency))
            .await?;

        let mut total_revenue = Decimal::ZERO;
        let mut total_outstanding = Decimal::ZERO;
        for invoice in &contributing {
            let amount = converter.convert(invoice.total, &invoice.currency)?;
            if invoice.status.is_paid() {
                converter.accumulate(&mut total_revenue, amount)?;
            } else {
                converter.accumulate(&mut total_outstanding, amount)?;
            }
        }

        let mut counts = StatusCounts::default();
        for invoice in invoices {
            counts.record(&invoice.status);
        }

        tracing::debug!(
            target_currency = %target,
            invoices = invoices.len(),
            used_rates = converter.used_rates(),
            "Aggregated invoices"
        );

        Ok(AggregateResult {
            target_currency: target.clone(),
            total_revenue: round_money(total_revenue),
            total_outstanding: round_money(total_outstanding),
            counts,
            currency_metrics: calculate_currency_metrics(invoices)?,
        })
    }
}

/// Per-currency breakdown in each invoice's own currency.
pub fn calculate_currency_metrics(
    invoices: &[InvoiceAggregateRecord],
) -> Result<BTreeMap<CurrencyCode, CurrencyMetrics>, RateError> {
    let mut metrics: BTreeMap<CurrencyCode, CurrencyMetrics> = BTreeMap::new();
    for invoice in invoices {
        metrics
            .entry(invoice.currency.clone())
            .or_default()
            .record(&invoice.status, invoice.total)
            .ok_or_else(|| RateError::Overflow(invoice.currency.clone()))?;
    }

    for bucket in metrics.values_mut() {
        bucket.total_revenue = round_money(bucket.total_revenue);
        bucket.total_outstanding = round_money(bucket.total_outstanding);
    }

    Ok(metrics)
}
