//! Per-user dashboard and statistics built from stored invoices.

use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{
    CurrencyCode, DashboardInvoice, DashboardSummary, InvoiceAggregateRecord, InvoiceRecord,
    InvoiceStatistics, InvoiceStatus,
};

use super::aggregation::AggregationEngine;
use super::calculator::{invoice_total, round_money};
use super::error::ComputeError;
use super::source::InvoiceSource;

/// An invoice row with its derived total.
struct Priced {
    record: InvoiceRecord,
    status: InvoiceStatus,
    currency: CurrencyCode,
    total: Decimal,
}

impl Priced {
    fn new(record: InvoiceRecord) -> Result<Self, ComputeError> {
        Ok(Self {
            status: record.status(),
            currency: record.currency(),
            total: invoice_total(&record.data)?,
            record,
        })
    }

    fn aggregate_record(&self) -> InvoiceAggregateRecord {
        InvoiceAggregateRecord {
            status: self.status.clone(),
            currency: self.currency.clone(),
            total: self.total,
            client_id: self.record.client_key(),
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn InvoiceSource>,
    engine: AggregationEngine,
}

impl DashboardService {
    pub fn new(source: Arc<dyn InvoiceSource>, engine: AggregationEngine) -> Self {
        Self { source, engine }
    }

    async fn priced(&self, user_id: Uuid) -> Result<Vec<Priced>, AppError> {
        let records = self.source.list_for_user(user_id).await?;
        let priced = records
            .into_iter()
            .map(Priced::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(priced)
    }

    /// Converted totals, per-currency detail and the invoice list.
    #[instrument(skip(self), fields(target_currency = %target))]
    pub async fn summary(
        &self,
        user_id: Uuid,
        target: &CurrencyCode,
    ) -> Result<DashboardSummary, AppError> {
        let priced = self.priced(user_id).await?;

        let records: Vec<InvoiceAggregateRecord> =
            priced.iter().map(Priced::aggregate_record).collect();
        let aggregate = self.engine.aggregate(&records, target).await?;

        let unique_clients = records
            .iter()
            .filter_map(|r| r.client_id.as_deref())
            .collect::<HashSet<_>>()
            .len() as u64;

        let invoices = priced
            .into_iter()
            .map(|p| DashboardInvoice {
                id: p.record.id,
                user_id: p.record.user_id,
                client_id: p.record.client_id,
                data: p.record.data,
                status: p.record.status,
                issued_date: p.record.issued_date,
                due_date: p.record.due_date,
                created_at: p.record.created_at,
                total_amount: p.total,
                currency: p.currency,
            })
            .collect();

        Ok(DashboardSummary {
            aggregate,
            unique_clients,
            invoices,
        })
    }

    /// Status counts plus total, paid and outstanding amounts in `target`.
    #[instrument(skip(self), fields(target_currency = %target))]
    pub async fn statistics(
        &self,
        user_id: Uuid,
        target: &CurrencyCode,
    ) -> Result<InvoiceStatistics, AppError> {
        let priced = self.priced(user_id).await?;

        let converter = self
            .engine
            .converter(
                target,
                priced
                    .iter()
                    .filter(|p| !p.total.is_zero())
                    .map(|p| &p.currency),
            )
            .await?;

        let mut stats = InvoiceStatistics {
            currency: target.clone(),
            ..Default::default()
        };

        for p in &priced {
            stats.total_invoices += 1;
            match p.status {
                InvoiceStatus::Draft => stats.draft += 1,
                InvoiceStatus::Sent => stats.sent += 1,
                InvoiceStatus::Paid => stats.paid += 1,
                InvoiceStatus::Overdue => stats.overdue += 1,
                InvoiceStatus::Cancelled => stats.cancelled += 1,
                InvoiceStatus::InProgress => stats.in_progress += 1,
                InvoiceStatus::Other(_) => {}
            }

            let amount = converter.convert(p.total, &p.currency)?;
            converter.accumulate(&mut stats.total_amount, amount)?;
            if p.status.is_paid() {
                converter.accumulate(&mut stats.paid_amount, amount)?;
            } else if p.status.is_outstanding() {
                converter.accumulate(&mut stats.outstanding_amount, amount)?;
            }
        }

        stats.total_amount = round_money(stats.total_amount);
        stats.paid_amount = round_money(stats.paid_amount);
        stats.outstanding_amount = round_money(stats.outstanding_amount);

        Ok(stats)
    }
}
