//! Aggregate and dashboard result models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::currency::CurrencyCode;
use super::invoice::InvoiceStatus;

/// Invoice counts by status bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusCounts {
    pub total_invoices: u64,
    pub paid_invoices: u64,
    /// Sent, overdue and in-progress invoices.
    pub unpaid_invoices: u64,
    pub draft_invoices: u64,
    pub overdue_invoices: u64,
    pub cancelled_invoices: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: &InvoiceStatus) {
        self.total_invoices += 1;
        match status {
            InvoiceStatus::Paid => self.paid_invoices += 1,
            InvoiceStatus::Sent | InvoiceStatus::InProgress => self.unpaid_invoices += 1,
            InvoiceStatus::Overdue => {
                self.unpaid_invoices += 1;
                self.overdue_invoices += 1;
            }
            InvoiceStatus::Draft => self.draft_invoices += 1,
            InvoiceStatus::Cancelled => self.cancelled_invoices += 1,
            InvoiceStatus::Other(_) => {}
        }
    }
}

/// Per-currency bucket, in the invoices' own currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CurrencyMetrics {
    pub total_revenue: Decimal,
    pub total_outstanding: Decimal,
    pub total_invoices: u64,
    pub paid_invoices: u64,
    pub unpaid_invoices: u64,
    pub draft_invoices: u64,
    pub overdue_invoices: u64,
}

impl CurrencyMetrics {
    /// Add one invoice. Returns `None`, leaving the bucket untouched, when a
    /// sum would overflow.
    pub fn record(&mut self, status: &InvoiceStatus, amount: Decimal) -> Option<()> {
        match status {
            InvoiceStatus::Paid => {
                self.total_revenue = self.total_revenue.checked_add(amount)?;
                self.paid_invoices += 1;
            }
            InvoiceStatus::Sent | InvoiceStatus::Overdue | InvoiceStatus::InProgress => {
                self.total_outstanding = self.total_outstanding.checked_add(amount)?;
                self.unpaid_invoices += 1;
            }
            InvoiceStatus::Draft => self.draft_invoices += 1,
            InvoiceStatus::Cancelled | InvoiceStatus::Other(_) => {}
        }

        if *status == InvoiceStatus::Overdue {
            self.overdue_invoices += 1;
        }
        self.total_invoices += 1;
        Some(())
    }
}

/// Converted aggregate plus the per-currency breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub target_currency: CurrencyCode,
    /// Paid invoices, converted into `target_currency`.
    pub total_revenue: Decimal,
    /// Sent, overdue and in-progress invoices, converted into `target_currency`.
    pub total_outstanding: Decimal,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub currency_metrics: BTreeMap<CurrencyCode, CurrencyMetrics>,
}

/// One invoice as listed on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardInvoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub data: Value,
    pub status: String,
    pub issued_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub currency: CurrencyCode,
}

/// Combined dashboard payload for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub aggregate: AggregateResult,
    pub unique_clients: u64,
    pub invoices: Vec<DashboardInvoice>,
}

/// Status counts and converted amounts for one user's invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InvoiceStatistics {
    pub currency: CurrencyCode,
    pub total_invoices: u64,
    pub draft: u64,
    pub sent: u64,
    pub paid: u64,
    pub overdue: u64,
    pub cancelled: u64,
    pub in_progress: u64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn overdue_counts_as_outstanding_and_overdue() {
        let mut metrics = CurrencyMetrics::default();
        metrics.record(&InvoiceStatus::Overdue, dec!(40)).unwrap();

        assert_eq!(metrics.total_outstanding, dec!(40));
        assert_eq!(metrics.unpaid_invoices, 1);
        assert_eq!(metrics.overdue_invoices, 1);
        assert_eq!(metrics.total_revenue, Decimal::ZERO);
    }

    #[test]
    fn draft_contributes_to_no_sum() {
        let mut metrics = CurrencyMetrics::default();
        metrics.record(&InvoiceStatus::Draft, dec!(99)).unwrap();
        metrics.record(&InvoiceStatus::Cancelled, dec!(15)).unwrap();

        assert_eq!(metrics.total_invoices, 2);
        assert_eq!(metrics.draft_invoices, 1);
        assert_eq!(metrics.total_revenue, Decimal::ZERO);
        assert_eq!(metrics.total_outstanding, Decimal::ZERO);
    }

    #[test]
    fn overflowing_sum_leaves_bucket_unchanged() {
        let mut metrics = CurrencyMetrics::default();
        metrics.record(&InvoiceStatus::Paid, Decimal::MAX).unwrap();

        assert_eq!(metrics.record(&InvoiceStatus::Paid, dec!(1)), None);
        assert_eq!(metrics.total_revenue, Decimal::MAX);
        assert_eq!(metrics.total_invoices, 1);
        assert_eq!(metrics.paid_invoices, 1);
    }

    #[test]
    fn status_counts_track_every_bucket() {
        let mut counts = StatusCounts::default();
        for status in [
            InvoiceStatus::Paid,
            InvoiceStatus::Sent,
            InvoiceStatus::InProgress,
            InvoiceStatus::Overdue,
            InvoiceStatus::Draft,
            InvoiceStatus::Cancelled,
            InvoiceStatus::Other("disputed".to_string()),
        ] {
            counts.record(&status);
        }

        assert_eq!(counts.total_invoices, 7);
        assert_eq!(counts.paid_invoices, 1);
        assert_eq!(counts.unpaid_invoices, 3);
        assert_eq!(counts.overdue_invoices, 1);
        assert_eq!(counts.draft_invoices, 1);
        assert_eq!(counts.cancelled_invoices, 1);
    }
}
