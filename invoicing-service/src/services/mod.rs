//! Services module for invoicing-service.

pub mod aggregation;
pub mod calculator;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod rates;
pub mod source;

pub use aggregation::{calculate_currency_metrics, AggregationEngine, Converter};
pub use calculator::{compute, compute_payload, invoice_total, round_money};
pub use dashboard::DashboardService;
pub use error::ComputeError;
pub use metrics::{get_metrics, init_metrics};
pub use rates::{
    CachedRateProvider, ExchangeRateTable, HttpRateConfig, HttpRateProvider, RateError,
    RateProvider, StaticRateProvider,
};
pub use source::{InMemoryInvoiceSource, InvoiceSource, PgInvoiceSource};
