//! Domain models for invoicing-service.

mod computation;
mod currency;
mod invoice;
mod summary;

pub use computation::{
    coerce_bool, coerce_decimal, parse_decimal, Adjustment, AdjustmentKind,
    InvoiceComputationInput, InvoiceComputationResult, InvoicePayload, LineItem, Shipping,
};
pub use currency::{CurrencyCode, DEFAULT_CURRENCY};
pub use invoice::{InvoiceAggregateRecord, InvoiceRecord, InvoiceStatus};
pub use summary::{
    AggregateResult, CurrencyMetrics, DashboardInvoice, DashboardSummary, InvoiceStatistics,
    StatusCounts,
};
