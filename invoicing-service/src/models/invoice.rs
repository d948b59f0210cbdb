//! Invoice model for invoicing-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::computation::InvoicePayload;
use super::currency::CurrencyCode;

/// Invoice status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    InProgress,
    /// Unrecognised status text, lowercased.
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::InProgress => "in progress",
            InvoiceStatus::Other(s) => s,
        }
    }

    pub fn from_string(s: &str) -> Self {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "draft" => InvoiceStatus::Draft,
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" => InvoiceStatus::Cancelled,
            "in progress" => InvoiceStatus::InProgress,
            _ => InvoiceStatus::Other(normalized),
        }
    }

    /// Counts toward revenue.
    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }

    /// Counts toward outstanding.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Overdue | InvoiceStatus::InProgress
        )
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl Serialize for InvoiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InvoiceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(InvoiceStatus::from_string)
            .unwrap_or_default())
    }
}

/// Persisted invoice row as read from the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    /// Explicit currency column; falls back to `data.currency` when absent.
    pub currency: Option<String>,
    pub data: Value,
    pub issued_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl InvoiceRecord {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    /// Normalised currency; USD when neither the column nor the payload has one.
    pub fn currency(&self) -> CurrencyCode {
        match self.currency.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(code) => CurrencyCode::normalize(code),
            None => CurrencyCode::from_optional(
                InvoicePayload::from_data(&self.data).currency.as_deref(),
            ),
        }
    }

    /// Client identity used for unique-client counting.
    pub fn client_key(&self) -> Option<String> {
        match self.client_id {
            Some(id) => Some(id.to_string()),
            None => InvoicePayload::from_data(&self.data).recipient_name(),
        }
    }
}

/// Per-invoice snapshot used for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAggregateRecord {
    pub status: InvoiceStatus,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl InvoiceAggregateRecord {
    pub fn new(status: InvoiceStatus, currency: impl Into<CurrencyCode>, total: Decimal) -> Self {
        Self {
            status,
            currency: currency.into(),
            total,
            client_id: None,
        }
    }
}
