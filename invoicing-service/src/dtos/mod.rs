use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    coerce_decimal, CurrencyCode, InvoiceAggregateRecord, InvoiceComputationResult, InvoiceStatus,
    LineItem,
};
use crate::services::{invoice_total, ComputeError};

/// Query for per-user dashboard endpoints.
#[derive(Debug, Deserialize)]
pub struct UserCurrencyQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub currency: Option<String>,
}

impl UserCurrencyQuery {
    pub fn target(&self) -> CurrencyCode {
        CurrencyCode::from_optional(self.currency.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct ComputeResponse {
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub result: InvoiceComputationResult,
}

/// One invoice snapshot in an aggregate request.
///
/// When `data` is present the total is derived from it; otherwise `total`
/// is read leniently.
#[derive(Debug, Serialize, Deserialize)]
pub struct AggregateInvoiceInput {
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl AggregateInvoiceInput {
    pub fn into_record(self) -> Result<InvoiceAggregateRecord, ComputeError> {
        let from_data = self
            .data
            .as_ref()
            .and_then(|d| d.get("currency"))
            .and_then(Value::as_str);
        let currency = CurrencyCode::from_optional(
            self.currency
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .or(from_data),
        );

        let total = match (&self.data, &self.total) {
            (Some(data), _) => invoice_total(data)?,
            (None, Some(total)) => coerce_decimal(total),
            (None, None) => Decimal::ZERO,
        };

        Ok(InvoiceAggregateRecord {
            status: self.status,
            currency,
            total,
            client_id: self.client_id,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AggregateRequest {
    #[validate(length(max = 10000, message = "At most 10000 invoices per request"))]
    pub invoices: Vec<AggregateInvoiceInput>,
    #[serde(default, alias = "currency")]
    pub target_currency: Option<String>,
}

impl AggregateRequest {
    pub fn target(&self) -> CurrencyCode {
        CurrencyCode::from_optional(self.target_currency.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn snapshot_prefers_data_over_total() {
        let input: AggregateInvoiceInput = serde_json::from_value(json!({
            "status": "Paid",
            "total": 999,
            "data": {"items": [{"quantity": 2, "unit_cost": 5}], "currency": "€"},
        }))
        .unwrap();

        let record = input.into_record().unwrap();
        assert_eq!(record.status, InvoiceStatus::Paid);
        assert_eq!(record.total, dec!(10));
        assert_eq!(record.currency.as_str(), "EUR");
    }

    #[test]
    fn snapshot_reads_bare_total() {
        let input: AggregateInvoiceInput =
            serde_json::from_value(json!({"status": "sent", "currency": "gbp", "total": "12.5"}))
                .unwrap();

        let record = input.into_record().unwrap();
        assert_eq!(record.total, dec!(12.5));
        assert_eq!(record.currency.as_str(), "GBP");
    }

    #[test]
    fn oversized_snapshot_payload_is_an_error() {
        let input: AggregateInvoiceInput = serde_json::from_value(json!({
            "status": "paid",
            "data": {"items": [{"quantity": 1e15, "unit_cost": 1e15}]},
        }))
        .unwrap();

        assert_eq!(
            input.into_record().unwrap_err(),
            ComputeError::Overflow { field: "items" }
        );
    }

    #[test]
    fn batch_limit_is_enforced() {
        let invoices: Vec<Value> = (0..10001).map(|_| json!({"total": 1})).collect();
        let req: AggregateRequest =
            serde_json::from_value(json!({"invoices": invoices})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn aggregate_request_defaults_to_usd() {
        let req: AggregateRequest = serde_json::from_value(json!({"invoices": []})).unwrap();
        assert!(req.target().is_usd());
        assert!(req.validate().is_ok());
    }
}
