//! Invoice payload and computation models.
//!
//! Invoice payloads arrive as loosely-typed JSON (the same blob is stored in
//! the `invoices.data` column). Numeric fields are coerced leniently: a value
//! that cannot be read as a number counts as zero rather than failing the
//! request.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Parse a decimal from text, accepting plain and scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// Read any JSON value as a decimal; unparseable or missing values become zero.
pub fn coerce_decimal(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()).unwrap_or(Decimal::ZERO),
        Value::String(s) => parse_decimal(s).unwrap_or(Decimal::ZERO),
        Value::Bool(true) => Decimal::ONE,
        _ => Decimal::ZERO,
    }
}

/// Read a JSON flag. Strings count only when they spell out a true value.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_decimal(&value))
}

fn lenient_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(coerce_decimal(&other)),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_text(&value))
}

/// Percent-or-fixed interpretation of a tax or discount value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    #[default]
    Percent,
    Fixed,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Percent => "percent",
            AdjustmentKind::Fixed => "fixed",
        }
    }

    /// Anything other than "percent" is a flat amount; absent means percent.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => AdjustmentKind::Percent,
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("percent") => {
                AdjustmentKind::Percent
            }
            Some(_) => AdjustmentKind::Fixed,
        }
    }
}

/// Tax or discount settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Adjustment {
    pub enabled: bool,
    pub kind: AdjustmentKind,
    pub value: Decimal,
}

impl Adjustment {
    pub fn percent(value: Decimal) -> Self {
        Self {
            enabled: true,
            kind: AdjustmentKind::Percent,
            value,
        }
    }

    pub fn fixed(value: Decimal) -> Self {
        Self {
            enabled: true,
            kind: AdjustmentKind::Fixed,
            value,
        }
    }

    /// Amount this adjustment contributes for the given subtotal; `None` when
    /// it does not fit in a `Decimal`.
    pub fn amount(&self, subtotal: Decimal) -> Option<Decimal> {
        if !self.enabled {
            return Some(Decimal::ZERO);
        }
        match self.kind {
            AdjustmentKind::Percent => {
                subtotal.checked_mul(self.value.checked_div(Decimal::ONE_HUNDRED)?)
            }
            AdjustmentKind::Fixed => Some(self.value),
        }
    }
}

/// Flat shipping charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Shipping {
    pub enabled: bool,
    pub amount: Decimal,
}

impl Shipping {
    pub fn amount(&self) -> Decimal {
        if self.enabled {
            self.amount
        } else {
            Decimal::ZERO
        }
    }
}

/// A single line on an invoice payload.
///
/// Unknown keys (names, SKUs, notes) are preserved so the annotated item can
/// be handed back to rendering unchanged apart from its `subtotal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LineItem {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quantity: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub unit_cost: Decimal,
    #[serde(
        default,
        deserialize_with = "lenient_opt_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtotal: Option<Decimal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LineItem {
    pub fn new(quantity: Decimal, unit_cost: Decimal) -> Self {
        Self {
            quantity,
            unit_cost,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn line_total(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_cost)
    }
}

/// Invoice payload in its stored/wire shape.
///
/// Every field is optional; structural requirements (`from`, `to`, `items`)
/// belong to the caller and are checked by the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoicePayload {
    #[serde(default)]
    pub from: Option<Value>,
    #[serde(default)]
    pub to: Option<Value>,
    #[serde(default)]
    pub items: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub currency: Option<String>,
    #[serde(default)]
    pub show_tax: Option<Value>,
    #[serde(default)]
    pub tax_type: Option<Value>,
    #[serde(default)]
    pub tax_percent: Option<Value>,
    #[serde(default)]
    pub show_discount: Option<Value>,
    #[serde(default)]
    pub discount_type: Option<Value>,
    #[serde(default)]
    pub discount_percent: Option<Value>,
    #[serde(default)]
    pub show_shipping: Option<Value>,
    #[serde(default)]
    pub shipping_amount: Option<Value>,
    #[serde(default)]
    pub total: Option<Value>,
}

impl InvoicePayload {
    /// Read a stored JSON blob. Anything that is not an object yields an
    /// empty payload.
    pub fn from_data(data: &Value) -> Self {
        serde_json::from_value(data.clone()).unwrap_or_default()
    }

    /// Client/recipient display name from `to`, when it is meaningful.
    pub fn recipient_name(&self) -> Option<String> {
        let name = match self.to.as_ref()? {
            Value::String(s) => s.trim().to_string(),
            Value::Object(map) => map
                .get("name")
                .and_then(coerce_text)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };

        if name.is_empty() || name == "None" {
            None
        } else {
            Some(name)
        }
    }
}

/// Typed input to the invoice total calculator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvoiceComputationInput {
    pub items: Vec<LineItem>,
    pub tax: Adjustment,
    pub discount: Adjustment,
    pub shipping: Shipping,
    /// Client-supplied headline total; only kept when it is positive.
    pub total_override: Option<Decimal>,
}

impl InvoiceComputationInput {
    pub fn from_payload(payload: &InvoicePayload) -> Self {
        let flag = |v: &Option<Value>| v.as_ref().map(coerce_bool).unwrap_or(false);
        let number = |v: &Option<Value>| v.as_ref().map(coerce_decimal).unwrap_or_default();

        let items = match &payload.items {
            Some(Value::Array(values)) => values
                .iter()
                .filter(|v| v.is_object())
                .filter_map(|v| serde_json::from_value::<LineItem>(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };

        let total_override = payload
            .total
            .as_ref()
            .map(coerce_decimal)
            .filter(|total| *total > Decimal::ZERO);

        Self {
            items,
            tax: Adjustment {
                enabled: flag(&payload.show_tax),
                kind: AdjustmentKind::from_value(payload.tax_type.as_ref()),
                value: number(&payload.tax_percent),
            },
            discount: Adjustment {
                enabled: flag(&payload.show_discount),
                kind: AdjustmentKind::from_value(payload.discount_type.as_ref()),
                value: number(&payload.discount_percent),
            },
            shipping: Shipping {
                enabled: flag(&payload.show_shipping),
                amount: number(&payload.shipping_amount),
            },
            total_override,
        }
    }

    pub fn from_data(data: &Value) -> Self {
        Self::from_payload(&InvoicePayload::from_data(data))
    }
}

/// Canonical computed fields for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct InvoiceComputationResult {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total: Decimal,
    /// True when `total` is the client-supplied value rather than derived.
    pub total_overridden: bool,
}
