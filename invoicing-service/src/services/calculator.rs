//! Invoice total calculator.
//!
//! Pure functions: no I/O, no shared state. Malformed numbers have already
//! been coerced to zero by the time a [`InvoiceComputationInput`] exists, so
//! the only failures are a structurally incomplete payload and amounts too
//! large for a `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::models::{InvoiceComputationInput, InvoiceComputationResult, InvoicePayload, LineItem};

use super::error::ComputeError;
use super::metrics::COMPUTATIONS_TOTAL;

/// Round a money amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute canonical totals, annotating every item with its `subtotal`.
pub fn compute(
    input: &mut InvoiceComputationInput,
) -> Result<InvoiceComputationResult, ComputeError> {
    let result = try_compute(input);

    let outcome = match &result {
        Ok(r) if r.total_overridden => "override",
        Ok(_) => "derived",
        Err(_) => "overflow",
    };
    COMPUTATIONS_TOTAL.with_label_values(&[outcome]).inc();

    result
}

fn try_compute(
    input: &mut InvoiceComputationInput,
) -> Result<InvoiceComputationResult, ComputeError> {
    let mut subtotal = Decimal::ZERO;
    for item in input.items.iter_mut() {
        let line_total = item.line_total().ok_or_else(|| overflow("items"))?;
        item.subtotal = Some(line_total);
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| overflow("items"))?;
    }

    let tax_amount = input.tax.amount(subtotal).ok_or_else(|| overflow("tax_percent"))?;
    let discount_amount = input
        .discount
        .amount(subtotal)
        .ok_or_else(|| overflow("discount_percent"))?;
    let shipping_amount = input.shipping.amount();

    let derived = subtotal
        .checked_add(tax_amount)
        .and_then(|sum| sum.checked_sub(discount_amount))
        .and_then(|sum| sum.checked_add(shipping_amount))
        .ok_or_else(|| overflow("total"))?;
    let derived = round_money(derived).max(Decimal::ZERO);

    let (total, total_overridden) = match input.total_override {
        Some(explicit) => (explicit, true),
        None => (derived, false),
    };

    Ok(InvoiceComputationResult {
        subtotal,
        tax_amount,
        discount_amount,
        shipping_amount,
        total,
        total_overridden,
    })
}

fn overflow(field: &'static str) -> ComputeError {
    ComputeError::Overflow { field }
}

/// Headline total of a stored invoice blob.
pub fn invoice_total(data: &Value) -> Result<Decimal, ComputeError> {
    let mut input = InvoiceComputationInput::from_data(data);
    Ok(compute(&mut input)?.total)
}

/// Validate a request payload and compute it.
///
/// `from`, `to` and an `items` array are required; everything else is
/// optional and coerced leniently.
pub fn compute_payload(
    payload: &InvoicePayload,
) -> Result<(Vec<LineItem>, InvoiceComputationResult), ComputeError> {
    if let Err(err) = validate(payload) {
        COMPUTATIONS_TOTAL.with_label_values(&["invalid"]).inc();
        return Err(err);
    }

    let mut input = InvoiceComputationInput::from_payload(payload);
    let result = compute(&mut input)?;
    Ok((input.items, result))
}

fn validate(payload: &InvoicePayload) -> Result<(), ComputeError> {
    require(&payload.from, "from")?;
    require(&payload.to, "to")?;
    match require(&payload.items, "items")? {
        Value::Array(_) => Ok(()),
        _ => Err(ComputeError::InvalidField {
            field: "items",
            message: "must be a list".to_string(),
        }),
    }
}

fn require<'a>(value: &'a Option<Value>, field: &'static str) -> Result<&'a Value, ComputeError> {
    match value {
        None | Some(Value::Null) => Err(ComputeError::MissingField { field }),
        Some(v) => Ok(v),
    }
}
