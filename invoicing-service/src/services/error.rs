use service_core::error::AppError;
use thiserror::Error;

use super::metrics::ERRORS_TOTAL;
use super::rates::RateError;

/// Structural problems with an invoice payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid field '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Amount out of range in '{field}'")]
    Overflow { field: &'static str },
}

impl From<ComputeError> for AppError {
    fn from(err: ComputeError) -> Self {
        ERRORS_TOTAL.with_label_values(&["validation"]).inc();
        match err {
            ComputeError::MissingField { field } => AppError::InvalidField {
                field: field.to_string(),
                message: "is required".to_string(),
            },
            ComputeError::InvalidField { field, message } => AppError::InvalidField {
                field: field.to_string(),
                message,
            },
            ComputeError::Overflow { field } => AppError::InvalidField {
                field: field.to_string(),
                message: "amount is too large".to_string(),
            },
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
        match err {
            RateError::UnsupportedCurrency(_) => AppError::BadRequest(anyhow::anyhow!(err)),
            RateError::Timeout(_) => AppError::GatewayTimeout(err.to_string()),
            RateError::Overflow(_) => AppError::InvalidField {
                field: "total".to_string(),
                message: err.to_string(),
            },
            other => AppError::BadGateway(other.to_string()),
        }
    }
}
