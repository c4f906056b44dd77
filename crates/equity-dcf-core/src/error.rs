use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DcfError {
    #[error("Invalid discount rate: WACC ({wacc}) must exceed terminal growth rate ({terminal_growth})")]
    InvalidDiscountRate {
        wacc: Decimal,
        terminal_growth: Decimal,
    },

    #[error("Invalid share count: shares outstanding must be positive (got {shares_outstanding})")]
    InvalidShareCount { shares_outstanding: Decimal },

    #[error("Missing comparison price: current price not provided or not positive")]
    MissingComparisonPrice,

    #[error("Invalid assumption: {field} = {value} — {reason}")]
    InvalidAssumptionRange {
        field: String,
        value: Decimal,
        reason: String,
    },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DcfError {
    pub(crate) fn out_of_range(field: &str, value: Decimal, reason: &str) -> Self {
        DcfError::InvalidAssumptionRange {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
    }

    /// A figure driven by `field` left the representable Decimal range.
    pub(crate) fn overflow(field: &str, value: Decimal, figure: &str) -> Self {
        DcfError::InvalidAssumptionRange {
            field: field.to_string(),
            value,
            reason: format!("{figure} overflows the decimal range"),
        }
    }
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}
