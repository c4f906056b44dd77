use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency amounts: revenue, cash flows, EV, per-share values.
pub type Money = Decimal;

/// Growth, margin, tax and discount rates as fractions (0.10 = 10%).
pub type Rate = Decimal;

/// Valuation multiples (EV/Revenue, P/E)
pub type Multiple = Decimal;

/// A single labelled figure, used for flat exports of assumptions and valuation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    /// `None` when the figure is undefined for this run (e.g. upside without a price)
    pub value: Option<Decimal>,
}

impl LineItem {
    pub fn new(label: &str, value: Decimal) -> Self {
        LineItem {
            label: label.to_string(),
            value: Some(value),
        }
    }

    pub fn optional(label: &str, value: Option<Decimal>) -> Self {
        LineItem {
            label: label.to_string(),
            value,
        }
    }
}

/// Envelope returned by every `run_*` entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Engine version, timing and numeric precision of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Wrap a result with its methodology, echoed inputs and warnings
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
