pub mod assumptions;
pub mod error;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use assumptions::{AssumptionField, AssumptionSet};
pub use error::DcfError;
pub use types::*;

/// Standard result type for all equity-dcf operations
pub type DcfResult<T> = Result<T, DcfError>;
