pub mod export;
pub mod scenarios;
pub mod valuation;
