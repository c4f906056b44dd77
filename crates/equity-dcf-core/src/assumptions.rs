use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::types::{LineItem, Money, Rate};
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs for one valuation run. Built once and never mutated by the engine;
/// variations (sensitivity points, scenarios) are derived copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionSet {
    /// Display name only
    #[serde(default)]
    pub company_name: String,
    /// Base (Year 0) revenue
    pub base_revenue: Money,
    /// Current share price, used only for upside/downside
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    /// Diluted shares outstanding
    pub shares_outstanding: Decimal,
    /// Debt minus cash; negative means net cash
    #[serde(default)]
    pub net_debt: Money,
    /// Revenue growth in the first projected year
    pub revenue_growth_y1: Rate,
    /// Revenue growth in year 5
    pub revenue_growth_y5: Rate,
    /// Perpetuity growth, also the year-10 end of the growth glide path
    pub terminal_growth: Rate,
    /// Current EBITDA margin
    pub base_ebitda_margin: Rate,
    /// EBITDA margin reached at year 5 and held thereafter
    pub target_ebitda_margin: Rate,
    /// Depreciation & amortisation as a percentage of revenue
    pub da_pct_revenue: Rate,
    /// Tax rate on positive EBIT
    pub tax_rate: Rate,
    /// Capital expenditure as a percentage of revenue
    pub capex_pct_revenue: Rate,
    /// Change in net working capital as a percentage of incremental revenue
    pub nwc_pct_incremental_revenue: Rate,
    /// Weighted average cost of capital (discount rate)
    pub wacc: Rate,
}

impl Default for AssumptionSet {
    fn default() -> Self {
        AssumptionSet {
            company_name: String::new(),
            base_revenue: dec!(1000),
            current_price: Some(dec!(100)),
            shares_outstanding: dec!(100),
            net_debt: Decimal::ZERO,
            revenue_growth_y1: dec!(0.10),
            revenue_growth_y5: dec!(0.05),
            terminal_growth: dec!(0.025),
            base_ebitda_margin: dec!(0.20),
            target_ebitda_margin: dec!(0.25),
            da_pct_revenue: dec!(0.03),
            tax_rate: dec!(0.21),
            capex_pct_revenue: dec!(0.04),
            nwc_pct_incremental_revenue: dec!(0.01),
            wacc: dec!(0.10),
        }
    }
}

/// Numeric assumption addressable by name, for sensitivity sweeps and scenario overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionField {
    BaseRevenue,
    CurrentPrice,
    SharesOutstanding,
    NetDebt,
    RevenueGrowthY1,
    RevenueGrowthY5,
    TerminalGrowth,
    BaseEbitdaMargin,
    TargetEbitdaMargin,
    DaPctRevenue,
    TaxRate,
    CapexPctRevenue,
    NwcPctIncrementalRevenue,
    Wacc,
}

impl AssumptionField {
    pub const ALL: [AssumptionField; 14] = [
        AssumptionField::BaseRevenue,
        AssumptionField::CurrentPrice,
        AssumptionField::SharesOutstanding,
        AssumptionField::NetDebt,
        AssumptionField::RevenueGrowthY1,
        AssumptionField::RevenueGrowthY5,
        AssumptionField::TerminalGrowth,
        AssumptionField::BaseEbitdaMargin,
        AssumptionField::TargetEbitdaMargin,
        AssumptionField::DaPctRevenue,
        AssumptionField::TaxRate,
        AssumptionField::CapexPctRevenue,
        AssumptionField::NwcPctIncrementalRevenue,
        AssumptionField::Wacc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AssumptionField::BaseRevenue => "base_revenue",
            AssumptionField::CurrentPrice => "current_price",
            AssumptionField::SharesOutstanding => "shares_outstanding",
            AssumptionField::NetDebt => "net_debt",
            AssumptionField::RevenueGrowthY1 => "revenue_growth_y1",
            AssumptionField::RevenueGrowthY5 => "revenue_growth_y5",
            AssumptionField::TerminalGrowth => "terminal_growth",
            AssumptionField::BaseEbitdaMargin => "base_ebitda_margin",
            AssumptionField::TargetEbitdaMargin => "target_ebitda_margin",
            AssumptionField::DaPctRevenue => "da_pct_revenue",
            AssumptionField::TaxRate => "tax_rate",
            AssumptionField::CapexPctRevenue => "capex_pct_revenue",
            AssumptionField::NwcPctIncrementalRevenue => "nwc_pct_incremental_revenue",
            AssumptionField::Wacc => "wacc",
        }
    }
}

impl fmt::Display for AssumptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AssumptionField {
    type Err = DcfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace('-', "_");
        // Short aliases accepted on the command line and in preset files
        let canonical = match normalised.as_str() {
            "revenue_growth_terminal" | "terminal_growth_rate" => "terminal_growth",
            "current_stock_price" | "price" => "current_price",
            "shares" => "shares_outstanding",
            "da_revenue" => "da_pct_revenue",
            "capex_revenue" => "capex_pct_revenue",
            "nwc_revenue" => "nwc_pct_incremental_revenue",
            other => other,
        };
        AssumptionField::ALL
            .iter()
            .copied()
            .find(|f| f.name() == canonical)
            .ok_or_else(|| DcfError::InvalidInput {
                field: "variable".into(),
                reason: format!("Unknown assumption '{s}'"),
            })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl AssumptionSet {
    /// Read a numeric field. An absent current price reads as zero.
    pub fn get(&self, field: AssumptionField) -> Decimal {
        match field {
            AssumptionField::BaseRevenue => self.base_revenue,
            AssumptionField::CurrentPrice => self.current_price.unwrap_or(Decimal::ZERO),
            AssumptionField::SharesOutstanding => self.shares_outstanding,
            AssumptionField::NetDebt => self.net_debt,
            AssumptionField::RevenueGrowthY1 => self.revenue_growth_y1,
            AssumptionField::RevenueGrowthY5 => self.revenue_growth_y5,
            AssumptionField::TerminalGrowth => self.terminal_growth,
            AssumptionField::BaseEbitdaMargin => self.base_ebitda_margin,
            AssumptionField::TargetEbitdaMargin => self.target_ebitda_margin,
            AssumptionField::DaPctRevenue => self.da_pct_revenue,
            AssumptionField::TaxRate => self.tax_rate,
            AssumptionField::CapexPctRevenue => self.capex_pct_revenue,
            AssumptionField::NwcPctIncrementalRevenue => self.nwc_pct_incremental_revenue,
            AssumptionField::Wacc => self.wacc,
        }
    }

    /// Copy of this set with exactly one field replaced.
    pub fn with(&self, field: AssumptionField, value: Decimal) -> AssumptionSet {
        let mut next = self.clone();
        match field {
            AssumptionField::BaseRevenue => next.base_revenue = value,
            AssumptionField::CurrentPrice => next.current_price = Some(value),
            AssumptionField::SharesOutstanding => next.shares_outstanding = value,
            AssumptionField::NetDebt => next.net_debt = value,
            AssumptionField::RevenueGrowthY1 => next.revenue_growth_y1 = value,
            AssumptionField::RevenueGrowthY5 => next.revenue_growth_y5 = value,
            AssumptionField::TerminalGrowth => next.terminal_growth = value,
            AssumptionField::BaseEbitdaMargin => next.base_ebitda_margin = value,
            AssumptionField::TargetEbitdaMargin => next.target_ebitda_margin = value,
            AssumptionField::DaPctRevenue => next.da_pct_revenue = value,
            AssumptionField::TaxRate => next.tax_rate = value,
            AssumptionField::CapexPctRevenue => next.capex_pct_revenue = value,
            AssumptionField::NwcPctIncrementalRevenue => next.nwc_pct_incremental_revenue = value,
            AssumptionField::Wacc => next.wacc = value,
        }
        next
    }

    /// Check every field against its domain, returning the first violation.
    ///
    /// Values are rejected rather than clamped. The discount-rate check runs
    /// last so that a malformed WACC is reported as a range error first.
    pub fn validate(&self) -> DcfResult<()> {
        if self.base_revenue < Decimal::ZERO {
            return Err(DcfError::out_of_range(
                "base_revenue",
                self.base_revenue,
                "Base revenue cannot be negative",
            ));
        }
        if let Some(price) = self.current_price {
            if price < Decimal::ZERO {
                return Err(DcfError::out_of_range(
                    "current_price",
                    price,
                    "Current price cannot be negative",
                ));
            }
        }
        if self.shares_outstanding <= Decimal::ZERO {
            return Err(DcfError::InvalidShareCount {
                shares_outstanding: self.shares_outstanding,
            });
        }

        for (field, value) in [
            ("revenue_growth_y1", self.revenue_growth_y1),
            ("revenue_growth_y5", self.revenue_growth_y5),
            ("terminal_growth", self.terminal_growth),
        ] {
            if value <= dec!(-1) || value > Decimal::ONE {
                return Err(DcfError::out_of_range(
                    field,
                    value,
                    "Growth rate must be greater than -100% and at most 100%",
                ));
            }
        }

        for (field, value) in [
            ("base_ebitda_margin", self.base_ebitda_margin),
            ("target_ebitda_margin", self.target_ebitda_margin),
            ("nwc_pct_incremental_revenue", self.nwc_pct_incremental_revenue),
        ] {
            if value < dec!(-1) || value > Decimal::ONE {
                return Err(DcfError::out_of_range(
                    field,
                    value,
                    "Must be between -100% and 100%",
                ));
            }
        }

        for (field, value) in [
            ("da_pct_revenue", self.da_pct_revenue),
            ("tax_rate", self.tax_rate),
            ("capex_pct_revenue", self.capex_pct_revenue),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(DcfError::out_of_range(
                    field,
                    value,
                    "Must be between 0% and 100%",
                ));
            }
        }

        if self.wacc <= Decimal::ZERO || self.wacc > Decimal::ONE {
            return Err(DcfError::out_of_range(
                "wacc",
                self.wacc,
                "WACC must be greater than 0% and at most 100%",
            ));
        }

        // Gordon growth model constraint
        if self.wacc <= self.terminal_growth {
            return Err(DcfError::InvalidDiscountRate {
                wacc: self.wacc,
                terminal_growth: self.terminal_growth,
            });
        }

        Ok(())
    }

    /// Flat ordered records for the "Assumptions" export sheet.
    pub fn line_items(&self) -> Vec<LineItem> {
        AssumptionField::ALL
            .iter()
            .map(|&field| match field {
                AssumptionField::CurrentPrice => {
                    LineItem::optional(field.name(), self.current_price)
                }
                _ => LineItem::new(field.name(), self.get(field)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(AssumptionSet::default().validate().is_ok());
    }

    #[test]
    fn test_with_replaces_only_one_field() {
        let base = AssumptionSet::default();
        let changed = base.with(AssumptionField::Wacc, dec!(0.08));
        assert_eq!(changed.wacc, dec!(0.08));
        assert_eq!(changed.with(AssumptionField::Wacc, base.wacc), base);
    }

    #[test]
    fn test_get_and_with_agree_for_every_field() {
        let base = AssumptionSet::default();
        for field in AssumptionField::ALL {
            let changed = base.with(field, dec!(0.123));
            assert_eq!(changed.get(field), dec!(0.123), "field {field}");
        }
    }

    #[test]
    fn test_field_parsing_and_aliases() {
        assert_eq!("wacc".parse::<AssumptionField>().unwrap(), AssumptionField::Wacc);
        assert_eq!(
            "revenue-growth-y1".parse::<AssumptionField>().unwrap(),
            AssumptionField::RevenueGrowthY1
        );
        assert_eq!(
            "revenue_growth_terminal".parse::<AssumptionField>().unwrap(),
            AssumptionField::TerminalGrowth
        );
        assert!("beta".parse::<AssumptionField>().is_err());
    }

    #[test]
    fn test_tax_rate_out_of_range_rejected() {
        let input = AssumptionSet {
            tax_rate: dec!(1.5),
            ..AssumptionSet::default()
        };
        match input.validate() {
            Err(DcfError::InvalidAssumptionRange { field, value, .. }) => {
                assert_eq!(field, "tax_rate");
                assert_eq!(value, dec!(1.5));
            }
            other => panic!("expected InvalidAssumptionRange, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_growth_above_wacc_rejected() {
        let input = AssumptionSet {
            wacc: dec!(0.10),
            terminal_growth: dec!(0.12),
            ..AssumptionSet::default()
        };
        assert_eq!(
            input.validate(),
            Err(DcfError::InvalidDiscountRate {
                wacc: dec!(0.10),
                terminal_growth: dec!(0.12),
            })
        );
    }

    #[test]
    fn test_zero_shares_rejected() {
        let input = AssumptionSet {
            shares_outstanding: Decimal::ZERO,
            ..AssumptionSet::default()
        };
        assert!(matches!(
            input.validate(),
            Err(DcfError::InvalidShareCount { .. })
        ));
    }

    #[test]
    fn test_negative_net_debt_allowed() {
        let input = AssumptionSet {
            net_debt: dec!(-250),
            ..AssumptionSet::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_missing_price_allowed() {
        let input = AssumptionSet {
            current_price: None,
            ..AssumptionSet::default()
        };
        assert!(input.validate().is_ok());
        assert_eq!(input.get(AssumptionField::CurrentPrice), Decimal::ZERO);
    }

    #[test]
    fn test_line_items_cover_every_field() {
        let items = AssumptionSet::default().line_items();
        assert_eq!(items.len(), AssumptionField::ALL.len());
        assert_eq!(items[0].label, "base_revenue");
        assert_eq!(items.last().unwrap().value, Some(dec!(0.10)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = serde_json::json!({
            "base_revenue": "500",
            "shares_outstanding": "50",
            "revenue_growth_y1": "0.12",
            "revenue_growth_y5": "0.06",
            "terminal_growth": "0.02",
            "base_ebitda_margin": "0.18",
            "target_ebitda_margin": "0.22",
            "da_pct_revenue": "0.03",
            "tax_rate": "0.21",
            "capex_pct_revenue": "0.04",
            "nwc_pct_incremental_revenue": "0.02",
            "wacc": "0.09"
        });
        let input: AssumptionSet = serde_json::from_value(json).unwrap();
        assert_eq!(input.net_debt, Decimal::ZERO);
        assert!(input.current_price.is_none());
        assert!(input.company_name.is_empty());
    }
}
