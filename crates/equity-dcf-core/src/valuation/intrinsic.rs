use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assumptions::AssumptionSet;
use crate::error::DcfError;
use crate::types::{LineItem, Money, Multiple, Rate};
use crate::DcfResult;

use super::projection::ProjectionTable;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Valuation derived from a projection table and its assumption set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Sum of present values of explicit-period FCFFs
    pub pv_projection_period: Money,
    /// Final-year FCFF grown one year at the terminal rate
    pub terminal_fcff: Money,
    /// Gordon growth terminal value at the end of the horizon
    pub terminal_value: Money,
    /// Present value of terminal value
    pub pv_terminal_value: Money,
    /// Enterprise value = PV(FCFFs) + PV(TV)
    pub enterprise_value: Money,
    /// Equity value = EV - net debt
    pub equity_value: Money,
    /// Intrinsic value per share
    pub value_per_share: Money,
    /// Price the upside is measured against, if one was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    /// (value per share - price) / price; absent without a positive price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside: Option<Rate>,
    /// EV / base-year revenue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_ev_revenue: Option<Multiple>,
    /// Equity value / year-1 NOPAT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_pe: Option<Multiple>,
    /// PV of terminal value as a fraction of enterprise value
    pub terminal_value_pct: Rate,
}

impl ValuationResult {
    /// Upside vs. the current price, or `MissingComparisonPrice` when there is none.
    pub fn upside(&self) -> DcfResult<Rate> {
        self.upside.ok_or(DcfError::MissingComparisonPrice)
    }

    /// Flat ordered records for the "Valuation" export sheet.
    pub fn line_items(&self) -> Vec<LineItem> {
        vec![
            LineItem::new("pv_projection_period", self.pv_projection_period),
            LineItem::new("terminal_fcff", self.terminal_fcff),
            LineItem::new("terminal_value", self.terminal_value),
            LineItem::new("pv_terminal_value", self.pv_terminal_value),
            LineItem::new("enterprise_value", self.enterprise_value),
            LineItem::new("equity_value", self.equity_value),
            LineItem::new("value_per_share", self.value_per_share),
            LineItem::optional("current_price", self.current_price),
            LineItem::optional("upside", self.upside),
            LineItem::optional("implied_ev_revenue", self.implied_ev_revenue),
            LineItem::optional("implied_pe", self.implied_pe),
            LineItem::new("terminal_value_pct", self.terminal_value_pct),
        ]
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Turn a projection table into terminal, enterprise, equity and per-share value.
///
/// The discount-rate and share-count guards run before any terminal value
/// is computed, so a diverging Gordon formula never produces a number.
pub fn value_projection(
    assumptions: &AssumptionSet,
    projection: &ProjectionTable,
) -> DcfResult<ValuationResult> {
    let wacc = assumptions.wacc;
    let g = assumptions.terminal_growth;

    if wacc <= g {
        return Err(DcfError::InvalidDiscountRate {
            wacc,
            terminal_growth: g,
        });
    }
    if assumptions.shares_outstanding <= Decimal::ZERO {
        return Err(DcfError::InvalidShareCount {
            shares_outstanding: assumptions.shares_outstanding,
        });
    }

    let (first, last) = match (projection.first(), projection.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(DcfError::InvalidInput {
                field: "projection".into(),
                reason: "No projection years generated".into(),
            })
        }
    };

    // --- Terminal value (Gordon growth) ---
    let terminal_fcff = last
        .fcff
        .checked_mul(Decimal::ONE + g)
        .ok_or_else(|| DcfError::overflow("base_revenue", assumptions.base_revenue, "Terminal FCFF"))?;
    let terminal_value = terminal_fcff
        .checked_div(wacc - g)
        .ok_or_else(|| DcfError::overflow("terminal_growth", g, "Terminal value"))?;
    let pv_terminal_value = (Decimal::ONE + wacc)
        .checked_powi(i64::from(last.year))
        .and_then(|compound| terminal_value.checked_div(compound))
        .ok_or_else(|| DcfError::overflow("terminal_growth", g, "PV of terminal value"))?;

    // --- Enterprise and equity value ---
    let pv_projection_period = projection
        .pv_of_fcff()
        .ok_or_else(|| DcfError::overflow("base_revenue", assumptions.base_revenue, "PV of FCFF"))?;
    let enterprise_value = pv_projection_period
        .checked_add(pv_terminal_value)
        .ok_or_else(|| DcfError::overflow("terminal_growth", g, "Enterprise value"))?;
    let equity_value = enterprise_value
        .checked_sub(assumptions.net_debt)
        .ok_or_else(|| DcfError::overflow("net_debt", assumptions.net_debt, "Equity value"))?;
    let value_per_share = equity_value
        .checked_div(assumptions.shares_outstanding)
        .ok_or_else(|| {
            DcfError::overflow(
                "shares_outstanding",
                assumptions.shares_outstanding,
                "Value per share",
            )
        })?;

    let current_price = assumptions.current_price;
    let upside = current_price
        .filter(|p| *p > Decimal::ZERO)
        .map(|p| {
            value_per_share
                .checked_sub(p)
                .and_then(|gap| gap.checked_div(p))
                .ok_or_else(|| DcfError::overflow("current_price", p, "Upside"))
        })
        .transpose()?;

    // Multiples are undefined for a zero (or vanishing) denominator
    let implied_ev_revenue = enterprise_value.checked_div(assumptions.base_revenue);
    let implied_pe = if first.nopat > Decimal::ZERO {
        equity_value.checked_div(first.nopat)
    } else {
        None
    };
    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_terminal_value
            .checked_div(enterprise_value)
            .ok_or_else(|| DcfError::overflow("terminal_growth", g, "Terminal value share of EV"))?
    };

    debug!(
        enterprise_value = %enterprise_value.round_dp(2),
        value_per_share = %value_per_share.round_dp(4),
        "valued projection"
    );

    Ok(ValuationResult {
        pv_projection_period,
        terminal_fcff,
        terminal_value,
        pv_terminal_value,
        enterprise_value,
        equity_value,
        value_per_share,
        current_price,
        upside,
        implied_ev_revenue,
        implied_pe,
        terminal_value_pct,
    })
}
