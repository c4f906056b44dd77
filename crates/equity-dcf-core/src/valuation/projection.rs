use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assumptions::AssumptionSet;
use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::growth::RAMP_YEARS;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Projection for a single year of the DCF model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    /// 1-based projection year
    pub year: u32,
    pub revenue: Money,
    pub revenue_growth: Rate,
    pub ebitda: Money,
    pub ebitda_margin: Rate,
    pub da: Money,
    pub ebit: Money,
    pub taxes: Money,
    pub nopat: Money,
    pub capex: Money,
    pub nwc_change: Money,
    pub fcff: Money,
    pub discount_factor: Rate,
    pub pv_fcff: Money,
}

/// Year-ordered projection rows derived from one assumption set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionTable {
    rows: Vec<ProjectionRow>,
}

impl ProjectionTable {
    pub fn rows(&self) -> &[ProjectionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&ProjectionRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&ProjectionRow> {
        self.rows.last()
    }

    /// Sum of discounted free cash flows over the explicit period, or `None`
    /// if the sum leaves the Decimal range.
    pub fn pv_of_fcff(&self) -> Option<Money> {
        self.rows
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.pv_fcff))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// EBITDA margin for a 1-based year: linear ramp from base to target,
/// reaching the target at year 5 and flat afterwards.
pub fn margin_for_year(base_margin: Rate, target_margin: Rate, year: u32) -> Rate {
    if year >= RAMP_YEARS {
        return target_margin;
    }
    let progress = Decimal::from(year) / Decimal::from(RAMP_YEARS);
    base_margin + (target_margin - base_margin) * progress
}

/// Project one year from the prior year's revenue.
///
/// Every line item uses checked arithmetic; a figure that leaves the Decimal
/// range is reported against the assumption that drives it.
pub fn project_year(
    assumptions: &AssumptionSet,
    year: u32,
    growth: Rate,
    prev_revenue: Money,
) -> DcfResult<ProjectionRow> {
    let overflow =
        |figure: &str| DcfError::overflow("base_revenue", assumptions.base_revenue, figure);

    let revenue = prev_revenue
        .checked_mul(Decimal::ONE + growth)
        .ok_or_else(|| overflow("Revenue"))?;
    let ebitda_margin = margin_for_year(
        assumptions.base_ebitda_margin,
        assumptions.target_ebitda_margin,
        year,
    );
    let ebitda = revenue
        .checked_mul(ebitda_margin)
        .ok_or_else(|| overflow("EBITDA"))?;
    let da = revenue
        .checked_mul(assumptions.da_pct_revenue)
        .ok_or_else(|| overflow("D&A"))?;
    let ebit = ebitda.checked_sub(da).ok_or_else(|| overflow("EBIT"))?;

    // Loss years pay no tax; no carryforward
    let taxes = ebit
        .max(Decimal::ZERO)
        .checked_mul(assumptions.tax_rate)
        .ok_or_else(|| overflow("Taxes"))?;
    let nopat = ebit.checked_sub(taxes).ok_or_else(|| overflow("NOPAT"))?;

    let capex = revenue
        .checked_mul(assumptions.capex_pct_revenue)
        .ok_or_else(|| overflow("Capex"))?;
    let nwc_change = revenue
        .checked_sub(prev_revenue)
        .and_then(|delta| delta.checked_mul(assumptions.nwc_pct_incremental_revenue))
        .ok_or_else(|| overflow("Change in NWC"))?;

    // FCFF = NOPAT + D&A - CapEx - Delta NWC
    let fcff = nopat
        .checked_add(da)
        .and_then(|v| v.checked_sub(capex))
        .and_then(|v| v.checked_sub(nwc_change))
        .ok_or_else(|| overflow("FCFF"))?;

    let discount_factor = (Decimal::ONE + assumptions.wacc)
        .checked_powi(i64::from(year))
        .and_then(|compound| Decimal::ONE.checked_div(compound))
        .ok_or_else(|| DcfError::overflow("wacc", assumptions.wacc, "Discount factor"))?;
    let pv_fcff = fcff
        .checked_mul(discount_factor)
        .ok_or_else(|| overflow("PV of FCFF"))?;

    Ok(ProjectionRow {
        year,
        revenue,
        revenue_growth: growth,
        ebitda,
        ebitda_margin,
        da,
        ebit,
        taxes,
        nopat,
        capex,
        nwc_change,
        fcff,
        discount_factor,
        pv_fcff,
    })
}

/// Build the full projection table, one row per growth-curve entry.
///
/// Rows are folded in year order: each year's revenue and working-capital
/// change roll forward from the previous row. The first row that fails
/// stops the fold.
pub fn build_projection(
    assumptions: &AssumptionSet,
    growth_curve: &[Rate],
) -> DcfResult<ProjectionTable> {
    if growth_curve.is_empty() {
        return Err(DcfError::InvalidInput {
            field: "growth_curve".into(),
            reason: "At least one projection year is required".into(),
        });
    }
    if assumptions.wacc <= Decimal::ZERO {
        return Err(DcfError::out_of_range(
            "wacc",
            assumptions.wacc,
            "WACC must be greater than 0%",
        ));
    }

    let rows = growth_curve
        .iter()
        .zip(1u32..)
        .scan(assumptions.base_revenue, |prev_revenue, (&growth, year)| {
            let row = project_year(assumptions, year, growth, *prev_revenue);
            if let Ok(ref r) = row {
                *prev_revenue = r.revenue;
            }
            Some(row)
        })
        .collect::<DcfResult<Vec<_>>>()?;

    debug!(
        years = rows.len(),
        final_revenue = %rows.last().map(|r| r.revenue).unwrap_or_default(),
        "built projection table"
    );

    Ok(ProjectionTable { rows })
}
