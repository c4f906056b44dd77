use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::assumptions::AssumptionSet;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::DcfResult;

use super::growth::generate_growth_curve;
use super::intrinsic::{value_projection, ValuationResult};
use super::projection::{build_projection, ProjectionTable};

/// Terminal value share of EV above which a warning is attached.
const TERMINAL_VALUE_WARNING_PCT: Rate = dec!(0.75);

/// Growth curve, projection table and valuation for one assumption set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfOutput {
    pub growth_curve: Vec<Rate>,
    pub projection: ProjectionTable,
    pub valuation: ValuationResult,
}

/// Run growth curve -> projection -> valuation for one assumption set.
///
/// Assumptions are validated up front so no projection work is done for an
/// input that would fail later. This is the unit that sensitivity and
/// scenario analysis re-run.
pub fn compute_dcf(assumptions: &AssumptionSet) -> DcfResult<DcfOutput> {
    assumptions.validate()?;

    let growth_curve = generate_growth_curve(
        assumptions.revenue_growth_y1,
        assumptions.revenue_growth_y5,
        assumptions.terminal_growth,
    );
    let projection = build_projection(assumptions, &growth_curve)?;
    let valuation = value_projection(assumptions, &projection)?;

    Ok(DcfOutput {
        growth_curve,
        projection,
        valuation,
    })
}

/// Run a 10-year FCFF DCF valuation with diagnostics.
pub fn run_dcf(assumptions: &AssumptionSet) -> DcfResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    debug!(company = %assumptions.company_name, wacc = %assumptions.wacc, "running DCF");

    let output = compute_dcf(assumptions)?;
    let warnings = collect_warnings(&output);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "10-Year FCFF DCF (Gordon Growth Terminal Value)",
        assumptions,
        warnings,
        elapsed,
        output,
    ))
}

fn collect_warnings(output: &DcfOutput) -> Vec<String> {
    let mut warnings = Vec::new();
    let v = &output.valuation;

    if v.terminal_value_pct > TERMINAL_VALUE_WARNING_PCT {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; the valuation is dominated by perpetuity assumptions",
            v.terminal_value_pct.saturating_mul(dec!(100))
        ));
    }
    if let Some(last) = output.projection.last() {
        if last.fcff < Decimal::ZERO {
            warnings.push(format!(
                "Final-year FCFF is negative ({:.2}); terminal value is negative",
                last.fcff
            ));
        }
    }
    let loss_years: Vec<String> = output
        .projection
        .rows()
        .iter()
        .filter(|r| r.ebit < Decimal::ZERO)
        .map(|r| r.year.to_string())
        .collect();
    if !loss_years.is_empty() {
        warnings.push(format!(
            "EBIT is negative in year(s) {}; no tax shield is modelled for losses",
            loss_years.join(", ")
        ));
    }
    if v.equity_value < Decimal::ZERO {
        warnings.push(format!(
            "Equity value is negative ({:.2}); net debt exceeds enterprise value",
            v.equity_value
        ));
    }

    warnings
}
