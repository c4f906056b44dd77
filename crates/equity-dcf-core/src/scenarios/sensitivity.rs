use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::assumptions::{AssumptionField, AssumptionSet};
use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::dcf::compute_dcf;
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Candidate values for the variable being swept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityRange {
    /// Explicit values, evaluated in the given order
    Values(Vec<Decimal>),
    /// Inclusive sweep from min to max; max is appended if the step overshoots it
    Step {
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },
}

/// Input for one-variable sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub base: AssumptionSet,
    pub variable: AssumptionField,
    pub range: SensitivityRange,
}

/// Outcome of re-running the pipeline at one candidate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointOutcome {
    Valued {
        value_per_share: Money,
        /// (value per share - base) / base; absent when the base value is zero
        /// or the ratio is out of range
        #[serde(skip_serializing_if = "Option::is_none")]
        change_vs_base: Option<Rate>,
    },
    Failed {
        reason: String,
    },
}

/// One row of a sensitivity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: Decimal,
    #[serde(flatten)]
    pub outcome: PointOutcome,
}

impl SensitivityPoint {
    pub fn value_per_share(&self) -> Option<Money> {
        match self.outcome {
            PointOutcome::Valued {
                value_per_share, ..
            } => Some(value_per_share),
            PointOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PointOutcome::Failed { .. })
    }
}

/// Sensitivity table for one varied assumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub variable: AssumptionField,
    /// The variable's value in the base assumption set
    pub base_value: Decimal,
    pub base_value_per_share: Money,
    /// Rows in the caller's range order
    pub points: Vec<SensitivityPoint>,
}

// ---------------------------------------------------------------------------
// Range generation
// ---------------------------------------------------------------------------

impl SensitivityRange {
    /// Symmetric sweep `base - spread ..= base + spread`.
    pub fn around(base: Decimal, spread: Decimal, step: Decimal) -> Self {
        SensitivityRange::Step {
            min: base.saturating_sub(spread),
            max: base.saturating_add(spread),
            step,
        }
    }

    /// Expand into the ordered list of candidate values.
    pub fn values(&self) -> DcfResult<Vec<Decimal>> {
        match self {
            SensitivityRange::Values(values) => {
                if values.is_empty() {
                    return Err(DcfError::InvalidInput {
                        field: "range".into(),
                        reason: "At least one value required".into(),
                    });
                }
                Ok(values.clone())
            }
            SensitivityRange::Step { min, max, step } => generate_sweep_values(*min, *max, *step),
        }
    }
}

/// Upper bound on the number of points a min/max/step range may expand to.
pub const MAX_SWEEP_POINTS: u32 = 1000;

/// Generate the sweep values from min to max with step.
fn generate_sweep_values(min: Decimal, max: Decimal, step: Decimal) -> DcfResult<Vec<Decimal>> {
    if step <= Decimal::ZERO {
        return Err(DcfError::InvalidInput {
            field: "range.step".into(),
            reason: "Step must be positive".into(),
        });
    }
    if min > max {
        return Err(DcfError::InvalidInput {
            field: "range".into(),
            reason: "Min must be <= max".into(),
        });
    }

    // ceil((max - min) / step) + 1 points, counting the appended max
    let too_many = max
        .checked_sub(min)
        .and_then(|span| span.checked_div(step))
        .map_or(true, |steps| steps.ceil() >= Decimal::from(MAX_SWEEP_POINTS));
    if too_many {
        return Err(DcfError::InvalidInput {
            field: "range.step".into(),
            reason: format!("Range expands to more than {MAX_SWEEP_POINTS} points"),
        });
    }

    let mut values = Vec::new();
    let mut current = min;
    while current <= max {
        values.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < max {
            values.push(max);
        }
    }

    Ok(values)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Re-run the full pipeline once per candidate value of `variable`.
///
/// The base case is computed once and must itself be valid. Each point is
/// independent: a point that fails validation is recorded as `Failed` and
/// does not affect its siblings.
pub fn analyze_sensitivity(
    base: &AssumptionSet,
    variable: AssumptionField,
    values: &[Decimal],
) -> DcfResult<SensitivityResult> {
    let base_value_per_share = compute_dcf(base)?.valuation.value_per_share;
    Ok(sweep(base, variable, values, base_value_per_share))
}

/// Run several one-variable sweeps against a single base-case computation.
pub fn analyze_sensitivity_batch(
    base: &AssumptionSet,
    sweeps: &[(AssumptionField, SensitivityRange)],
) -> DcfResult<Vec<SensitivityResult>> {
    let base_value_per_share = compute_dcf(base)?.valuation.value_per_share;
    sweeps
        .iter()
        .map(|(variable, range)| {
            let values = range.values()?;
            Ok(sweep(base, *variable, &values, base_value_per_share))
        })
        .collect()
}

/// Run sensitivity analysis with metadata and warnings.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> DcfResult<ComputationOutput<SensitivityResult>> {
    let start = Instant::now();

    let values = input.range.values()?;
    let result = analyze_sensitivity(&input.base, input.variable, &values)?;
    let warnings = sensitivity_warnings(&result);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-Way DCF Sensitivity Analysis",
        &serde_json::json!({
            "variable": input.variable,
            "range": input.range,
            "points": values.len(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Run several sweeps with metadata and warnings.
pub fn run_sensitivity_batch(
    base: &AssumptionSet,
    sweeps: &[(AssumptionField, SensitivityRange)],
) -> DcfResult<ComputationOutput<Vec<SensitivityResult>>> {
    let start = Instant::now();

    let results = analyze_sensitivity_batch(base, sweeps)?;
    let warnings = results.iter().flat_map(sensitivity_warnings).collect();
    let variables: Vec<&str> = sweeps.iter().map(|(v, _)| v.name()).collect();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-Way DCF Sensitivity Analysis (Batch)",
        &serde_json::json!({ "variables": variables }),
        warnings,
        elapsed,
        results,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn sweep(
    base: &AssumptionSet,
    variable: AssumptionField,
    values: &[Decimal],
    base_value_per_share: Money,
) -> SensitivityResult {
    debug!(%variable, points = values.len(), "running sensitivity sweep");

    let points = evaluate_points(values, |value| {
        evaluate_point(base, variable, value, base_value_per_share)
    });

    SensitivityResult {
        variable,
        base_value: base.get(variable),
        base_value_per_share,
        points,
    }
}

fn evaluate_point(
    base: &AssumptionSet,
    variable: AssumptionField,
    value: Decimal,
    base_value_per_share: Money,
) -> SensitivityPoint {
    let outcome = match compute_dcf(&base.with(variable, value)) {
        Ok(out) => {
            let value_per_share = out.valuation.value_per_share;
            let change_vs_base = value_per_share
                .checked_sub(base_value_per_share)
                .and_then(|delta| delta.checked_div(base_value_per_share));
            PointOutcome::Valued {
                value_per_share,
                change_vs_base,
            }
        }
        Err(e) => {
            warn!(%variable, %value, error = %e, "sensitivity point failed");
            PointOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    SensitivityPoint { value, outcome }
}

#[cfg(feature = "parallel")]
fn evaluate_points<F>(values: &[Decimal], eval_fn: F) -> Vec<SensitivityPoint>
where
    F: Fn(Decimal) -> SensitivityPoint + Sync + Send,
{
    use rayon::prelude::*;

    // Collect preserves input order regardless of completion order
    values.par_iter().map(|v| eval_fn(*v)).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_points<F>(values: &[Decimal], eval_fn: F) -> Vec<SensitivityPoint>
where
    F: Fn(Decimal) -> SensitivityPoint,
{
    values.iter().map(|v| eval_fn(*v)).collect()
}

fn sensitivity_warnings(result: &SensitivityResult) -> Vec<String> {
    result
        .points
        .iter()
        .filter_map(|p| match &p.outcome {
            PointOutcome::Failed { reason } => Some(format!(
                "Evaluation failed at {} = {}: {reason}",
                result.variable, p.value
            )),
            PointOutcome::Valued { .. } => None,
        })
        .chain(
            base_is_zero(result).then(|| {
                "Base case value per share is zero; change vs base is not defined".to_string()
            }),
        )
        .collect()
}

fn base_is_zero(result: &SensitivityResult) -> bool {
    result.base_value_per_share.is_zero()
}
