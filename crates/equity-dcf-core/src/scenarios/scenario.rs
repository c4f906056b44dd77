use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

use crate::assumptions::{AssumptionField, AssumptionSet};
use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::dcf::compute_dcf;
use crate::valuation::intrinsic::ValuationResult;
use crate::valuation::projection::ProjectionTable;
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a preset changes one assumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Add to the base value (e.g. -0.05 for "-5pp")
    Shift(Decimal),
    /// Replace the base value
    Set(Decimal),
}

/// A single field override within a preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub field: AssumptionField,
    pub adjustment: Adjustment,
}

/// A named scenario: overrides merged on top of the base assumptions.
/// A preset with no overrides reproduces the base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub name: String,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

/// Ordered table of presets, validated at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PresetTable {
    presets: Vec<ScenarioPreset>,
}

/// Pipeline output for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCase {
    pub name: String,
    /// Base assumptions with this preset's overrides applied
    pub assumptions: AssumptionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation: Option<ValuationResult>,
    /// Set when the merged assumptions fail validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary row per scenario for side-by-side display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_per_share: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_value: Option<Money>,
    /// Upside vs. the current share price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside: Option<Rate>,
    /// Value per share deviation vs. the unmodified base assumptions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation_from_base: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation_pct: Option<Rate>,
}

/// Scenario results in preset-table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub cases: Vec<ScenarioCase>,
    pub summary: Vec<ScenarioSummary>,
}

impl ScenarioResult {
    pub fn get(&self, name: &str) -> Option<&ScenarioCase> {
        self.cases.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

impl Adjustment {
    pub fn apply(&self, base_value: Decimal) -> Decimal {
        match *self {
            Adjustment::Shift(delta) => base_value.saturating_add(delta),
            Adjustment::Set(value) => value,
        }
    }
}

impl ScenarioPreset {
    pub fn new(name: &str, overrides: Vec<Override>) -> Self {
        ScenarioPreset {
            name: name.to_string(),
            overrides,
        }
    }

    /// Merge this preset onto `base`; fields without an override are inherited.
    pub fn apply(&self, base: &AssumptionSet) -> AssumptionSet {
        self.overrides.iter().fold(base.clone(), |acc, o| {
            let value = o.adjustment.apply(acc.get(o.field));
            acc.with(o.field, value)
        })
    }
}

impl Override {
    pub fn shift(field: AssumptionField, delta: Decimal) -> Self {
        Override {
            field,
            adjustment: Adjustment::Shift(delta),
        }
    }

    pub fn set(field: AssumptionField, value: Decimal) -> Self {
        Override {
            field,
            adjustment: Adjustment::Set(value),
        }
    }
}

impl PresetTable {
    /// Validate and wrap an ordered list of presets.
    pub fn new(presets: Vec<ScenarioPreset>) -> DcfResult<Self> {
        if presets.is_empty() {
            return Err(DcfError::InvalidInput {
                field: "presets".into(),
                reason: "At least one scenario required".into(),
            });
        }

        let mut seen = HashSet::new();
        for preset in &presets {
            if preset.name.trim().is_empty() {
                return Err(DcfError::InvalidInput {
                    field: "presets.name".into(),
                    reason: "Scenario name cannot be empty".into(),
                });
            }
            if !seen.insert(preset.name.as_str()) {
                return Err(DcfError::InvalidInput {
                    field: format!("scenario:{}", preset.name),
                    reason: "Duplicate scenario name".into(),
                });
            }
            let mut fields = HashSet::new();
            for o in &preset.overrides {
                if !fields.insert(o.field) {
                    return Err(DcfError::InvalidInput {
                        field: format!("scenario:{} {}", preset.name, o.field),
                        reason: "Field overridden more than once".into(),
                    });
                }
            }
        }

        Ok(PresetTable { presets })
    }

    /// Bear / Base / Bull with fixed absolute deltas.
    pub fn bear_base_bull() -> Self {
        use AssumptionField::*;

        PresetTable {
            presets: vec![
                ScenarioPreset::new(
                    "Bear",
                    vec![
                        Override::shift(RevenueGrowthY1, dec!(-0.05)),
                        Override::shift(RevenueGrowthY5, dec!(-0.03)),
                        Override::shift(TargetEbitdaMargin, dec!(-0.02)),
                        Override::shift(Wacc, dec!(0.01)),
                        Override::set(TerminalGrowth, dec!(0.015)),
                    ],
                ),
                ScenarioPreset::new("Base", vec![]),
                ScenarioPreset::new(
                    "Bull",
                    vec![
                        Override::shift(RevenueGrowthY1, dec!(0.05)),
                        Override::shift(RevenueGrowthY5, dec!(0.03)),
                        Override::shift(TargetEbitdaMargin, dec!(0.02)),
                        Override::shift(Wacc, dec!(-0.005)),
                        Override::set(TerminalGrowth, dec!(0.03)),
                    ],
                ),
            ],
        }
    }

    pub fn presets(&self) -> &[ScenarioPreset] {
        &self.presets
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        PresetTable::bear_base_bull()
    }
}

impl<'de> Deserialize<'de> for PresetTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let presets = Vec::<ScenarioPreset>::deserialize(deserializer)?;
        PresetTable::new(presets).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline once per preset, in table order.
///
/// A preset whose merged assumptions are invalid yields a case carrying the
/// error instead of aborting the other scenarios.
pub fn analyze_scenarios(base: &AssumptionSet, table: &PresetTable) -> ScenarioResult {
    let base_value_per_share = compute_dcf(base)
        .ok()
        .map(|out| out.valuation.value_per_share);

    let cases = evaluate_cases(table.presets(), |preset| run_case(base, preset));
    let summary = cases
        .iter()
        .map(|case| summarize(case, base_value_per_share))
        .collect();

    ScenarioResult { cases, summary }
}

/// Run scenario analysis with metadata and warnings.
pub fn run_scenarios(
    base: &AssumptionSet,
    table: &PresetTable,
) -> DcfResult<ComputationOutput<ScenarioResult>> {
    let start = Instant::now();
    base.validate()?;

    let result = analyze_scenarios(base, table);
    let warnings = scenario_warnings(&result);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bear/Base/Bull DCF Scenario Analysis",
        &serde_json::json!({
            "base": base,
            "presets": table,
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn run_case(base: &AssumptionSet, preset: &ScenarioPreset) -> ScenarioCase {
    let assumptions = preset.apply(base);
    debug!(scenario = %preset.name, wacc = %assumptions.wacc, "running scenario");

    match compute_dcf(&assumptions) {
        Ok(out) => ScenarioCase {
            name: preset.name.clone(),
            assumptions,
            projection: Some(out.projection),
            valuation: Some(out.valuation),
            error: None,
        },
        Err(e) => {
            warn!(scenario = %preset.name, error = %e, "scenario failed");
            ScenarioCase {
                name: preset.name.clone(),
                assumptions,
                projection: None,
                valuation: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(feature = "parallel")]
fn evaluate_cases<F>(presets: &[ScenarioPreset], eval_fn: F) -> Vec<ScenarioCase>
where
    F: Fn(&ScenarioPreset) -> ScenarioCase + Sync + Send,
{
    use rayon::prelude::*;

    presets.par_iter().map(eval_fn).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_cases<F>(presets: &[ScenarioPreset], eval_fn: F) -> Vec<ScenarioCase>
where
    F: Fn(&ScenarioPreset) -> ScenarioCase,
{
    presets.iter().map(eval_fn).collect()
}

fn summarize(case: &ScenarioCase, base_value_per_share: Option<Money>) -> ScenarioSummary {
    let value_per_share = case.valuation.as_ref().map(|v| v.value_per_share);
    let deviation_from_base = value_per_share
        .zip(base_value_per_share)
        .and_then(|(v, b)| v.checked_sub(b));
    let deviation_pct = deviation_from_base
        .zip(base_value_per_share)
        .and_then(|(d, b)| d.checked_div(b));

    ScenarioSummary {
        name: case.name.clone(),
        value_per_share,
        enterprise_value: case.valuation.as_ref().map(|v| v.enterprise_value),
        upside: case.valuation.as_ref().and_then(|v| v.upside),
        deviation_from_base,
        deviation_pct,
    }
}

fn scenario_warnings(result: &ScenarioResult) -> Vec<String> {
    let mut warnings: Vec<String> = result
        .cases
        .iter()
        .filter_map(|c| {
            c.error
                .as_ref()
                .map(|e| format!("Scenario '{}' failed: {e}", c.name))
        })
        .collect();

    // Presets are expected from most pessimistic to most optimistic
    let valued: Vec<&ScenarioSummary> = result
        .summary
        .iter()
        .filter(|s| s.value_per_share.is_some())
        .collect();
    for pair in valued.windows(2) {
        if pair[0].value_per_share > pair[1].value_per_share {
            warnings.push(format!(
                "Scenario '{}' values above '{}'; review preset magnitudes for this base case",
                pair[0].name, pair[1].name
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_assumptions() -> AssumptionSet {
        AssumptionSet {
            company_name: "Sample Co".into(),
            base_revenue: dec!(1000),
            current_price: Some(dec!(100)),
            shares_outstanding: dec!(100),
            net_debt: dec!(200),
            revenue_growth_y1: dec!(0.15),
            revenue_growth_y5: dec!(0.08),
            terminal_growth: dec!(0.025),
            base_ebitda_margin: dec!(0.20),
            target_ebitda_margin: dec!(0.25),
            da_pct_revenue: dec!(0.03),
            tax_rate: dec!(0.21),
            capex_pct_revenue: dec!(0.04),
            nwc_pct_incremental_revenue: dec!(0.02),
            wacc: dec!(0.10),
        }
    }

    fn vps(result: &ScenarioResult, name: &str) -> Money {
        result
            .get(name)
            .and_then(|c| c.valuation.as_ref())
            .map(|v| v.value_per_share)
            .unwrap()
    }

    #[test]
    fn test_bear_preset_merges_onto_base() {
        let table = PresetTable::default();
        let bear = table.presets()[0].apply(&sample_assumptions());

        assert_eq!(bear.revenue_growth_y1, dec!(0.10));
        assert_eq!(bear.revenue_growth_y5, dec!(0.05));
        assert_eq!(bear.target_ebitda_margin, dec!(0.23));
        assert_eq!(bear.wacc, dec!(0.11));
        assert_eq!(bear.terminal_growth, dec!(0.015));
        // Inherited
        assert_eq!(bear.base_revenue, dec!(1000));
        assert_eq!(bear.net_debt, dec!(200));
    }

    #[test]
    fn test_bull_preset_merges_onto_base() {
        let table = PresetTable::default();
        let bull = table.presets()[2].apply(&sample_assumptions());

        assert_eq!(bull.revenue_growth_y1, dec!(0.20));
        assert_eq!(bull.revenue_growth_y5, dec!(0.11));
        assert_eq!(bull.target_ebitda_margin, dec!(0.27));
        assert_eq!(bull.wacc, dec!(0.095));
        assert_eq!(bull.terminal_growth, dec!(0.03));
    }

    #[test]
    fn test_base_preset_is_identity() {
        let base = sample_assumptions();
        assert_eq!(PresetTable::default().presets()[1].apply(&base), base);
    }

    #[test]
    fn test_scenario_order_and_direction() {
        let result = analyze_scenarios(&sample_assumptions(), &PresetTable::default());

        let names: Vec<&str> = result.cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bear", "Base", "Bull"]);

        let bear = vps(&result, "Bear");
        let base = vps(&result, "Base");
        let bull = vps(&result, "Bull");
        assert!(bear <= base && base <= bull, "{bear} <= {base} <= {bull}");
    }

    #[test]
    fn test_base_case_matches_standalone_pipeline() {
        let base = sample_assumptions();
        let standalone = compute_dcf(&base).unwrap();
        let result = analyze_scenarios(&base, &PresetTable::default());
        let case = result.get("Base").unwrap();

        assert_eq!(case.projection.as_ref(), Some(&standalone.projection));
        assert_eq!(case.valuation.as_ref(), Some(&standalone.valuation));
        assert_eq!(result.summary[1].deviation_from_base, Some(Decimal::ZERO));
    }

    #[test]
    fn test_failed_scenario_does_not_abort_others() {
        // Low base WACC: Bull's -0.5pp pushes it under its own 3% terminal rate
        let base = AssumptionSet {
            wacc: dec!(0.028),
            terminal_growth: dec!(0.02),
            ..sample_assumptions()
        };
        let result = analyze_scenarios(&base, &PresetTable::default());

        // Bull: WACC 2.3% vs terminal 3.0% -> invalid
        let bull = result.get("Bull").unwrap();
        assert!(bull.valuation.is_none());
        assert!(bull.error.as_ref().unwrap().contains("Invalid discount rate"));

        assert!(result.get("Bear").unwrap().valuation.is_some());
        assert!(result.get("Base").unwrap().valuation.is_some());
        assert!(result.summary[2].value_per_share.is_none());
    }

    #[test]
    fn test_overflowing_scenario_carries_error() {
        let table = PresetTable::new(vec![
            ScenarioPreset::new("Base", vec![]),
            ScenarioPreset::new(
                "Knife edge",
                vec![Override::set(
                    AssumptionField::TerminalGrowth,
                    dec!(0.0999999999999999999999999999),
                )],
            ),
        ])
        .unwrap();
        let result = analyze_scenarios(&sample_assumptions(), &table);

        let edge = result.get("Knife edge").unwrap();
        assert!(edge.valuation.is_none());
        assert!(edge.error.as_ref().unwrap().contains("overflows"));
        assert!(result.get("Base").unwrap().valuation.is_some());
        assert!(result.summary[1].deviation_from_base.is_none());
    }

    #[test]
    fn test_preset_table_validation() {
        assert!(PresetTable::new(vec![]).is_err());
        assert!(PresetTable::new(vec![
            ScenarioPreset::new("Base", vec![]),
            ScenarioPreset::new("Base", vec![]),
        ])
        .is_err());
        assert!(PresetTable::new(vec![ScenarioPreset::new(
            "Twice",
            vec![
                Override::shift(AssumptionField::Wacc, dec!(0.01)),
                Override::set(AssumptionField::Wacc, dec!(0.09)),
            ],
        )])
        .is_err());
    }

    #[test]
    fn test_custom_presets_from_json() {
        let json = serde_json::json!([
            { "name": "Downside", "overrides": [
                { "field": "wacc", "adjustment": { "shift": "0.02" } }
            ]},
            { "name": "Base" },
            { "name": "Recovery", "overrides": [
                { "field": "revenue_growth_y1", "adjustment": { "set": "0.30" } }
            ]}
        ]);
        let table: PresetTable = serde_json::from_value(json).unwrap();
        assert_eq!(table.presets().len(), 3);

        let result = analyze_scenarios(&sample_assumptions(), &table);
        assert_eq!(result.get("Downside").unwrap().assumptions.wacc, dec!(0.12));
        assert_eq!(
            result.get("Recovery").unwrap().assumptions.revenue_growth_y1,
            dec!(0.30)
        );
    }

    #[test]
    fn test_duplicate_names_rejected_on_deserialize() {
        let json = serde_json::json!([{ "name": "A" }, { "name": "A" }]);
        assert!(serde_json::from_value::<PresetTable>(json).is_err());
    }

    #[test]
    fn test_run_scenarios_envelope() {
        let out = run_scenarios(&sample_assumptions(), &PresetTable::default()).unwrap();
        assert_eq!(out.methodology, "Bear/Base/Bull DCF Scenario Analysis");
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.result.summary.len(), 3);
        assert!(out.result.summary[0].deviation_pct.unwrap() < Decimal::ZERO);
        assert!(out.result.summary[2].deviation_pct.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_run_scenarios_rejects_invalid_base() {
        let base = AssumptionSet {
            shares_outstanding: dec!(-1),
            ..sample_assumptions()
        };
        assert!(matches!(
            run_scenarios(&base, &PresetTable::default()),
            Err(DcfError::InvalidShareCount { .. })
        ));
    }

    #[test]
    fn test_scenarios_are_deterministic() {
        let a = analyze_scenarios(&sample_assumptions(), &PresetTable::default());
        let b = analyze_scenarios(&sample_assumptions(), &PresetTable::default());
        assert_eq!(a, b);
    }
}
