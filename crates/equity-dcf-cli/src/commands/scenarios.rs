use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use equity_dcf_core::scenarios::scenario::{self, PresetTable};
use equity_dcf_core::scenarios::sensitivity::{self, SensitivityInput, SensitivityRange};
use equity_dcf_core::{AssumptionField, AssumptionSet};

use super::valuation::{load_assumptions, AssumptionArgs};
use crate::input;

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Sweep in format name:min:max:step (e.g. "wacc:0.08:0.12:0.005");
    /// repeat to run several one-way sweeps against the same base case
    #[arg(long = "var", allow_hyphen_values = true)]
    pub vars: Vec<String>,

    /// Assumption to vary (with --values, --min/--max/--step or --spread/--step)
    #[arg(long)]
    pub variable: Option<AssumptionField>,

    /// Explicit comma-separated values for --variable
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub values: Vec<Decimal>,

    /// Lower bound of the sweep
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<Decimal>,

    /// Upper bound of the sweep
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<Decimal>,

    /// Step between sweep values
    #[arg(long)]
    pub step: Option<Decimal>,

    /// Sweep +/- this amount around the base value of --variable
    #[arg(long)]
    pub spread: Option<Decimal>,
}

/// Arguments for scenario analysis
#[derive(Args)]
pub struct ScenarioArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Path to JSON or YAML preset table (defaults to Bear/Base/Bull)
    #[arg(long)]
    pub presets: Option<String>,
}

fn parse_sens_var(spec: &str) -> Result<(AssumptionField, SensitivityRange), Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    Ok((
        parts[0].parse()?,
        SensitivityRange::Step {
            min: parts[1].parse()?,
            max: parts[2].parse()?,
            step: parts[3].parse()?,
        },
    ))
}

fn collect_sweeps(
    args: &SensitivityArgs,
    base: &AssumptionSet,
) -> Result<Vec<(AssumptionField, SensitivityRange)>, Box<dyn std::error::Error>> {
    let mut sweeps = args
        .vars
        .iter()
        .map(|spec| parse_sens_var(spec))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(variable) = args.variable {
        let range = if !args.values.is_empty() {
            SensitivityRange::Values(args.values.clone())
        } else if let (Some(spread), Some(step)) = (args.spread, args.step) {
            SensitivityRange::around(base.get(variable), spread, step)
        } else if let (Some(min), Some(max), Some(step)) = (args.min, args.max, args.step) {
            SensitivityRange::Step { min, max, step }
        } else {
            return Err(
                "--variable needs --values, --min/--max/--step, or --spread/--step".into(),
            );
        };
        sweeps.push((variable, range));
    }

    if sweeps.is_empty() {
        return Err("Provide --var name:min:max:step or --variable with a range".into());
    }
    Ok(sweeps)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base = load_assumptions(&args.assumptions)?;
    let mut sweeps = collect_sweeps(&args, &base)?;

    if sweeps.len() == 1 {
        let (variable, range) = sweeps.remove(0);
        let input = SensitivityInput {
            base,
            variable,
            range,
        };
        let result = sensitivity::run_sensitivity(&input)?;
        Ok(serde_json::to_value(result)?)
    } else {
        let result = sensitivity::run_sensitivity_batch(&base, &sweeps)?;
        Ok(serde_json::to_value(result)?)
    }
}

pub fn run_scenarios(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base = load_assumptions(&args.assumptions)?;
    let table: PresetTable = match args.presets {
        Some(ref path) => input::file::read_config(path)?,
        None => PresetTable::default(),
    };

    let result = scenario::run_scenarios(&base, &table)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal_macros::dec;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        sensitivity: SensitivityArgs,
    }

    #[test]
    fn test_parse_sens_var() {
        let (field, range) = parse_sens_var("wacc:0.08:0.12:0.01").unwrap();
        assert_eq!(field, AssumptionField::Wacc);
        assert_eq!(
            range,
            SensitivityRange::Step {
                min: dec!(0.08),
                max: dec!(0.12),
                step: dec!(0.01),
            }
        );
        assert!(parse_sens_var("wacc:0.08:0.12").is_err());
        assert!(parse_sens_var("beta:0:1:0.1").is_err());
    }

    #[test]
    fn test_spread_is_centred_on_base() {
        let cli = TestCli::parse_from([
            "dcf", "--variable", "wacc", "--spread", "0.01", "--step", "0.005",
        ]);
        let sweeps = collect_sweeps(&cli.sensitivity, &AssumptionSet::default()).unwrap();
        assert_eq!(
            sweeps[0].1.values().unwrap(),
            vec![dec!(0.09), dec!(0.095), dec!(0.10), dec!(0.105), dec!(0.11)]
        );
    }

    #[test]
    fn test_values_list_and_vars_combine() {
        let cli = TestCli::parse_from([
            "dcf",
            "--var",
            "terminal_growth:0.015:0.035:0.005",
            "--variable",
            "target_ebitda_margin",
            "--values",
            "0.22,0.25,0.28",
        ]);
        let sweeps = collect_sweeps(&cli.sensitivity, &AssumptionSet::default()).unwrap();
        assert_eq!(sweeps.len(), 2);
        assert_eq!(sweeps[0].0, AssumptionField::TerminalGrowth);
        assert_eq!(
            sweeps[1].1,
            SensitivityRange::Values(vec![dec!(0.22), dec!(0.25), dec!(0.28)])
        );
    }

    #[test]
    fn test_variable_without_range_rejected() {
        let cli = TestCli::parse_from(["dcf", "--variable", "wacc"]);
        assert!(collect_sweeps(&cli.sensitivity, &AssumptionSet::default()).is_err());
    }
}
