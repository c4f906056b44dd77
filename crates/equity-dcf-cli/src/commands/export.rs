use clap::Args;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use equity_dcf_core::types::LineItem;
use equity_dcf_core::valuation::dcf::{self, DcfOutput};
use equity_dcf_core::AssumptionSet;

use super::valuation::{load_assumptions, AssumptionArgs};

/// Arguments for CSV export
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Directory to write assumptions.csv, projections.csv and valuation.csv into
    #[arg(long, default_value = ".")]
    pub dir: String,
}

pub fn run_export(args: ExportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = load_assumptions(&args.assumptions)?;
    let result = dcf::run_dcf(&assumptions)?;

    let dir = Path::new(&args.dir);
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;
    let files = write_sheets(dir, &assumptions, &result.result)?;

    Ok(serde_json::json!({
        "directory": dir.display().to_string(),
        "files": files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
        "warnings": result.warnings,
    }))
}

/// Write one CSV per sheet: Assumptions, Projections, Valuation.
fn write_sheets(
    dir: &Path,
    assumptions: &AssumptionSet,
    output: &DcfOutput,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let assumptions_path = dir.join("assumptions.csv");
    let mut wtr = csv::Writer::from_path(&assumptions_path)?;
    wtr.write_record(["label", "value"])?;
    wtr.write_record(["company_name", assumptions.company_name.as_str()])?;
    write_line_items(&mut wtr, &assumptions.line_items())?;
    wtr.flush()?;

    let projections_path = dir.join("projections.csv");
    let mut wtr = csv::Writer::from_path(&projections_path)?;
    for row in output.projection.rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    let valuation_path = dir.join("valuation.csv");
    let mut wtr = csv::Writer::from_path(&valuation_path)?;
    wtr.write_record(["label", "value"])?;
    write_line_items(&mut wtr, &output.valuation.line_items())?;
    wtr.flush()?;

    Ok(vec![assumptions_path, projections_path, valuation_path])
}

fn write_line_items<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    items: &[LineItem],
) -> Result<(), Box<dyn std::error::Error>> {
    for item in items {
        let value = item.value.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([item.label.as_str(), value.as_str()])?;
    }
    Ok(())
}
