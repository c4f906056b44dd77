use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML file (chosen by extension) into a typed struct.
pub fn read_config<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_config(&canonical, &contents)
}

fn parse_config<T: DeserializeOwned>(
    path: &Path,
    contents: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value = if is_yaml {
        serde_yaml::from_str(contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?
    } else {
        serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?
    };
    Ok(value)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use equity_dcf_core::AssumptionSet;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_reads_yaml_assumptions() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "company_name: Acme\nbase_revenue: 500\nshares_outstanding: 50\n\
             revenue_growth_y1: 0.12\nrevenue_growth_y5: 0.06\nterminal_growth: 0.02\n\
             base_ebitda_margin: 0.18\ntarget_ebitda_margin: 0.22\nda_pct_revenue: 0.03\n\
             tax_rate: 0.21\ncapex_pct_revenue: 0.04\nnwc_pct_incremental_revenue: 0.02\nwacc: 0.09"
        )
        .unwrap();

        let set: AssumptionSet = read_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(set.company_name, "Acme");
        assert_eq!(set.wacc, dec!(0.09));
    }

    #[test]
    fn test_reads_json_assumptions() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let json = serde_json::to_string(&AssumptionSet::default()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let set: AssumptionSet = read_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(set, AssumptionSet::default());
    }

    #[test]
    fn test_missing_file() {
        let result: Result<AssumptionSet, _> = read_config("/definitely/not/here.json");
        assert!(result.unwrap_err().to_string().contains("File not found"));
    }
}
