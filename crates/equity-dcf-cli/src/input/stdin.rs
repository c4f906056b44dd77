use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Read an assumption document piped on stdin.
/// Returns None when stdin is a TTY or the pipe is empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

/// JSON first; anything that is not JSON is retried as YAML.
fn parse_piped<T: DeserializeOwned>(buffer: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => serde_yaml::from_str(trimmed)
            .map(Some)
            .map_err(|_| format!("Failed to parse stdin: {}", json_err).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equity_dcf_core::AssumptionSet;
    use rust_decimal_macros::dec;

    #[test]
    fn test_blank_pipe_is_none() {
        let parsed: Option<AssumptionSet> = parse_piped("  \n").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_json_then_yaml() {
        let json = serde_json::to_string(&AssumptionSet::default()).unwrap();
        let parsed: Option<AssumptionSet> = parse_piped(&json).unwrap();
        assert_eq!(parsed, Some(AssumptionSet::default()));

        let yaml = serde_yaml::to_string(&AssumptionSet {
            wacc: dec!(0.085),
            ..AssumptionSet::default()
        })
        .unwrap();
        let parsed: Option<AssumptionSet> = parse_piped(&yaml).unwrap();
        assert_eq!(parsed.unwrap().wacc, dec!(0.085));
    }

    #[test]
    fn test_garbage_reports_json_error() {
        let err = parse_piped::<AssumptionSet>("{not valid").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse stdin"));
    }
}
