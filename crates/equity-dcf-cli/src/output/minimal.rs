use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Looks through the result (and its nested valuation) for well-known
/// fields in priority order, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match find_key_answer(result_obj) {
        Some(answer) => println!("{}", answer),
        None => println!("{}", super::format_cell(result_obj)),
    }
}

fn find_key_answer(result: &Value) -> Option<String> {
    let priority_keys = [
        "value_per_share",
        "base_value_per_share",
        "enterprise_value",
        "directory",
    ];

    let map = result.as_object()?;
    let valuation = map.get("valuation").and_then(Value::as_object);

    for key in &priority_keys {
        let hit = map
            .get(*key)
            .or_else(|| valuation.and_then(|v| v.get(*key)));
        if let Some(val) = hit {
            if !val.is_null() {
                return Some(super::format_cell(val));
            }
        }
    }

    // Scenario output: one line per scenario
    if let Some(Value::Array(summary)) = map.get("summary") {
        let lines: Vec<String> = summary
            .iter()
            .map(|s| {
                format!(
                    "{}: {}",
                    s.get("name").map(super::format_cell).unwrap_or_default(),
                    s.get("value_per_share")
                        .map(super::format_cell)
                        .unwrap_or_else(|| "n/a".into())
                )
            })
            .collect();
        return Some(lines.join("\n"));
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, super::format_cell(val)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_nested_value_per_share() {
        let result = json!({
            "growth_curve": ["0.1"],
            "valuation": {"enterprise_value": "900", "value_per_share": "7.25"}
        });
        assert_eq!(find_key_answer(&result).unwrap(), "7.25");
    }

    #[test]
    fn test_scenario_summary_lines() {
        let result = json!({
            "cases": [],
            "summary": [
                {"name": "Bear", "value_per_share": "80"},
                {"name": "Bull"}
            ]
        });
        assert_eq!(find_key_answer(&result).unwrap(), "Bear: 80\nBull: n/a");
    }
}
