pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar JSON value as a plain cell.
pub(crate) fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Column headers across a list of row objects, in first-seen order.
/// Rows may carry different keys (e.g. valued vs. failed sensitivity points).
pub(crate) fn union_headers(rows: &[Value]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_union_headers_merges_row_shapes() {
        let rows = vec![
            json!({"status": "valued", "value": "0.08", "value_per_share": "12.5"}),
            json!({"reason": "bad", "status": "failed", "value": "0.02"}),
        ];
        assert_eq!(
            union_headers(&rows),
            vec!["status", "value", "value_per_share", "reason"]
        );
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&json!("1.5")), "1.5");
        assert_eq!(format_cell(&Value::Null), "");
        assert_eq!(format_cell(&json!(3)), "3");
    }
}
