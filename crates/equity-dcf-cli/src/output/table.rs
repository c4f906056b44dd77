use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_cell, union_headers};

/// Keys whose content is already covered by a sibling summary table.
const SKIPPED_SECTIONS: [&str; 1] = ["cases"];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_section(None, result);
                print_envelope_notes(map);
            } else {
                print_section(None, value);
            }
        }
        _ => print_section(None, value),
    }
}

/// Print an object as a Field/Value table, then each nested object or
/// list of rows as its own titled table.
fn print_section(title: Option<&str>, value: &Value) {
    match value {
        Value::Object(map) => {
            let scalars: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(_, v)| !is_nested(v))
                .collect();
            if !scalars.is_empty() {
                print_title(title);
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in scalars {
                    builder.push_record([key.as_str(), format_value(val).as_str()]);
                }
                println!("{}", Table::from(builder));
            }
            for (key, val) in map.iter().filter(|(_, v)| is_nested(v)) {
                if SKIPPED_SECTIONS.contains(&key.as_str()) {
                    continue;
                }
                print_section(Some(key), val);
            }
        }
        Value::Array(arr) if arr.iter().all(Value::is_object) && !arr.is_empty() => {
            print_title(title);
            print_array_table(arr);
        }
        Value::Array(arr) => {
            print_title(title);
            let items: Vec<String> = arr.iter().map(format_value).collect();
            println!("{}", items.join(", "));
        }
        _ => {
            print_title(title);
            println!("{}", format_value(value));
        }
    }
}

fn print_title(title: Option<&str>) {
    if let Some(t) = title {
        println!("\n{}:", t);
    }
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(arr) => arr.iter().any(|v| v.is_object()),
        _ => false,
    }
}

fn print_array_table(arr: &[Value]) {
    let headers = union_headers(arr);
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }

    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        _ => format_cell(value),
    }
}
