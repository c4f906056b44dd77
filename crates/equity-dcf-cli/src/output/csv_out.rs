use serde_json::Value;
use std::io;

use super::{format_cell, union_headers};

/// Write output as CSV to stdout.
///
/// Picks the row-shaped part of the result: projection rows for a
/// valuation, points for a sensitivity sweep, the summary for scenarios.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let written = write_result(&mut wtr, result).and_then(|_| wtr.flush().map_err(csv::Error::from));
    if let Err(e) = written {
        eprintln!("CSV output error: {}", e);
    }
}

fn write_result<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Value) -> csv::Result<()> {
    match result {
        Value::Object(map) => {
            for key in ["projection", "points", "summary"] {
                if let Some(Value::Array(rows)) = map.get(key) {
                    return write_array_csv(wtr, rows, None);
                }
            }
            wtr.write_record(["field", "value"])?;
            for (key, val) in map {
                wtr.write_record([key.as_str(), format_cell(val).as_str()])?;
            }
            Ok(())
        }
        // Batch sensitivity: one block of points per variable, tagged
        Value::Array(results) => {
            let rows: Vec<Value> = results
                .iter()
                .flat_map(|r| {
                    let variable = r.get("variable").cloned().unwrap_or(Value::Null);
                    r.get("points")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .map(move |mut p| {
                            if let Value::Object(ref mut m) = p {
                                m.insert("variable".into(), variable.clone());
                            }
                            p
                        })
                })
                .collect();
            write_array_csv(wtr, &rows, Some("variable"))
        }
        _ => wtr.write_record([&format_cell(result)]),
    }
}

fn write_array_csv<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    rows: &[Value],
    lead: Option<&str>,
) -> csv::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut headers = union_headers(rows);
    if let Some(lead) = lead {
        if let Some(pos) = headers.iter().position(|h| h == lead) {
            let h = headers.remove(pos);
            headers.insert(0, h);
        }
    }
    wtr.write_record(&headers)?;

    for item in rows {
        let row: Vec<String> = headers
            .iter()
            .map(|h| item.get(h.as_str()).map(format_cell).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}
