use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{format_cell, primary_series};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result(result, map),
            None => {
                // Several envelopes side by side (the reference command).
                for (name, section) in map {
                    println!("== {name} ==");
                    print_table(section);
                    println!();
                }
            }
        },
        _ => println!("{}", format_cell(value)),
    }
}

fn print_result(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Some(rows) = primary_series(result) {
        println!("{}", rows_table(rows));
    }

    let scope = result.get("summary").unwrap_or(result);
    if let Value::Object(map) = scope {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map.iter().filter(|(_, v)| !v.is_array()) {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn rows_table(rows: &[Value]) -> String {
    let Some(Value::Object(first)) = rows.first() else {
        return "(empty)".to_string();
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    Table::from(builder).to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}={}", format_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        _ => format_cell(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_table_contains_headers_and_values() {
        let rows = vec![json!({"year": 0, "present_value": "-5"})];
        let rendered = rows_table(&rows);
        assert!(rendered.contains("present_value"));
        assert!(rendered.contains("year"));
        assert!(rendered.contains("-5"));
    }

    #[test]
    fn test_rows_table_empty() {
        assert_eq!(rows_table(&[]), "(empty)");
    }

    #[test]
    fn test_nested_object_flattened() {
        let v = json!({"p5": 0.0, "p95": 31.5});
        assert_eq!(format_value(&v), "p5=0.0, p95=31.5");
    }
}
