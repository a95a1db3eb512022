pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Per-row series a command produces, in lookup order.
const SERIES_KEYS: [&str; 2] = ["records", "samples"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The row series inside a result envelope (cash flow records or simulated
/// samples), if the result carries one.
pub(crate) fn primary_series(result: &Value) -> Option<&Vec<Value>> {
    let map = result.as_object()?;
    SERIES_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
}

/// Render a scalar for a single table or CSV cell.
pub(crate) fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_series_prefers_records() {
        let v = json!({"records": [{"year": 0}], "samples": [{"raw_value": 1.0}]});
        assert_eq!(primary_series(&v).map(Vec::len), Some(1));
        assert_eq!(primary_series(&v).unwrap()[0]["year"], json!(0));
    }

    #[test]
    fn test_primary_series_absent() {
        assert!(primary_series(&json!({"summary": {}})).is_none());
        assert!(primary_series(&json!(3)).is_none());
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&json!("0.25")), "0.25");
        assert_eq!(format_cell(&json!(null)), "");
        assert_eq!(format_cell(&json!([1, 2])), "[1,2]");
    }
}
