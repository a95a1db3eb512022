use serde_json::Value;

use super::format_cell;

/// Key answer fields, in order of priority.
const PRIORITY_KEYS: [&str; 3] = ["net_present_value", "expected_value", "failure_rate"];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields (descending into a `summary` object),
/// then falls back to the first scalar field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let scope = result.get("summary").unwrap_or(result);

    let Value::Object(map) = scope else {
        return format_cell(scope);
    };

    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return format_cell(val);
        }
    }

    map.iter()
        .find(|(_, v)| !v.is_array() && !v.is_object())
        .map(|(key, val)| format!("{key}: {}", format_cell(val)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_prints_npv() {
        let v = json!({"result": {"records": [], "net_present_value": "28.38"}});
        assert_eq!(minimal_line(&v), "28.38");
    }

    #[test]
    fn test_simulation_prints_expected_value() {
        let v = json!({"result": {"samples": [], "summary": {"survivor_mean": 12.1, "expected_value": 7.3}}});
        assert_eq!(minimal_line(&v), "7.3");
    }

    #[test]
    fn test_fallback_skips_collections() {
        let v = json!({"result": {"a": [1], "b": 2}});
        assert_eq!(minimal_line(&v), "b: 2");
    }
}
