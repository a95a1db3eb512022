use serde_json::Value;
use std::io;

use super::{format_cell, primary_series};

/// Write output as CSV to stdout.
///
/// Results carrying a row series (cash flow records, simulated samples) are
/// written one row per element; anything else becomes `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let written = if let Some(rows) = primary_series(result) {
        write_rows(&mut wtr, rows)
    } else if let Value::Object(map) = result {
        write_pairs(&mut wtr, map)
    } else {
        wtr.write_record([format_cell(result)])
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        tracing::error!("failed to write CSV output: {e}");
    }
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            wtr.write_record([format_cell(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_cell).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

fn write_pairs<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    map: &serde_json::Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_cell(val)])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(f: impl FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        f(&mut wtr).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_rows_use_first_object_keys() {
        let rows = vec![
            json!({"raw_value": 0.0, "discounted_value": 0.0}),
            json!({"raw_value": 80.5, "discounted_value": 9.5}),
        ];
        let out = render(|w| write_rows(w, &rows));
        assert_eq!(out, "discounted_value,raw_value\n0.0,0.0\n9.5,80.5\n");
    }

    #[test]
    fn test_pairs() {
        let map = json!({"net_present_value": "12.5"});
        let out = render(|w| write_pairs(w, map.as_object().unwrap()));
        assert_eq!(out, "field,value\nnet_present_value,12.5\n");
    }
}
