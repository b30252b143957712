use serde_json::Value;
use std::io;

use super::{plain_value, split_result};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Array results become one row per element. Object results become
/// `field,value` pairs, followed by one block per nested table, each
/// introduced by a single-column record naming it.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            let (fields, sections) = split_result(map);
            let _ = wtr.write_record(["field", "value"]);
            for (name, val) in fields {
                let _ = wtr.write_record([name, plain_value(val)]);
            }
            for (name, rows) in sections {
                let _ = wtr.write_record([""]);
                let _ = wtr.write_record([name.as_str()]);
                write_array_csv(&mut wtr, rows);
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([plain_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([plain_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(*h).map(plain_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}
