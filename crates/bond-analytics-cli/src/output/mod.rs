pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pretty-print JSON to stdout.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// Render a leaf value as plain text (strings unquoted).
pub(crate) fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(plain_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Scalar fields of a result object, nested objects flattened as `parent.child`.
/// Arrays of objects (schedules, curves) are returned separately as sections.
pub(crate) fn split_result<'a>(
    map: &'a serde_json::Map<String, Value>,
) -> (Vec<(String, &'a Value)>, Vec<(String, &'a [Value])>) {
    let mut fields = Vec::new();
    let mut sections = Vec::new();
    collect(String::new(), map, &mut fields, &mut sections);
    (fields, sections)
}

fn collect<'a>(
    prefix: String,
    map: &'a serde_json::Map<String, Value>,
    fields: &mut Vec<(String, &'a Value)>,
    sections: &mut Vec<(String, &'a [Value])>,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => collect(name, inner, fields, sections),
            Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => {
                sections.push((name, rows.as_slice()))
            }
            _ => fields.push((name, val)),
        }
    }
}
