use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{plain_value, split_result};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => {
                print_result(result);
                print_envelope_notes(map);
            }
            None => print_object(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Array(rows) => print_array_table(rows),
        Value::Object(map) => {
            print_object(map);
            let (_, sections) = split_result(map);
            for (name, rows) in sections {
                println!("\n{}:", title(&name));
                print_array_table(rows);
            }
        }
        other => println!("{}", plain_value(other)),
    }
}

/// Field/Value table of every scalar in the object.
fn print_object(map: &serde_json::Map<String, Value>) {
    let (fields, _) = split_result(map);
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (name, val) in fields {
        builder.push_record([name, plain_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| item.get(h).map(plain_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", plain_value(item));
        }
    }
}

/// `cash_flows` -> `Cash Flows`
fn title(name: &str) -> String {
    name.split(['_', '.'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_title() {
        assert_eq!(title("cash_flows"), "Cash Flows");
        assert_eq!(title("sensitivity"), "Sensitivity");
    }
}
