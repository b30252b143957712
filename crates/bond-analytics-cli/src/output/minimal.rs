use serde_json::Value;

use super::plain_value;

/// Key figure searched for in an object result, nested objects included.
const PRIORITY_KEYS: [&str; 3] = ["price", "price_at_shift", "present_value"];

/// Print just the key answer from the output.
///
/// Object results print the bond price; array results print one line per
/// row pairing its label (date or shifted yield) with its key figure.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(rows) => {
            for row in rows {
                let label = row
                    .get("payment_date")
                    .or_else(|| row.get("shifted_yield"))
                    .map(plain_value)
                    .unwrap_or_default();
                match find_key_figure(row) {
                    Some(v) => println!("{}\t{}", label, plain_value(v)),
                    None => println!("{}", plain_value(row)),
                }
            }
        }
        other => match find_key_figure(other) {
            Some(v) => println!("{}", plain_value(v)),
            None => println!("{}", plain_value(other)),
        },
    }
}

fn find_key_figure(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    PRIORITY_KEYS
        .iter()
        .find_map(|k| map.get(*k).filter(|v| !v.is_null()))
        .or_else(|| map.get("valuation").and_then(find_key_figure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_figure_in_nested_valuation() {
        let analysis = json!({ "valuation": { "price": "98.5" }, "cash_flows": [] });
        assert_eq!(find_key_figure(&analysis), Some(&json!("98.5")));
    }

    #[test]
    fn test_key_figure_for_curve_point() {
        let point = json!({ "shifted_yield": "0.07", "price_at_shift": "93.1" });
        assert_eq!(find_key_figure(&point), Some(&json!("93.1")));
    }
}
