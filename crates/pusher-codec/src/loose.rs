//! Loose field coercions.
//!
//! Each function accepts an enumerable set of wire shapes for one logical
//! field type and maps everything else to the zero value:
//!
//! | Target | Accepted | Anything else |
//! |---|---|---|
//! | integer | number, numeric string, float (truncated) | `0` |
//! | float | number, numeric string | `0.0` |
//! | integer list | array of loose integers | empty |
//! | integer map | object of loose integers | empty |
//! | id set | array of strings, numbers, other values stringified | empty |

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// Read an integer-like value, truncating floats toward zero.
pub fn int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(truncate))
            .unwrap_or(0),
        Value::String(s) => int_str(s),
        _ => 0,
    }
}

/// Read a float-like value.
pub fn float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn int_str(s: &str) -> i64 {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return v;
    }
    s.parse::<f64>().map(truncate).unwrap_or(0)
}

/// Truncate toward zero, saturating at the `i64` range. NaN becomes 0.
fn truncate(v: f64) -> i64 {
    v.trunc() as i64
}

/// Read an array of loose integers.
pub fn int_list(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(items) => items.iter().map(int).collect(),
        _ => Vec::new(),
    }
}

/// Read an object of loose integers.
pub fn int_map(value: &Value) -> BTreeMap<String, i64> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), int(v))).collect(),
        _ => BTreeMap::new(),
    }
}

/// Read a set of ids; numbers become their decimal form and any other
/// element its JSON text, so `null` reads as `"null"`.
pub fn id_set(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items.iter().map(id).collect(),
        _ => BTreeSet::new(),
    }
}

fn id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_id(n),
        other => other.to_string(),
    }
}

fn number_id(n: &serde_json::Number) -> String {
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    match n.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => (v as i64).to_string(),
        _ => n.to_string(),
    }
}
