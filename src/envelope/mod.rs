//! Response envelope handling and per-concept normalization.
//!
//! WB wraps some payloads in `{"data": ...}` and has renamed fields across
//! API revisions. Everything here turns those shapes into one canonical
//! value before it leaves the client.

use crate::errors::{WbError, WbResult};
use crate::types::{Balance, Row};
use serde_json::{Map, Value};

/// Container keys that hold the item list of a paged analytics response,
/// in lookup order.
pub const ITEM_KEYS: &[&str] = &[
    "cards",
    "cardAnaliticsData",
    "analyticsData",
    "items",
    "rows",
    "list",
];

/// Keys that may carry a report job id.
pub const TASK_ID_KEYS: &[&str] = &["taskId", "task_id", "uuid", "id"];

const CURRENT_KEYS: &[&str] = &["current", "currentBalance", "balance", "total"];
const FOR_WITHDRAW_KEYS: &[&str] = &["for_withdraw", "forWithdraw", "available", "forWithdrawPresent"];

/// Removes one `{"data": ...}` wrapper.
///
/// Only a `data` holding an object or an array counts as an envelope.
/// Never recurses.
pub fn unwrap_envelope(raw: Value) -> Value {
    match raw {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_) | Value::Array(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn first_present<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| map.get(*name))
        .find(|value| !value.is_null())
}

fn as_number(field: &str, value: &Value) -> WbResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        WbError::malformed(format!(
            "balance field {} is not numeric: {}",
            field, value
        ))
    })
}

/// Converts any known balance shape into a [`Balance`].
pub fn normalize_balance(raw: &Value) -> WbResult<Balance> {
    let map = match raw {
        Value::Object(map) => map,
        other => {
            return Err(WbError::malformed(format!(
                "unrecognized balance payload: expected an object, got {}",
                json_type_name(other)
            )))
        }
    };

    let currency = first_present(map, &["currency"]);
    let current = first_present(map, CURRENT_KEYS);
    let for_withdraw = first_present(map, FOR_WITHDRAW_KEYS);

    let (currency, current, for_withdraw) = match (currency, current, for_withdraw) {
        (Some(c), Some(cur), Some(fw)) => (c, cur, fw),
        _ => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
            keys.sort_unstable();
            let present = if keys.is_empty() {
                "(none)".to_string()
            } else {
                keys.join(", ")
            };
            return Err(WbError::malformed(format!(
                "unrecognized balance payload: expected currency/current/for_withdraw, got keys: {}",
                present
            )));
        }
    };

    let currency = match currency {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok(Balance::new(
        currency,
        as_number("current", current)?,
        as_number("for_withdraw", for_withdraw)?,
    ))
}

/// Extracts the item list of a paged response.
///
/// A bare array is the list itself; otherwise the first [`ITEM_KEYS`] entry
/// holding an array wins. Anything else has no items.
pub fn extract_items(payload: &Value) -> Vec<Value> {
    extract_items_with(payload, ITEM_KEYS)
}

/// [`extract_items`] with a caller-chosen key order.
pub fn extract_items_with(payload: &Value, keys: &[&str]) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Converts items into rows, dropping anything that is not an object.
pub fn into_rows(items: Vec<Value>) -> Vec<Row> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

/// Rows of a report payload found under `keys`, or under [`ITEM_KEYS`] when
/// none of them match.
pub fn extract_rows(payload: &Value, keys: &[&str]) -> Vec<Row> {
    let items = extract_items_with(payload, keys);
    if items.is_empty() && !keys.is_empty() {
        return into_rows(extract_items(payload));
    }
    into_rows(items)
}

/// Finds a report job id in a create response.
///
/// Looks at the top level first, then one level into `data`. Numeric ids
/// are rendered as strings.
pub fn extract_task_id(payload: &Value) -> Option<String> {
    let map = payload.as_object()?;
    find_task_id(map).or_else(|| {
        map.get("data")
            .and_then(Value::as_object)
            .and_then(find_task_id)
    })
}

fn find_task_id(map: &Map<String, Value>) -> Option<String> {
    TASK_ID_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Finds a job status string, lower-cased.
pub fn extract_status(payload: &Value) -> Option<String> {
    let map = payload.as_object()?;
    let status = map.get("status").or_else(|| {
        map.get("data")
            .and_then(Value::as_object)
            .and_then(|inner| inner.get("status"))
    })?;
    status.as_str().map(|s| s.trim().to_lowercase())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
