// src/calendar/providers/ff_json.rs
use serde_json::{Map, Value};

use crate::calendar::types::RawEvent;
use crate::error::{FetchError, FetchResult};

/// Top level must be an array of objects; anything else is rejected whole.
pub fn parse(body: &str) -> FetchResult<Vec<RawEvent>> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::BadFormat(format!("invalid json: {e}")))?;
    let items = match v {
        Value::Array(items) => items,
        other => {
            return Err(FetchError::BadFormat(format!(
                "expected a json array of events, got {}",
                kind_of(&other)
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(obj) => Ok(to_raw(obj)),
            other => Err(FetchError::BadFormat(format!(
                "item {idx} is {}, expected an object",
                kind_of(other)
            ))),
        })
        .collect()
}

fn to_raw(obj: &Map<String, Value>) -> RawEvent {
    RawEvent {
        impact: field(obj, &["impact", "importance"]),
        currency: field(obj, &["country", "currency"]),
        date: field(obj, &["date", "datetime"]),
        time: field(obj, &["time"]),
        title: field(obj, &["title", "event"]),
    }
}

/// First present key wins; numbers are kept as their textual form.
fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
