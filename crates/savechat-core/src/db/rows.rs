//! Column decoding and value encoding helpers for libSQL rows.

use chrono::{DateTime, Utc};
use libsql::{Row, Value};

use crate::error::{Error, Result};
use crate::util::datetime_from_millis;

pub fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(unexpected(idx, "text", &other)),
    }
}

pub fn opt_integer(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(unexpected(idx, "integer", &other)),
    }
}

pub fn flag(row: &Row, idx: i32) -> Result<bool> {
    Ok(row.get::<i64>(idx)? != 0)
}

pub fn timestamp(row: &Row, idx: i32) -> Result<DateTime<Utc>> {
    datetime_from_millis(row.get::<i64>(idx)?)
}

/// Decode a JSON text column (tag arrays, settings maps).
pub fn json<T: serde::de::DeserializeOwned>(row: &Row, idx: i32) -> Result<T> {
    let text = row.get::<String>(idx)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn text_value(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn opt_text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text_value)
}

pub fn opt_integer_value(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub fn flag_value(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

pub fn timestamp_value(value: DateTime<Utc>) -> Value {
    Value::Integer(value.timestamp_millis())
}

pub fn json_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(Value::Text(serde_json::to_string(value)?))
}

fn unexpected(idx: i32, expected: &str, got: &Value) -> Error {
    Error::Database(format!("Column {idx}: expected {expected} or NULL, got {got:?}"))
}
