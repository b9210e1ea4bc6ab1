//! Column value coercion
//!
//! Pure mapping from a column descriptor plus raw binlog value to a
//! sink-ready JSON value. `None` means the value is absent (raw NULL or one
//! of the zero-date sentinels) and callers decide whether that skips the
//! field or writes a clear marker.
//!
//! The matrix exists because the same column surfaces differently depending
//! on origin: ENUM and SET are integers in the binlog but strings in a dump,
//! BIT is a one-byte string in a dump, textual types arrive as raw bytes.

use serde_json::Value;
use tracing::warn;

use crate::schema::{ColumnType, RawValue, TableColumn};

/// Zero/epoch timestamps MySQL emits for "no value" datetime columns.
const DATETIME_SENTINELS: [&str; 3] = [
    "0000-00-00 00:00:00",
    "1970-01-01 00:00:00",
    "1970-01-01 01:00:00",
];

const DATE_SENTINEL: &str = "0000-00-00";

/// Coerce one raw column value into its sink representation.
pub fn coerce_column(col: &TableColumn, value: &RawValue) -> Option<Value> {
    match col.column_type {
        ColumnType::Enum => match value {
            // From the binlog ENUM is a 1-based index; from a dump it is
            // already the token string, which passes through below.
            RawValue::Int(v) => Some(enum_token(col, *v)),
            RawValue::UInt(v) => Some(enum_token(col, *v as i64)),
            _ => passthrough(value),
        },
        ColumnType::Set => match value {
            RawValue::Int(v) => Some(Value::String(set_tokens(col, *v))),
            RawValue::UInt(v) => Some(Value::String(set_tokens(col, *v as i64))),
            _ => passthrough(value),
        },
        ColumnType::Bit => match value {
            // Dump encoding: 0x01 for 1, anything else for 0. Binlog BIT is
            // an integer and passes through.
            RawValue::Bytes(b) => Some(Value::from(i64::from(b.as_slice() == b"\x01"))),
            RawValue::Text(s) => Some(Value::from(i64::from(s == "\x01"))),
            _ => passthrough(value),
        },
        ColumnType::Datetime | ColumnType::Timestamp => match text_of(value) {
            Some(s) if DATETIME_SENTINELS.contains(&s.as_str()) => None,
            Some(s) => Some(Value::String(s)),
            None => passthrough(value),
        },
        ColumnType::Date => match text_of(value) {
            Some(s) if s == DATE_SENTINEL => None,
            Some(s) => Some(Value::String(s)),
            None => passthrough(value),
        },
        ColumnType::Json => match value {
            RawValue::Text(s) => parse_json(s.as_bytes()).or_else(|| passthrough(value)),
            RawValue::Bytes(b) => parse_json(b).or_else(|| passthrough(value)),
            _ => passthrough(value),
        },
        // ColumnType::String bytes decode to text, which passthrough already
        // does for every textual shape.
        _ => passthrough(value),
    }
}

fn enum_token(col: &TableColumn, value: i64) -> Value {
    let index = value - 1;
    if index < 0 || index >= col.enum_values.len() as i64 {
        // Invalid enum values can be inserted with sql_mode relaxed; index
        // them as empty rather than aborting the stream.
        warn!(
            "invalid binlog enum index {} for enum {:?}",
            index, col.enum_values
        );
        return Value::String(String::new());
    }
    Value::String(col.enum_values[index as usize].clone())
}

fn set_tokens(col: &TableColumn, bitmask: i64) -> String {
    let mut tokens = Vec::with_capacity(col.set_values.len());
    for (i, token) in col.set_values.iter().enumerate() {
        if bitmask & (1i64 << i) != 0 {
            tokens.push(token.as_str());
        }
    }
    tokens.join(",")
}

fn text_of(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Text(s) => Some(s.clone()),
        RawValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        _ => None,
    }
}

fn parse_json(bytes: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Null) | Err(_) => None,
        Ok(v) => Some(v),
    }
}

/// Default conversion for types outside the coercion matrix.
fn passthrough(value: &RawValue) -> Option<Value> {
    match value {
        RawValue::Null => None,
        RawValue::Int(v) => Some(Value::from(*v)),
        RawValue::UInt(v) => Some(Value::from(*v)),
        RawValue::Float(v) => serde_json::Number::from_f64(*v).map(Value::Number),
        RawValue::Text(s) => Some(Value::String(s.clone())),
        RawValue::Bytes(b) => Some(Value::String(String::from_utf8_lossy(b).into_owned())),
    }
}
