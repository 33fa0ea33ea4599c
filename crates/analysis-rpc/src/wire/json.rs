//! JSON encoding of wire values for the HTTP transport.
//!
//! Each value is a single-key object named after its XML-RPC element so
//! integer and float widths survive the trip:
//!
//! ```text
//! {"i4": 7}   {"double": 1.5}   {"string": "x"}   {"base64": "AAE="}
//! {"array": [...]}   {"struct": {"key": {...}}}
//! ```
//!
//! XML-RPC has no null, so absent values travel as the none record.

use super::{none_record, parse_none_record, Record, WireValue};
use crate::{Result, RpcError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Encode a wire value.
pub fn to_json(value: &WireValue) -> Value {
    match value {
        WireValue::Absent => record_to_json(&none_record(None)),
        WireValue::TypedAbsent(type_name) => record_to_json(&none_record(Some(type_name))),
        WireValue::Bool(b) => json!({ "boolean": b }),
        WireValue::I8(i) => json!({ "i1": i }),
        WireValue::I16(i) => json!({ "i2": i }),
        WireValue::I32(i) => json!({ "i4": i }),
        WireValue::I64(i) => json!({ "i8": i }),
        WireValue::F32(f) => json!({ "float": float_to_json(f64::from(*f)) }),
        WireValue::F64(f) => json!({ "double": float_to_json(*f) }),
        WireValue::Text(s) => json!({ "string": s }),
        WireValue::Bytes(bytes) => json!({ "base64": STANDARD.encode(bytes) }),
        WireValue::Sequence(items) => {
            json!({ "array": items.iter().map(to_json).collect::<Vec<_>>() })
        }
        WireValue::Record(record) => record_to_json(record),
    }
}

fn record_to_json(record: &Record) -> Value {
    let fields: Map<String, Value> = record
        .iter()
        .map(|(key, value)| (key.clone(), to_json(value)))
        .collect();
    json!({ "struct": fields })
}

// JSON numbers cannot hold NaN or infinities.
fn float_to_json(f: f64) -> Value {
    if f.is_nan() {
        json!("NaN")
    } else if f == f64::INFINITY {
        json!("Infinity")
    } else if f == f64::NEG_INFINITY {
        json!("-Infinity")
    } else {
        json!(f)
    }
}

fn float_from_json(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| RpcError::malformed(format!("invalid float {}", n))),
        Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => Err(RpcError::malformed(format!("invalid float '{}'", other))),
        },
        other => Err(RpcError::malformed(format!("invalid float {}", other))),
    }
}

fn int_from_json<T: TryFrom<i64>>(tag: &str, value: &Value) -> Result<T> {
    value
        .as_i64()
        .and_then(|i| T::try_from(i).ok())
        .ok_or_else(|| RpcError::malformed(format!("invalid {} value {}", tag, value)))
}

/// Decode a wire value.
pub fn from_json(value: &Value) -> Result<WireValue> {
    let object = value
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| RpcError::malformed(format!("expected tagged value, got {}", value)))?;
    let (tag, inner) = object
        .iter()
        .next()
        .ok_or_else(|| RpcError::malformed("empty tagged value"))?;

    let decoded = match tag.as_str() {
        "boolean" => WireValue::Bool(
            inner
                .as_bool()
                .ok_or_else(|| RpcError::malformed(format!("invalid boolean {}", inner)))?,
        ),
        "i1" => WireValue::I8(int_from_json(tag, inner)?),
        "i2" => WireValue::I16(int_from_json(tag, inner)?),
        "i4" | "int" => WireValue::I32(int_from_json(tag, inner)?),
        "i8" => WireValue::I64(int_from_json(tag, inner)?),
        "float" => WireValue::F32(float_from_json(inner)? as f32),
        "double" => WireValue::F64(float_from_json(inner)?),
        "string" => WireValue::Text(
            inner
                .as_str()
                .ok_or_else(|| RpcError::malformed(format!("invalid string {}", inner)))?
                .to_string(),
        ),
        "base64" => {
            let encoded = inner
                .as_str()
                .ok_or_else(|| RpcError::malformed(format!("invalid base64 {}", inner)))?;
            WireValue::Bytes(
                STANDARD
                    .decode(encoded)
                    .map_err(|e| RpcError::malformed(format!("invalid base64: {}", e)))?,
            )
        }
        "array" => {
            let items = inner
                .as_array()
                .ok_or_else(|| RpcError::malformed(format!("invalid array {}", inner)))?;
            WireValue::Sequence(items.iter().map(from_json).collect::<Result<_>>()?)
        }
        "struct" => {
            let fields = inner
                .as_object()
                .ok_or_else(|| RpcError::malformed(format!("invalid struct {}", inner)))?;
            let record = fields
                .iter()
                .map(|(key, value)| Ok((key.clone(), from_json(value)?)))
                .collect::<Result<Record>>()?;
            match parse_none_record(&record) {
                Some(None) => WireValue::Absent,
                Some(Some(type_name)) => WireValue::TypedAbsent(type_name.to_string()),
                None => WireValue::Record(record),
            }
        }
        other => {
            return Err(RpcError::malformed(format!("unknown value tag '{}'", other)));
        }
    };
    Ok(decoded)
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = Value::deserialize(deserializer)?;
        from_json(&json).map_err(serde::de::Error::custom)
    }
}
