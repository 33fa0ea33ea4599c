use crate::flatten::{Flattener, RootFlattener};
use crate::value::Value;
use crate::wire::WireValue;
use crate::{Result, RpcError};

/// Scalars, text and binary blobs, which the transport carries natively.
///
/// A char has no wire type of its own and goes as one-character text, so it
/// comes back as a string.
pub struct PassThroughHelper;

impl Flattener for PassThroughHelper {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(
            value,
            Value::Bool(_)
                | Value::Char(_)
                | Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Str(_)
                | Value::Binary(_)
        )
    }

    fn flatten(&self, value: &Value, _root: &RootFlattener) -> Result<WireValue> {
        let wire = match value {
            Value::Bool(b) => WireValue::Bool(*b),
            Value::Char(c) => WireValue::Text(c.to_string()),
            Value::Byte(i) => WireValue::I8(*i),
            Value::Short(i) => WireValue::I16(*i),
            Value::Int(i) => WireValue::I32(*i),
            Value::Long(i) => WireValue::I64(*i),
            Value::Float(f) => WireValue::F32(*f),
            Value::Double(f) => WireValue::F64(*f),
            Value::Str(s) => WireValue::Text(s.clone()),
            Value::Binary(b) => WireValue::Bytes(b.clone()),
            other => {
                return Err(RpcError::unsupported(format!(
                    "cannot pass through {}",
                    other.type_label()
                )))
            }
        };
        Ok(wire)
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        matches!(
            wire,
            WireValue::Bool(_)
                | WireValue::I8(_)
                | WireValue::I16(_)
                | WireValue::I32(_)
                | WireValue::I64(_)
                | WireValue::F32(_)
                | WireValue::F64(_)
                | WireValue::Text(_)
                | WireValue::Bytes(_)
        )
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        let value = match wire {
            WireValue::Bool(b) => Value::Bool(*b),
            WireValue::I8(i) => Value::Byte(*i),
            WireValue::I16(i) => Value::Short(*i),
            WireValue::I32(i) => Value::Int(*i),
            WireValue::I64(i) => Value::Long(*i),
            WireValue::F32(f) => Value::Float(*f),
            WireValue::F64(f) => Value::Double(*f),
            WireValue::Text(s) => Value::Str(s.clone()),
            WireValue::Bytes(b) => Value::Binary(b.clone()),
            other => {
                return Err(RpcError::malformed(format!(
                    "cannot pass through {}",
                    other.describe()
                )))
            }
        };
        Ok(value)
    }
}
