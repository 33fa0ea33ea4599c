use crate::flatten::{Flattener, RootFlattener};
use crate::value::{TypedNone, Value};
use crate::wire::{parse_none_record, WireValue};
use crate::{Result, RpcError};

/// Null and typed none.
pub struct NoneHelper;

impl Flattener for NoneHelper {
    fn name(&self) -> &str {
        "none"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        value.is_null()
    }

    fn flatten(&self, value: &Value, _root: &RootFlattener) -> Result<WireValue> {
        match value {
            Value::Null => Ok(WireValue::Absent),
            Value::TypedNone(t) => Ok(WireValue::TypedAbsent(t.target.canonical_name())),
            other => Err(RpcError::unsupported(format!(
                "expected null, got {}",
                other.type_label()
            ))),
        }
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        match wire {
            WireValue::Absent | WireValue::TypedAbsent(_) => true,
            WireValue::Record(record) => parse_none_record(record).is_some(),
            _ => false,
        }
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        let target = match wire {
            WireValue::Absent => None,
            WireValue::TypedAbsent(name) => Some(name.as_str()),
            WireValue::Record(record) => parse_none_record(record)
                .ok_or_else(|| RpcError::malformed("record is not a none record"))?,
            other => {
                return Err(RpcError::malformed(format!(
                    "expected none, got {}",
                    other.describe()
                )))
            }
        };
        Ok(match target {
            None => Value::Null,
            Some(name) => Value::TypedNone(TypedNone::of_name(name)),
        })
    }
}
