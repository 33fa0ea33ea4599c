use crate::flatten::{Flattener, RootFlattener};
use crate::value::{Type, Value};
use crate::wire::{required, WireValue, CONTENT};
use crate::{Result, RpcError};

/// UUIDs as `{__type__: "java.util.UUID", content: "<hyphenated>"}`.
pub struct UuidHelper;

impl UuidHelper {
    fn type_name() -> String {
        Type::Uuid.canonical_name()
    }
}

impl Flattener for UuidHelper {
    fn name(&self) -> &str {
        "java.util.UUID"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(value, Value::Uuid(_))
    }

    fn flatten(&self, value: &Value, _root: &RootFlattener) -> Result<WireValue> {
        match value {
            Value::Uuid(id) => {
                let mut record = WireValue::typed_record(&Self::type_name());
                record.insert(
                    CONTENT.to_string(),
                    WireValue::Text(id.hyphenated().to_string()),
                );
                Ok(WireValue::Record(record))
            }
            other => Err(RpcError::unsupported(format!(
                "expected UUID, got {}",
                other.type_label()
            ))),
        }
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        wire.type_name() == Some(Self::type_name().as_str())
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        let record = wire
            .as_record()
            .ok_or_else(|| RpcError::malformed("expected UUID record"))?;
        let text = required(record, CONTENT)?
            .as_str()
            .ok_or_else(|| RpcError::malformed("UUID content must be text"))?;
        uuid::Uuid::parse_str(text)
            .map(Value::Uuid)
            .map_err(|e| RpcError::malformed(format!("invalid UUID '{}': {}", text, e)))
    }
}
