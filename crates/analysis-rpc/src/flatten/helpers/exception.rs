use crate::flatten::{Flattener, RootFlattener};
use crate::value::{Exception, Type, Value};
use crate::wire::{required, WireValue, CONTENT};
use crate::{Result, RpcError};

const EXCEPTION_TYPE: &str = "exceptionType";
const CAUSE: &str = "cause";

/// Exceptions, including the fault records the server sends back.
pub struct ExceptionHelper;

impl ExceptionHelper {
    fn type_name() -> String {
        Type::Exception.canonical_name()
    }

    /// Record for `exception` without its cause. Never fails, so it can
    /// stand in when the full record cannot be built.
    pub fn bare_record(exception: &Exception) -> WireValue {
        let mut record = WireValue::typed_record(&Self::type_name());
        record.insert(CONTENT.to_string(), WireValue::Text(exception.message.clone()));
        record.insert(
            EXCEPTION_TYPE.to_string(),
            WireValue::Text(exception.kind.clone()),
        );
        WireValue::Record(record)
    }
}

impl Flattener for ExceptionHelper {
    fn name(&self) -> &str {
        "java.lang.Exception"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(value, Value::Exception(_))
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        let exception = match value {
            Value::Exception(e) => e,
            other => {
                return Err(RpcError::unsupported(format!(
                    "expected exception, got {}",
                    other.type_label()
                )))
            }
        };
        let mut wire = Self::bare_record(exception);
        if let (Some(cause), WireValue::Record(record)) = (&exception.cause, &mut wire) {
            record.insert(
                CAUSE.to_string(),
                root.flatten(&Value::Exception((**cause).clone()))?,
            );
        }
        Ok(wire)
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        wire.type_name() == Some(Self::type_name().as_str())
    }

    fn unflatten(&self, wire: &WireValue, root: &RootFlattener) -> Result<Value> {
        let record = wire
            .as_record()
            .ok_or_else(|| RpcError::malformed("expected exception record"))?;
        let message = required(record, CONTENT)?
            .as_str()
            .ok_or_else(|| RpcError::malformed("exception content must be text"))?;
        // Peers that only send a message get the generic kind.
        let kind = match record.get(EXCEPTION_TYPE) {
            Some(kind) => kind
                .as_str()
                .ok_or_else(|| RpcError::malformed("exceptionType must be text"))?
                .to_string(),
            None => Self::type_name(),
        };
        let mut exception = Exception::new(kind, message);
        if let Some(cause) = record.get(CAUSE) {
            match root.unflatten(cause)? {
                Value::Exception(cause) => exception = exception.with_cause(cause),
                Value::Null | Value::TypedNone(_) => {}
                other => {
                    return Err(RpcError::malformed(format!(
                        "exception cause must be an exception, got {}",
                        other.type_label()
                    )))
                }
            }
        }
        Ok(Value::Exception(exception))
    }
}
